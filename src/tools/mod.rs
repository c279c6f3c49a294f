//! Read-only data-query tools exposed to the model.
//!
//! The registry is a closed set: `ToolKind` enumerates every tool the
//! process will ever dispatch, and `ToolKind::resolve` is the only place
//! a runtime string is mapped to a variant. Names the model invents fall
//! out of that edge as an explicit unknown-tool error instead of being
//! looked up dynamically.

mod data_query;
mod distributors;

pub use data_query::{
    Aggregation, AggregationKind, DataQueryTool, Endpoint, FilterPredicate, QuerySpec, RangeFilter,
    SortOrder,
};
pub use distributors::ListDistributors;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::llm::{FunctionSchema, ToolSchema};

/// Errors at the dispatch boundary. These abort the single tool call and
/// surface to the model as a failed-call signal; they never reach the
/// network.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: &'static str, message: String },
}

/// Every tool this process can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    QuerySalesData,
    ListDistributors,
}

impl ToolKind {
    pub const ALL: [ToolKind; 2] = [ToolKind::QuerySalesData, ToolKind::ListDistributors];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::QuerySalesData => DataQueryTool::NAME,
            ToolKind::ListDistributors => ListDistributors::NAME,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolKind::QuerySalesData => DataQueryTool::DESCRIPTION,
            ToolKind::ListDistributors => ListDistributors::DESCRIPTION,
        }
    }

    pub fn parameters_schema(self) -> Value {
        match self {
            ToolKind::QuerySalesData => DataQueryTool::parameters_schema(),
            ToolKind::ListDistributors => ListDistributors::parameters_schema(),
        }
    }

    /// Map a runtime tool name to a variant.
    pub fn resolve(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

/// Process-lifetime mapping from tool name to implementation, built once
/// from the configuration at startup.
pub struct ToolRegistry {
    data_query: DataQueryTool,
    distributors: ListDistributors,
}

impl ToolRegistry {
    pub fn new(config: &Config) -> Self {
        Self {
            data_query: DataQueryTool::new(config.data_api.clone()),
            distributors: ListDistributors,
        }
    }

    /// The registry's {name, description, schema} triples, advertised to
    /// the model at the start of every turn.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        ToolKind::ALL
            .into_iter()
            .map(|kind| ToolSchema {
                kind: "function",
                function: FunctionSchema {
                    name: kind.name(),
                    description: kind.description(),
                    parameters: kind.parameters_schema(),
                },
            })
            .collect()
    }

    /// Validate the model-supplied arguments and execute the tool.
    ///
    /// Validation rejects before any network call; execution itself
    /// always produces a string payload, embedding upstream failures as
    /// error payloads rather than returning `Err`.
    pub async fn dispatch(&self, name: &str, args: Value) -> Result<String, ToolError> {
        let kind = ToolKind::resolve(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        debug!(tool = kind.name(), "dispatching tool call");

        match kind {
            ToolKind::QuerySalesData => {
                let spec: QuerySpec =
                    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments {
                        tool: DataQueryTool::NAME,
                        message: e.to_string(),
                    })?;
                validate_query_spec(&spec)?;
                Ok(self.data_query.run(&spec).await)
            }
            ToolKind::ListDistributors => Ok(self.distributors.run()),
        }
    }
}

/// Local validation, distinct from the tool's own error payloads for
/// downstream failures: a known employee-keyed endpoint needs a numeric
/// `empId` before we touch the network. Unknown endpoint names pass
/// through so the tool can answer with its unsupported-endpoint payload.
fn validate_query_spec(spec: &QuerySpec) -> Result<(), ToolError> {
    if let Some(endpoint) = Endpoint::resolve(&spec.endpoint) {
        if endpoint.requires_emp_id() && spec.emp_id.is_none() {
            return Err(ToolError::InvalidArguments {
                tool: DataQueryTool::NAME,
                message: format!("empId is required for endpoint {}", endpoint.as_str()),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> ToolRegistry {
        ToolRegistry::new(&Config::new("test-key".to_string(), "test-model".to_string()))
    }

    #[test]
    fn resolve_knows_every_tool_and_rejects_strangers() {
        assert_eq!(ToolKind::resolve("query_sales_data"), Some(ToolKind::QuerySalesData));
        assert_eq!(ToolKind::resolve("list_distributors"), Some(ToolKind::ListDistributors));
        assert_eq!(ToolKind::resolve("drop_tables"), None);
    }

    #[test]
    fn schemas_advertise_all_tools() {
        let schemas = registry().schemas();
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0].function.name, "query_sales_data");
        assert!(schemas[0].function.parameters["properties"]
            .get("endpoint")
            .is_some());
    }

    #[tokio::test]
    async fn dispatch_rejects_unknown_tool() {
        let err = registry()
            .dispatch("drop_tables", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(name) if name == "drop_tables"));
    }

    #[tokio::test]
    async fn dispatch_rejects_missing_emp_id_before_any_network_call() {
        let err = registry()
            .dispatch("query_sales_data", json!({ "endpoint": "monthly_sales" }))
            .await
            .unwrap_err();
        match err {
            ToolError::InvalidArguments { message, .. } => {
                assert!(message.contains("empId is required"));
            }
            other => panic!("expected InvalidArguments, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn dispatch_rejects_ill_typed_arguments() {
        let err = registry()
            .dispatch(
                "query_sales_data",
                json!({ "endpoint": "monthly_sales", "empId": "not-a-number" }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn dispatch_runs_list_distributors() {
        let out = registry()
            .dispatch("list_distributors", json!({}))
            .await
            .unwrap();
        assert!(out.contains("10001515"));
    }

    #[tokio::test]
    async fn unsupported_endpoint_passes_validation_and_returns_payload() {
        let out = registry()
            .dispatch("query_sales_data", json!({ "endpoint": "foo" }))
            .await
            .unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["error"], "Unsupported endpoint: foo");
    }
}
