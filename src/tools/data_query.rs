//! Structured queries against the upstream sales-data APIs.
//!
//! The tool fetches one of four fixed endpoints and post-processes the
//! rows so the payload handed back to the model stays small: filtering,
//! aggregation, sorting, result caps, field projection, and a final
//! oversize guard, applied in that fixed order. The tool boundary never
//! raises; every failure comes back as a payload the model can read and
//! explain to the user.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::debug;

use crate::config::DataApiConfig;

/// Items beyond this count are summarized unless the caller bounded the
/// query with `topK` or an aggregation.
const OVERSIZE_LIMIT: usize = 50;

/// Sample rows included in an oversize summary.
const SAMPLE_SIZE: usize = 5;

/// The four upstream data sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    MonthlySales,
    TopDistributors,
    EmployeeData,
    OrderHistory,
}

impl Endpoint {
    pub fn resolve(name: &str) -> Option<Self> {
        match name {
            "monthly_sales" => Some(Endpoint::MonthlySales),
            "top_distributors" => Some(Endpoint::TopDistributors),
            "employee_data" => Some(Endpoint::EmployeeData),
            "order_history" => Some(Endpoint::OrderHistory),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::MonthlySales => "monthly_sales",
            Endpoint::TopDistributors => "top_distributors",
            Endpoint::EmployeeData => "employee_data",
            Endpoint::OrderHistory => "order_history",
        }
    }

    /// Result cap applied when the caller does not pass `topK`.
    pub fn default_cap(self) -> usize {
        match self {
            Endpoint::MonthlySales => 12,
            Endpoint::TopDistributors => 20,
            Endpoint::EmployeeData => 50,
            Endpoint::OrderHistory => 100,
        }
    }

    /// Whether the upstream URL is keyed by an employee id.
    pub fn requires_emp_id(self) -> bool {
        !matches!(self, Endpoint::EmployeeData)
    }
}

/// Sort direction for `sortBy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// A single filter predicate: an exact-match value, or a `$gt`/`$lt`
/// range object. Both bounds must pass when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterPredicate {
    Range(RangeFilter),
    Exact(Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeFilter {
    #[serde(rename = "$gt", default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,

    #[serde(rename = "$lt", default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
}

/// Aggregation over the filtered rows. Bypasses capping, sorting and
/// projection entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aggregation {
    #[serde(rename = "type")]
    pub kind: AggregationKind,

    /// Numeric field `sum` and `group` sums operate on.
    pub field: Option<String>,

    #[serde(rename = "groupBy")]
    pub group_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationKind {
    Count,
    Sum,
    Group,
}

/// Arguments to the data query tool, as the model supplies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    /// Endpoint name. Kept as a string so an unknown name becomes an
    /// "Unsupported endpoint" payload rather than a parse failure.
    pub endpoint: String,

    pub emp_id: Option<i64>,

    pub fields: Option<Vec<String>>,

    pub filters: Option<HashMap<String, FilterPredicate>>,

    pub top_k: Option<usize>,

    pub sort_by: Option<String>,

    pub sort_order: Option<SortOrder>,

    pub aggregation: Option<Aggregation>,
}

impl QuerySpec {
    fn has_filters(&self) -> bool {
        self.filters.as_ref().is_some_and(|f| !f.is_empty())
    }
}

/// Executes a `QuerySpec` against the configured upstream endpoints.
pub struct DataQueryTool {
    data_api: DataApiConfig,
    client: reqwest::Client,
}

impl DataQueryTool {
    pub const NAME: &'static str = "query_sales_data";

    pub const DESCRIPTION: &'static str = "Query sales data from one of four sources: monthly_sales (monthly sales totals), top_distributors (customers ranked by TOTAL_SALES), employee_data (employee records), order_history (individual orders). Supports filtering, sorting, field projection, result caps (topK), and count/sum/group aggregations. Use aggregations or filters to keep results small.";

    pub fn new(data_api: DataApiConfig) -> Self {
        Self {
            data_api,
            client: reqwest::Client::new(),
        }
    }

    pub fn parameters_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "endpoint": {
                    "type": "string",
                    "enum": ["monthly_sales", "top_distributors", "employee_data", "order_history"],
                    "description": "Which data source to query"
                },
                "empId": {
                    "type": "integer",
                    "description": "Employee (distributor) id the data is scoped to. Required for every endpoint except employee_data."
                },
                "fields": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Return only these fields from each record"
                },
                "filters": {
                    "type": "object",
                    "description": "Keep records matching every key. Values are exact-match scalars, or range objects like {\"$gt\": 1000} / {\"$lt\": 5000}."
                },
                "topK": {
                    "type": "integer",
                    "description": "Return at most this many records"
                },
                "sortBy": {
                    "type": "string",
                    "description": "Numeric field to sort by"
                },
                "sortOrder": {
                    "type": "string",
                    "enum": ["asc", "desc"],
                    "description": "Sort direction (default: desc)"
                },
                "aggregation": {
                    "type": "object",
                    "properties": {
                        "type": {"type": "string", "enum": ["count", "sum", "group"]},
                        "field": {"type": "string", "description": "Numeric field for sum or per-group sums"},
                        "groupBy": {"type": "string", "description": "Field whose distinct values form the groups"}
                    },
                    "required": ["type"],
                    "description": "Compute a count, sum, or group-by over the filtered records instead of returning them"
                }
            },
            "required": ["endpoint"]
        })
    }

    /// Run the full pipeline. Always returns a serialized payload; any
    /// failure becomes an error payload rather than an `Err`.
    pub async fn run(&self, spec: &QuerySpec) -> String {
        let Some(endpoint) = Endpoint::resolve(&spec.endpoint) else {
            return error_payload(format!("Unsupported endpoint: {}", spec.endpoint));
        };

        let Some(base_url) = self.url_for(endpoint) else {
            return error_payload(format!(
                "Endpoint {} is not configured on this server",
                endpoint.as_str()
            ));
        };

        let url = match (endpoint.requires_emp_id(), spec.emp_id) {
            (true, Some(id)) => format!("{}?id={}", base_url, id),
            _ => base_url.to_string(),
        };

        debug!(endpoint = endpoint.as_str(), %url, "fetching upstream data");

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => return error_payload(format!("Upstream request failed: {}", e)),
        };

        let status = response.status();
        if !status.is_success() {
            return error_payload(format!("Upstream request failed with HTTP {}", status.as_u16()));
        }

        let body: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => return error_payload(format!("Upstream response was not valid JSON: {}", e)),
        };

        apply_pipeline(spec, endpoint, coerce_rows(body))
    }

    fn url_for(&self, endpoint: Endpoint) -> Option<&str> {
        match endpoint {
            Endpoint::MonthlySales => self.data_api.monthly_sales_url.as_deref(),
            Endpoint::TopDistributors => self.data_api.top_distributors_url.as_deref(),
            Endpoint::EmployeeData => self.data_api.employee_data_url.as_deref(),
            Endpoint::OrderHistory => self.data_api.order_history_url.as_deref(),
        }
    }
}

/// `{error, data: []}` payload the model can read and relay.
fn error_payload(message: String) -> String {
    json!({ "error": message, "data": [] }).to_string()
}

/// Wrap a single object in a one-element sequence.
fn coerce_rows(body: Value) -> Vec<Value> {
    match body {
        Value::Array(rows) => rows,
        other => vec![other],
    }
}

/// The post-fetch pipeline: filter, then aggregate, or else sort, cap,
/// project, and guard against oversized payloads. Order is a behavioral
/// contract.
fn apply_pipeline(spec: &QuerySpec, endpoint: Endpoint, rows: Vec<Value>) -> String {
    let filters_applied = spec.has_filters();
    let mut rows: Vec<Value> = match &spec.filters {
        Some(filters) if !filters.is_empty() => rows
            .into_iter()
            .filter(|row| filters.iter().all(|(key, pred)| matches_filter(row, key, pred)))
            .collect(),
        _ => rows,
    };

    // Aggregation short-circuits the rest of the pipeline.
    if let Some(aggregation) = &spec.aggregation {
        return aggregate(endpoint, aggregation, &rows, filters_applied);
    }

    if let Some(sort_by) = &spec.sort_by {
        let order = spec.sort_order.unwrap_or(SortOrder::Desc);
        rows.sort_by(|a, b| {
            let x = numeric_field(a, sort_by);
            let y = numeric_field(b, sort_by);
            match order {
                SortOrder::Desc => y.total_cmp(&x),
                SortOrder::Asc => x.total_cmp(&y),
            }
        });
    }

    // Result cap, after sorting so topK keeps the best-ranked rows.
    // Filtered order-history queries are deliberately left uncapped: the
    // filter already bounds them, and the default cap would silently
    // truncate legitimate matches.
    let cap = match spec.top_k {
        Some(k) => Some(k),
        None if endpoint == Endpoint::OrderHistory && filters_applied => None,
        None => Some(endpoint.default_cap()),
    };
    if let Some(cap) = cap {
        rows.truncate(cap);
    }

    if let Some(fields) = &spec.fields {
        rows = rows.into_iter().map(|row| project(row, fields)).collect();
    }

    if rows.len() > OVERSIZE_LIMIT && spec.top_k.is_none() {
        return json!({
            "total_records": rows.len(),
            "sample_data": &rows[..SAMPLE_SIZE.min(rows.len())],
            "message": format!(
                "Result set of {} records is too large to return in full; showing the first {}. Narrow the query with filters, topK, or an aggregation.",
                rows.len(),
                SAMPLE_SIZE
            ),
        })
        .to_string();
    }

    Value::Array(rows).to_string()
}

/// One filter key: exact equality for scalar predicates, conjunctive
/// numeric bounds for range predicates. A key absent from the row fails
/// a range check.
fn matches_filter(row: &Value, key: &str, pred: &FilterPredicate) -> bool {
    match pred {
        FilterPredicate::Exact(expected) => row.get(key) == Some(expected),
        FilterPredicate::Range(range) => {
            let Some(actual) = row.get(key).and_then(Value::as_f64) else {
                return false;
            };
            if let Some(gt) = range.gt {
                if actual <= gt {
                    return false;
                }
            }
            if let Some(lt) = range.lt {
                if actual >= lt {
                    return false;
                }
            }
            true
        }
    }
}

/// Numeric view of a field; missing or non-numeric values count as 0.
fn numeric_field(row: &Value, key: &str) -> f64 {
    row.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Keep only the named fields, in the order the caller listed them.
/// Fields a record does not have are omitted, not defaulted.
fn project(row: Value, fields: &[String]) -> Value {
    let Value::Object(source) = row else {
        return row;
    };
    let mut projected = Map::new();
    for field in fields {
        if let Some(value) = source.get(field) {
            projected.insert(field.clone(), value.clone());
        }
    }
    Value::Object(projected)
}

/// Count / sum / group-by over the filtered rows. Every result carries
/// metadata about what was computed over.
fn aggregate(
    endpoint: Endpoint,
    aggregation: &Aggregation,
    rows: &[Value],
    filters_applied: bool,
) -> String {
    let wrap = |query_type: &str, result: Value| {
        json!({
            "query_type": query_type,
            "endpoint": endpoint.as_str(),
            "total_records": rows.len(),
            "filters_applied": filters_applied,
            "result": result,
        })
        .to_string()
    };

    match (aggregation.kind, &aggregation.field, &aggregation.group_by) {
        (AggregationKind::Count, _, _) => wrap("count", json!(rows.len())),
        (AggregationKind::Sum, Some(field), _) => {
            let total: f64 = rows.iter().map(|row| numeric_field(row, field)).sum();
            wrap("sum", json!(total))
        }
        (AggregationKind::Group, None, Some(group_by)) => {
            let mut groups: Vec<(Value, usize)> = Vec::new();
            for row in rows {
                let key = row.get(group_by).cloned().unwrap_or(Value::Null);
                match groups.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, count)) => *count += 1,
                    None => groups.push((key, 1)),
                }
            }
            groups.sort_by(|a, b| b.1.cmp(&a.1));
            let result: Vec<Value> = groups
                .into_iter()
                .map(|(value, count)| json!({ "value": value, "count": count }))
                .collect();
            wrap("group", Value::Array(result))
        }
        (AggregationKind::Group, Some(field), Some(group_by)) => {
            let mut groups: Vec<(Value, f64, usize)> = Vec::new();
            for row in rows {
                let key = row.get(group_by).cloned().unwrap_or(Value::Null);
                let amount = numeric_field(row, field);
                match groups.iter_mut().find(|(k, _, _)| *k == key) {
                    Some((_, sum, count)) => {
                        *sum += amount;
                        *count += 1;
                    }
                    None => groups.push((key, amount, 1)),
                }
            }
            groups.sort_by(|a, b| b.1.total_cmp(&a.1));
            let result: Vec<Value> = groups
                .into_iter()
                .map(|(value, sum, count)| {
                    json!({
                        "value": value,
                        "sum": sum,
                        "count": count,
                        "average": sum / count as f64,
                    })
                })
                .collect();
            wrap("group", Value::Array(result))
        }
        _ => error_payload("Invalid aggregation parameters".to_string()),
    }
}
