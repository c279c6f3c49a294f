//! Distributor directory tool.
//!
//! The data endpoints are keyed by distributor (employee) id, so the
//! model needs a way to discover valid ids before querying. The
//! directory is the fixed set provisioned for this deployment.

use serde_json::json;

/// Ids of the distributors provisioned in the upstream dashboard.
const KNOWN_DISTRIBUTOR_IDS: [i64; 4] = [10001520, 10001519, 10001507, 10001515];

/// Lists the distributor ids the data endpoints accept.
pub struct ListDistributors;

impl ListDistributors {
    pub const NAME: &'static str = "list_distributors";

    pub const DESCRIPTION: &'static str = "List the distributor (employee) ids available in the sales database. Use one of these ids as empId when querying monthly_sales, top_distributors, or order_history.";

    pub fn parameters_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    pub fn run(&self) -> String {
        json!({ "distributor_ids": KNOWN_DISTRIBUTOR_IDS }).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_known_id() {
        let out: serde_json::Value = serde_json::from_str(&ListDistributors.run()).unwrap();
        let ids = out["distributor_ids"].as_array().unwrap();
        assert_eq!(ids.len(), 4);
        assert!(ids.contains(&json!(10001515)));
    }
}
