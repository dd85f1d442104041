//! Serde view of the engine's JSON explain output.
//!
//! Field names follow the engine's wire format verbatim. Every numeric field
//! defaults to zero and the operator name to the empty string, so a sparse or
//! malformed tree still deserializes into something the parser accepts.

use serde::Deserialize;

/// One operator node in the raw explain tree. Immutable, owned by the caller.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawPlanNode {
    /// Operator type name, e.g. `Seq Scan` or `Hash Join`.
    #[serde(rename = "Node Type", default)]
    pub node_type: String,
    /// Base relation scanned by this operator.
    #[serde(rename = "Relation Name", default)]
    pub relation_name: Option<String>,
    /// Alias under which the relation appears in the query.
    #[serde(rename = "Alias", default)]
    pub alias: Option<String>,
    /// Estimated cost before the first output row.
    #[serde(rename = "Startup Cost", default)]
    pub startup_cost: f64,
    /// Estimated total cost.
    #[serde(rename = "Total Cost", default)]
    pub total_cost: f64,
    /// Estimated output row count.
    #[serde(rename = "Plan Rows", default)]
    pub plan_rows: u64,
    /// Estimated average row width in bytes.
    #[serde(rename = "Plan Width", default)]
    pub plan_width: u64,
    /// Measured startup time in milliseconds, present when analyzed.
    #[serde(rename = "Actual Startup Time", default)]
    pub actual_startup_time: Option<f64>,
    /// Measured total time in milliseconds, present when analyzed.
    #[serde(rename = "Actual Total Time", default)]
    pub actual_total_time: Option<f64>,
    /// Measured output row count, present when analyzed.
    #[serde(rename = "Actual Rows", default)]
    pub actual_rows: Option<u64>,
    /// Number of times the operator ran, present when analyzed.
    #[serde(rename = "Actual Loops", default)]
    pub actual_loops: Option<u64>,
    /// Row filter predicate.
    #[serde(rename = "Filter", default)]
    pub filter: Option<String>,
    /// Join-level filter predicate.
    #[serde(rename = "Join Filter", default)]
    pub join_filter: Option<String>,
    /// Index access condition.
    #[serde(rename = "Index Cond", default)]
    pub index_cond: Option<String>,
    /// Name of the index backing an index scan.
    #[serde(rename = "Index Name", default)]
    pub index_name: Option<String>,
    /// Rows discarded by the filter, present when analyzed.
    #[serde(rename = "Rows Removed by Filter", default)]
    pub rows_removed_by_filter: Option<u64>,
    /// Join variant on join operators.
    #[serde(rename = "Join Type", default)]
    pub join_type: Option<String>,
    /// Whether the inner join side is known unique.
    #[serde(rename = "Inner Unique", default)]
    pub inner_unique: Option<bool>,
    /// Hash join condition.
    #[serde(rename = "Hash Cond", default)]
    pub hash_cond: Option<String>,
    /// Merge join condition.
    #[serde(rename = "Merge Cond", default)]
    pub merge_cond: Option<String>,
    /// Grouping columns on aggregate operators.
    #[serde(rename = "Group Key", default)]
    pub group_key: Vec<String>,
    /// Sort columns on sort operators.
    #[serde(rename = "Sort Key", default)]
    pub sort_key: Vec<String>,
    /// Sort strategy chosen by the engine.
    #[serde(rename = "Sort Method", default)]
    pub sort_method: Option<String>,
    /// Output column list, qualified by alias where applicable.
    #[serde(rename = "Output", default)]
    pub output: Vec<String>,
    /// Child plans feeding this operator.
    #[serde(rename = "Plans", default)]
    pub plans: Vec<RawPlanNode>,
}

impl RawPlanNode {
    /// Creates a node with the given operator type and no inputs.
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            ..Self::default()
        }
    }

    /// Creates a node with the given operator type and child plans.
    pub fn with_plans(node_type: impl Into<String>, plans: Vec<RawPlanNode>) -> Self {
        Self {
            node_type: node_type.into(),
            plans,
            ..Self::default()
        }
    }
}
