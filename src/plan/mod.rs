//! Annotated execution-plan nodes and the operations derived from them.
//!
//! [`RawPlanNode`] is the engine's explain output as it arrives on the wire;
//! [`PlanParser`] converts it into a tree of [`NodeInfo`] values carrying
//! process-assigned identifiers and depth, from which the flattened list,
//! dataflow links, execution order, and cost statistics are derived.

use serde::Serialize;

/// Raw explain input as emitted by the engine.
pub mod raw;

/// Conversion from the raw tree into [`NodeInfo`] plus tree traversals.
pub mod parser;

/// Aggregate cost/row statistics and bottleneck detection.
pub mod stats;

pub use parser::{PlanParser, TreeLink};
pub use raw::RawPlanNode;
pub use stats::{find_bottlenecks, node_stats, PlanStats, BOTTLENECK_THRESHOLD};

/// One annotated operator node, created once during parsing and read-only
/// afterward.
///
/// Invariants: every child's `parent_id` names this node's `id`, child depth
/// is exactly `depth + 1`, and a parsed tree has a single root at depth 0.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    /// Unique identifier of the form `node-{n}`, assigned in pre-order by a
    /// counter scoped to one top-level parse.
    pub id: String,
    /// Operator type name as reported by the engine; empty when the input
    /// carried none.
    pub node_type: String,
    /// Distance from the plan root; the root is 0.
    pub depth: usize,
    /// Identifier of the parent node, absent on the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Base relation scanned by this operator, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation_name: Option<String>,
    /// Query alias under which the relation's columns are referenced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Estimated cost before the first row is produced.
    pub startup_cost: f64,
    /// Estimated total cost of the operator.
    pub total_cost: f64,
    /// Estimated row count.
    pub plan_rows: u64,
    /// Measured row count, present when the plan was analyzed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_rows: Option<u64>,
    /// Measured total time in milliseconds, present when analyzed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_time: Option<f64>,
    /// Row filter predicate (plain or join filter).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Index access condition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_cond: Option<String>,
    /// Index backing an index scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    /// Rows discarded by the filter, present when analyzed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_removed: Option<u64>,
    /// Join variant (Inner, Left, ...) on join operators.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_type: Option<String>,
    /// Whether the inner side of a join is known unique.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_unique: Option<bool>,
    /// Hash join condition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_cond: Option<String>,
    /// Merge join condition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_cond: Option<String>,
    /// Grouping columns on aggregate operators.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub group_key: Vec<String>,
    /// Sort columns on sort operators.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort_key: Vec<String>,
    /// Sort strategy chosen by the engine (quicksort, top-N, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_method: Option<String>,
    /// Output column list, qualified by alias where applicable.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub output: Vec<String>,
    /// Child operators feeding this one.
    pub children: Vec<NodeInfo>,
}

impl NodeInfo {
    /// Whether this node scans a base relation, making it a target for
    /// schema enrichment.
    pub fn is_scan(&self) -> bool {
        self.node_type.contains("Scan") && self.relation_name.is_some()
    }

    /// Short human-readable description used in log lines and tooltips.
    pub fn describe(&self) -> String {
        let mut description = self.node_type.clone();
        if let Some(relation) = &self.relation_name {
            description.push_str(&format!(" on {relation}"));
        }
        if let Some(index) = &self.index_name {
            description.push_str(&format!(" using {index}"));
        }
        if let Some(join_type) = &self.join_type {
            description.push_str(&format!(" ({join_type})"));
        }
        if self.filter.is_some() {
            description.push_str(" with filter");
        }
        description
    }
}
