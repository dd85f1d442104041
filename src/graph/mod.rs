//! Graph types handed to the rendering collaborator.
//!
//! A [`Graph`] is a pure data structure: typed nodes with positions and
//! category-specific payloads, plus dataflow edges oriented producer →
//! consumer. It carries no behavior and is safe to serialize as-is.

use serde::Serialize;

use crate::schema::Attribute;

/// Graph assembly from plan nodes and resolved tables.
pub mod builder;

/// Two-dimensional placement of graph nodes.
pub mod layout;

pub use builder::{OperatorKind, QueryGraph};

/// Semantic category of a graph node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NodeCategory {
    /// Synthetic relation node showing a scanned table's schema.
    Table,
    /// Scan operator reading a base relation.
    Scan,
    /// Join operator combining two inputs.
    Join,
    /// Aggregation operator.
    Aggregate,
    /// Sort operator.
    Sort,
    /// Minimal pass-through node for helper operators.
    Mini,
    /// Node with no recognizable operator name.
    None,
}

/// Position of a node on the rendering canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Position {
    /// Horizontal coordinate; grows with dataflow toward the final result.
    pub x: f64,
    /// Vertical coordinate; grows downward.
    pub y: f64,
}

/// Directed dataflow edge between two graph nodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Edge {
    /// Synthetic identifier of the form `e-{source}-{target}`.
    pub id: String,
    /// Producer node id.
    pub source: String,
    /// Consumer node id.
    pub target: String,
}

impl Edge {
    /// Creates an edge from `source` to `target`.
    pub fn between(source: &str, target: &str) -> Self {
        Self {
            id: format!("e-{source}-{target}"),
            source: source.to_owned(),
            target: target.to_owned(),
        }
    }
}

/// One positioned, typed node of the output graph.
#[derive(Clone, Debug, Serialize)]
pub struct GraphNode {
    /// Node identifier, unique within the graph.
    pub id: String,
    /// Semantic category, used by the renderer to pick a widget.
    #[serde(rename = "type")]
    pub category: NodeCategory,
    /// Canvas position computed by the layout pass.
    pub position: Position,
    /// Category-specific display payload.
    pub data: NodeData,
}

/// Category-specific display payload of a graph node.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum NodeData {
    /// Payload of a relation node.
    Table(TableData),
    /// Payload of a scan node.
    Scan(ScanData),
    /// Payload of a join node.
    Join(JoinData),
    /// Payload of an aggregate node.
    Aggregate(AggregateData),
    /// Payload of a sort node.
    Sort(SortData),
    /// Payload of a pass-through node.
    Mini(MiniData),
}

impl NodeData {
    /// Depth band the node belongs to.
    pub fn depth(&self) -> i64 {
        match self {
            NodeData::Table(data) => data.depth,
            NodeData::Scan(data) => data.depth,
            NodeData::Join(data) => data.depth,
            NodeData::Aggregate(data) => data.depth,
            NodeData::Sort(data) => data.depth,
            NodeData::Mini(data) => data.depth,
        }
    }

    /// Number of attribute rows a relation node displays; 0 for others.
    pub fn attribute_count(&self) -> usize {
        match self {
            NodeData::Table(data) => data.attributes.len(),
            _ => 0,
        }
    }
}

/// Display payload of a relation node.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableData {
    /// Depth band (one left of the scan the relation feeds).
    pub depth: i64,
    /// Relation name.
    pub name: String,
    /// Full ordered column list with key roles.
    pub attributes: Vec<Attribute>,
    /// Estimated row count.
    pub row_count: u64,
}

/// Display payload of a scan node.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanData {
    /// Depth band within the plan.
    pub depth: i64,
    /// Operator name.
    pub name: String,
    /// Relation the scan reads.
    pub relation_name: String,
    /// Estimated cost before the first row.
    pub start_up_cost: f64,
    /// Estimated total cost.
    pub total_cost: f64,
    /// Estimated row count.
    pub plan_rows: u64,
    /// Row filter predicate, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Index access condition, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_cond: Option<String>,
    /// Index backing the scan, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    /// Resolved output columns.
    pub columns: Vec<Attribute>,
}

/// Display payload of a join node.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinData {
    /// Depth band within the plan.
    pub depth: i64,
    /// Operator name.
    pub name: String,
    /// Join variant (Inner, Left, ...), when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_type: Option<String>,
    /// Whether the inner side is known unique.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_unique: Option<bool>,
    /// Join-level filter, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Rows discarded by the filter, when analyzed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_removed: Option<u64>,
    /// Estimated cost before the first row.
    pub start_up_cost: f64,
    /// Estimated total cost.
    pub total_cost: f64,
    /// Hash join condition, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_cond: Option<String>,
    /// Merge join condition, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_cond: Option<String>,
    /// Resolved output columns.
    pub columns: Vec<Attribute>,
}

/// Display payload of an aggregate node.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateData {
    /// Depth band within the plan.
    pub depth: i64,
    /// Operator name.
    pub name: String,
    /// Grouping columns.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub group_key: Vec<String>,
    /// Estimated cost before the first row.
    pub start_up_cost: f64,
    /// Estimated total cost.
    pub total_cost: f64,
}

/// Display payload of a sort node.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortData {
    /// Depth band within the plan.
    pub depth: i64,
    /// Operator name.
    pub name: String,
    /// Sort columns.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort_key: Vec<String>,
    /// Sort strategy chosen by the engine, when analyzed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_method: Option<String>,
    /// Estimated cost before the first row.
    pub start_up_cost: f64,
    /// Estimated total cost.
    pub total_cost: f64,
    /// Resolved output columns.
    pub columns: Vec<Attribute>,
}

/// Display payload of a pass-through node.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniData {
    /// Depth band within the plan.
    pub depth: i64,
    /// Operator name, empty when the input carried none.
    pub name: String,
    /// Estimated total cost.
    pub total_cost: f64,
}

/// Positioned, typed graph ready for rendering. Immutable once built.
#[derive(Clone, Debug, Serialize)]
pub struct Graph {
    /// All graph nodes: relation pseudo-nodes first, then plan nodes.
    pub nodes: Vec<GraphNode>,
    /// Dataflow edges, validated against the node set.
    pub edges: Vec<Edge>,
}
