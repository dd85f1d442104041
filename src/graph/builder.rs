//! Graph assembly: operator classification, display payloads, and the
//! dataflow edge set.

use std::collections::HashSet;

use tracing::warn;

use crate::graph::{
    layout, AggregateData, Edge, Graph, GraphNode, JoinData, MiniData, NodeCategory, NodeData,
    Position, ScanData, SortData, TableData,
};
use crate::plan::NodeInfo;
use crate::schema::{Attribute, TableNodeInfo, Tables};

/// Operator kinds the renderer knows how to display.
///
/// Closed set of known operators plus an explicit variant for everything
/// else, so a new operator name degrades to a pass-through node instead of
/// breaking rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperatorKind {
    /// Sequential relation scan.
    SeqScan,
    /// Index scan with heap fetches.
    IndexScan,
    /// Index-only scan.
    IndexOnlyScan,
    /// Bitmap index scan.
    BitmapIndexScan,
    /// Bitmap heap scan.
    BitmapHeapScan,
    /// Hash join.
    HashJoin,
    /// Merge join.
    MergeJoin,
    /// Nested-loop join.
    NestedLoop,
    /// Aggregation.
    Aggregate,
    /// Sort.
    Sort,
    /// Hash build side of a hash join.
    Hash,
    /// Operator not in the known set, carrying its original name.
    Unrecognized(String),
}

impl OperatorKind {
    /// Parses an operator type name. Total: unknown names land in
    /// [`OperatorKind::Unrecognized`].
    pub fn parse(name: &str) -> Self {
        match name {
            "Seq Scan" => Self::SeqScan,
            "Index Scan" => Self::IndexScan,
            "Index Only Scan" => Self::IndexOnlyScan,
            "Bitmap Index Scan" => Self::BitmapIndexScan,
            "Bitmap Heap Scan" => Self::BitmapHeapScan,
            "Hash Join" => Self::HashJoin,
            "Merge Join" => Self::MergeJoin,
            "Nested Loop" => Self::NestedLoop,
            "Aggregate" => Self::Aggregate,
            "Sort" => Self::Sort,
            "Hash" => Self::Hash,
            other => Self::Unrecognized(other.to_owned()),
        }
    }

    /// Semantic category the operator renders as.
    pub fn category(&self) -> NodeCategory {
        match self {
            Self::SeqScan
            | Self::IndexScan
            | Self::IndexOnlyScan
            | Self::BitmapIndexScan
            | Self::BitmapHeapScan => NodeCategory::Scan,
            Self::HashJoin | Self::MergeJoin | Self::NestedLoop => NodeCategory::Join,
            Self::Aggregate => NodeCategory::Aggregate,
            Self::Sort => NodeCategory::Sort,
            Self::Hash => NodeCategory::Mini,
            Self::Unrecognized(name) => fallback_category(name),
        }
    }
}

/// Names outside the known set still need a category; substring matching
/// covers operator families (`Parallel Seq Scan`, `Hash Anti Join`, ...) and
/// anything else renders as a pass-through node. The empty name, produced
/// from input with no recognizable operator type, maps to `None`.
fn fallback_category(name: &str) -> NodeCategory {
    if name.trim().is_empty() {
        NodeCategory::None
    } else if name.contains("Scan") {
        NodeCategory::Scan
    } else if name.contains("Join") {
        NodeCategory::Join
    } else {
        // "Hash" variants and everything else render as pass-through nodes.
        NodeCategory::Mini
    }
}

/// Builds positioned, typed graphs from parsed plans and resolved tables.
pub struct QueryGraph;

impl QueryGraph {
    /// Classifies a plan node into its semantic category. Total over any
    /// operator name.
    pub fn classify(node: &NodeInfo) -> NodeCategory {
        OperatorKind::parse(&node.node_type).category()
    }

    /// Assembles the graph: relation pseudo-nodes, categorized plan nodes,
    /// the dataflow edge set, and the layout pass.
    ///
    /// Edges referencing an unknown node id are logged and dropped; the
    /// remaining graph is still returned.
    pub fn build(nodes: &[&NodeInfo], tables: &Tables) -> Graph {
        let mut graph_nodes = Vec::new();
        let mut edges = Vec::new();

        for table in tables.table_nodes() {
            graph_nodes.push(table_node(table));
            edges.push(Edge::between(&table.id, &table.target_node));
        }

        for node in nodes {
            graph_nodes.push(plan_node(node, tables));
            // Tree edges reversed to child -> parent: leaves produce rows
            // that flow up to the root.
            if let Some(parent) = &node.parent_id {
                edges.push(Edge::between(&node.id, parent));
            }
        }

        let ids: HashSet<&str> = graph_nodes.iter().map(|n| n.id.as_str()).collect();
        edges.retain(|edge| {
            let valid = ids.contains(edge.source.as_str()) && ids.contains(edge.target.as_str());
            if !valid {
                warn!(edge = %edge.id, "dropping edge referencing unknown node");
            }
            valid
        });

        let mut graph = Graph {
            nodes: graph_nodes,
            edges,
        };
        layout::assign_positions(&mut graph);
        graph
    }
}

fn table_node(table: &TableNodeInfo) -> GraphNode {
    GraphNode {
        id: table.id.clone(),
        category: NodeCategory::Table,
        position: Position::default(),
        data: NodeData::Table(TableData {
            depth: table.depth,
            name: table.relation_name.clone(),
            attributes: table.columns.clone(),
            row_count: table.row_count,
        }),
    }
}

fn plan_node(node: &NodeInfo, tables: &Tables) -> GraphNode {
    let category = QueryGraph::classify(node);
    let depth = node.depth as i64;
    let data = match category {
        NodeCategory::Scan => NodeData::Scan(ScanData {
            depth,
            name: node.node_type.clone(),
            relation_name: node.relation_name.clone().unwrap_or_default(),
            start_up_cost: node.startup_cost,
            total_cost: node.total_cost,
            plan_rows: node.plan_rows,
            filter: node.filter.clone(),
            index_cond: node.index_cond.clone(),
            index_name: node.index_name.clone(),
            columns: resolve_columns(&node.output, node.relation_name.as_deref(), tables),
        }),
        NodeCategory::Join => NodeData::Join(JoinData {
            depth,
            name: node.node_type.clone(),
            join_type: node.join_type.clone(),
            inner_unique: node.inner_unique,
            filter: node.filter.clone(),
            rows_removed: node.rows_removed,
            start_up_cost: node.startup_cost,
            total_cost: node.total_cost,
            hash_cond: node.hash_cond.clone(),
            merge_cond: node.merge_cond.clone(),
            columns: resolve_columns(&node.output, None, tables),
        }),
        NodeCategory::Aggregate => NodeData::Aggregate(AggregateData {
            depth,
            name: node.node_type.clone(),
            group_key: node.group_key.clone(),
            start_up_cost: node.startup_cost,
            total_cost: node.total_cost,
        }),
        NodeCategory::Sort => NodeData::Sort(SortData {
            depth,
            name: node.node_type.clone(),
            sort_key: node.sort_key.clone(),
            sort_method: node.sort_method.clone(),
            start_up_cost: node.startup_cost,
            total_cost: node.total_cost,
            columns: resolve_columns(&node.output, None, tables),
        }),
        NodeCategory::Mini | NodeCategory::None | NodeCategory::Table => {
            NodeData::Mini(MiniData {
                depth,
                name: node.node_type.clone(),
                total_cost: node.total_cost,
            })
        }
    };

    GraphNode {
        id: node.id.clone(),
        category,
        position: Position::default(),
        data,
    }
}

/// Resolves output columns to attributes with type and key role.
///
/// `owner` pins the relation for scan output; otherwise the column's alias
/// qualifier is resolved through the alias map. Unresolvable columns (bare
/// expressions, unknown aliases) keep an empty type and no key role.
fn resolve_columns(output: &[String], owner: Option<&str>, tables: &Tables) -> Vec<Attribute> {
    output
        .iter()
        .map(|column| resolve_column(column, owner, tables))
        .collect()
}

fn resolve_column(column: &str, owner: Option<&str>, tables: &Tables) -> Attribute {
    let (qualifier, name) = match column.rsplit_once('.') {
        Some((qualifier, name)) => (Some(qualifier), name),
        None => (None, column),
    };
    let relation = owner.or_else(|| qualifier.map(|q| tables.relation_from_alias(q)));

    match relation {
        Some(relation) => Attribute {
            name: name.to_owned(),
            column_type: tables
                .column_type(relation, name)
                .unwrap_or_default()
                .to_owned(),
            key_type: tables.key_role(relation, name),
        },
        None => Attribute {
            name: name.to_owned(),
            column_type: String::new(),
            key_type: None,
        },
    }
}
