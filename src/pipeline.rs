//! Request orchestration: from query text to the serializable payloads the
//! HTTP surface returns.
//!
//! Each request runs start-to-finish: explain, parse, resolve schema, build
//! the graph. Nothing is shared across requests; the schema lookups complete
//! before graph construction begins.

use serde::Serialize;

use crate::engine::Engine;
use crate::error::Result;
use crate::graph::{Graph, QueryGraph};
use crate::plan::{
    find_bottlenecks, node_stats, NodeInfo, PlanParser, PlanStats, TreeLink, BOTTLENECK_THRESHOLD,
};
use crate::schema::Tables;

/// Fully derived explain payload for one query.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainPlan {
    /// Annotated plan tree.
    pub tree: NodeInfo,
    /// Flattened node list, root first.
    pub nodes: Vec<NodeInfo>,
    /// Tree edges, parent → child.
    pub links: Vec<TreeLink>,
    /// Aggregate cost/row statistics.
    pub stats: PlanStats,
    /// Nodes in execution order, children before parents.
    pub execution_order: Vec<NodeInfo>,
    /// Nodes at or above the default bottleneck threshold.
    pub bottlenecks: Vec<NodeInfo>,
    /// Query text the plan was produced for.
    pub original_query: String,
}

/// Explains `query` and derives the full analysis payload.
pub fn explain_query<E: Engine + ?Sized>(engine: &E, query: &str) -> Result<ExplainPlan> {
    let raw = engine.explain_plan(query)?;
    let tree = PlanParser::parse(&raw);
    let flat = PlanParser::flatten(&tree);

    let stats = node_stats(&flat);
    let bottlenecks = find_bottlenecks(&flat, BOTTLENECK_THRESHOLD)
        .into_iter()
        .cloned()
        .collect();
    let nodes = flat.into_iter().cloned().collect();
    let links = PlanParser::tree_links(&tree);
    let execution_order = PlanParser::execution_order(&tree)
        .into_iter()
        .cloned()
        .collect();

    Ok(ExplainPlan {
        nodes,
        links,
        stats,
        execution_order,
        bottlenecks,
        original_query: query.to_owned(),
        tree,
    })
}

/// Explains `query` and builds the positioned, typed graph for rendering.
pub fn query_graph<E: Engine + ?Sized>(engine: &E, query: &str) -> Result<Graph> {
    let raw = engine.explain_plan(query)?;
    let tree = PlanParser::parse(&raw);
    let flat = PlanParser::flatten(&tree);
    let tables = Tables::init(engine, &flat)?;
    Ok(QueryGraph::build(&flat, &tables))
}
