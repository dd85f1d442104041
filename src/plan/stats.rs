//! Aggregate statistics over a flattened node list and bottleneck detection.

use serde::Serialize;

use crate::plan::NodeInfo;

/// Default bottleneck threshold as a fraction of the maximum total cost.
pub const BOTTLENECK_THRESHOLD: f64 = 0.8;

/// Aggregate cost and row statistics for one plan.
///
/// Nodes with non-positive cost or row estimates are treated as not
/// cost-bearing (synthetic helper nodes) and excluded from min/max/mean,
/// but still counted in `total_nodes`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStats {
    /// Largest total cost among cost-bearing nodes.
    pub max_cost: f64,
    /// Smallest total cost among cost-bearing nodes.
    pub min_cost: f64,
    /// Largest estimated row count among row-bearing nodes.
    pub max_rows: u64,
    /// Smallest estimated row count among row-bearing nodes.
    pub min_rows: u64,
    /// Largest measured row count among analyzed nodes.
    pub max_actual_rows: u64,
    /// Mean total cost over cost-bearing nodes.
    pub avg_cost: f64,
    /// Sum of total cost over cost-bearing nodes.
    pub total_cost: f64,
    /// Number of nodes in the plan, cost-bearing or not.
    pub total_nodes: usize,
}

/// Computes [`PlanStats`] over a flattened node list.
pub fn node_stats(nodes: &[&NodeInfo]) -> PlanStats {
    let costs: Vec<f64> = nodes
        .iter()
        .map(|n| n.total_cost)
        .filter(|c| *c > 0.0)
        .collect();
    let rows: Vec<u64> = nodes
        .iter()
        .map(|n| n.plan_rows)
        .filter(|r| *r > 0)
        .collect();
    let actual_rows: Vec<u64> = nodes
        .iter()
        .filter_map(|n| n.actual_rows)
        .filter(|r| *r > 0)
        .collect();

    let total_cost: f64 = costs.iter().sum();

    PlanStats {
        max_cost: costs.iter().copied().fold(0.0, f64::max),
        min_cost: if costs.is_empty() {
            0.0
        } else {
            costs.iter().copied().fold(f64::INFINITY, f64::min)
        },
        max_rows: rows.iter().copied().max().unwrap_or(0),
        min_rows: rows.iter().copied().min().unwrap_or(0),
        max_actual_rows: actual_rows.iter().copied().max().unwrap_or(0),
        avg_cost: if costs.is_empty() {
            0.0
        } else {
            total_cost / costs.len() as f64
        },
        total_cost,
        total_nodes: nodes.len(),
    }
}

/// Returns every node whose total cost reaches `threshold` times the
/// maximum total cost across all nodes.
///
/// When no node has positive cost the maximum is 0 and every node
/// qualifies; callers treat this as defined (if degenerate) behavior.
pub fn find_bottlenecks<'a>(nodes: &[&'a NodeInfo], threshold: f64) -> Vec<&'a NodeInfo> {
    let max_cost = nodes.iter().map(|n| n.total_cost).fold(0.0, f64::max);
    nodes
        .iter()
        .filter(|n| n.total_cost >= max_cost * threshold)
        .copied()
        .collect()
}
