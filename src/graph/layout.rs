//! Two-dimensional placement of graph nodes.
//!
//! Horizontal placement bands nodes by inverted plan depth so data sources
//! sit left and the final result right, with relation pseudo-nodes pinned at
//! the far left. Vertical placement is a constraint propagation over the
//! dataflow DAG: source nodes keep their stacked coordinates, multi-input
//! nodes (Join/Mini) pull the minimum of their producers so stacked source
//! branches stay aligned through merge points, and each computed value flows
//! forward along the node's single outgoing edge.

use std::collections::HashMap;

use tracing::warn;

use crate::graph::{Edge, Graph, GraphNode, NodeCategory};

/// Horizontal distance between adjacent depth bands.
pub const X_SPACING: f64 = 260.0;

/// Vertical coordinates below this value count as not yet assigned.
pub const UNASSIGNED_Y: f64 = 200.0;

/// Downward offset nesting pass-through nodes below their inputs.
const MINI_DROP: f64 = 60.0;

/// Vertical coordinate of the first relation node.
const TABLE_BASE_Y: f64 = 240.0;

/// Height of a relation node's header section.
const TABLE_HEADER_H: f64 = 52.0;

/// Height of one attribute row in a relation node.
const ATTR_ROW_H: f64 = 28.0;

/// Vertical gap between stacked relation nodes.
const TABLE_GAP: f64 = 40.0;

/// Assigns a position to every node of the graph in place.
pub fn assign_positions(graph: &mut Graph) {
    band_horizontally(&mut graph.nodes);
    stack_tables(&mut graph.nodes);
    propagate_heights(&mut graph.nodes, &graph.edges);
}

/// Re-maps plan depth to `|depth - max_depth| + 1` so the deepest operators
/// (data sources) land in band 1 and the root in the rightmost band, then
/// converts bands to coordinates. Relation nodes are pinned at x = 0.
fn band_horizontally(nodes: &mut [GraphNode]) {
    let max_depth = nodes
        .iter()
        .filter(|node| node.category != NodeCategory::Table)
        .map(|node| node.data.depth())
        .max()
        .unwrap_or(0);

    for node in nodes.iter_mut() {
        node.position.x = if node.category == NodeCategory::Table {
            0.0
        } else {
            ((node.data.depth() - max_depth).abs() + 1) as f64 * X_SPACING
        };
    }
}

/// Stacks relation nodes vertically in declaration order, each offset by the
/// previous relation's attribute count so boxes never overlap.
fn stack_tables(nodes: &mut [GraphNode]) {
    let mut cursor = TABLE_BASE_Y;
    for node in nodes.iter_mut() {
        if node.category != NodeCategory::Table {
            continue;
        }
        node.position.y = cursor;
        cursor += TABLE_HEADER_H + node.data.attribute_count() as f64 * ATTR_ROW_H + TABLE_GAP;
    }
}

/// Dataflow adjacency over node indices: producers per node and the single
/// consumer the tree shape guarantees.
struct Adjacency {
    incoming: Vec<Vec<usize>>,
    outgoing: Vec<Option<usize>>,
}

impl Adjacency {
    fn build(nodes: &[GraphNode], edges: &[Edge]) -> Self {
        let index: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.as_str(), i))
            .collect();

        let mut incoming = vec![Vec::new(); nodes.len()];
        let mut outgoing = vec![None; nodes.len()];
        for edge in edges {
            let (Some(&source), Some(&target)) = (
                index.get(edge.source.as_str()),
                index.get(edge.target.as_str()),
            ) else {
                // Endpoints were validated during graph assembly.
                continue;
            };
            if outgoing[source].is_some() {
                warn!(edge = %edge.id, "node has more than one consumer; edge ignored by layout");
                continue;
            }
            outgoing[source] = Some(target);
            incoming[target].push(source);
        }
        Self { incoming, outgoing }
    }
}

/// Runs the height propagation: one pass seeded from every source or
/// unassigned node, then one corrective pass for nodes the first sweep's
/// iteration order missed. The sweep is idempotent; re-running it on an
/// already-correct graph reproduces the same coordinates.
fn propagate_heights(nodes: &mut [GraphNode], edges: &[Edge]) {
    let adjacency = Adjacency::build(nodes, edges);

    for start in 0..nodes.len() {
        if adjacency.incoming[start].is_empty() || nodes[start].position.y < UNASSIGNED_Y {
            let seed = nodes[start].position.y;
            propagate(nodes, &adjacency, start, seed);
        }
    }
    for start in 0..nodes.len() {
        if nodes[start].position.y < UNASSIGNED_Y {
            let seed = nodes[start].position.y;
            propagate(nodes, &adjacency, start, seed);
        }
    }
}

fn propagate(nodes: &mut [GraphNode], adjacency: &Adjacency, index: usize, y: f64) {
    let value = match nodes[index].category {
        NodeCategory::Join => min_producer_y(nodes, &adjacency.incoming[index]).unwrap_or(y),
        NodeCategory::Mini => min_producer_y(nodes, &adjacency.incoming[index])
            .map(|min| min + MINI_DROP)
            .unwrap_or(y),
        _ => y,
    };
    nodes[index].position.y = value;

    if let Some(consumer) = adjacency.outgoing[index] {
        propagate(nodes, adjacency, consumer, value);
    }
}

fn min_producer_y(nodes: &[GraphNode], producers: &[usize]) -> Option<f64> {
    producers
        .iter()
        .map(|&producer| nodes[producer].position.y)
        .fold(None, |min, y| match min {
            Some(current) => Some(f64::min(current, y)),
            None => Some(y),
        })
}
