//! Conversion of the raw explain tree into annotated [`NodeInfo`] nodes.
//!
//! Identifier assignment uses a counter threaded through the recursion and
//! scoped to a single top-level [`PlanParser::parse`] call, so concurrent
//! parses can never interfere with each other's id sequences.

use serde::Serialize;

use crate::plan::raw::RawPlanNode;
use crate::plan::NodeInfo;

/// One parent/child edge of the plan tree, oriented parent → child.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TreeLink {
    /// Identifier of the parent node.
    pub source: String,
    /// Identifier of the child node.
    pub target: String,
}

/// Converts raw plan trees into [`NodeInfo`] trees and derives flat views
/// over them.
pub struct PlanParser;

impl PlanParser {
    /// Converts a raw plan tree into an annotated node tree.
    ///
    /// The root receives depth 0 and no parent; each child gets its parent's
    /// id and `depth + 1`. Ids are `node-{n}` with `n` counting pre-order
    /// from 1.
    pub fn parse(raw: &RawPlanNode) -> NodeInfo {
        let mut counter = 0u64;
        Self::convert(raw, None, 0, &mut counter)
    }

    fn convert(
        raw: &RawPlanNode,
        parent_id: Option<&str>,
        depth: usize,
        counter: &mut u64,
    ) -> NodeInfo {
        *counter += 1;
        let id = format!("node-{counter}");

        let children = raw
            .plans
            .iter()
            .map(|child| Self::convert(child, Some(&id), depth + 1, counter))
            .collect();

        NodeInfo {
            node_type: raw.node_type.clone(),
            depth,
            parent_id: parent_id.map(str::to_owned),
            relation_name: raw.relation_name.clone(),
            alias: raw.alias.clone(),
            startup_cost: raw.startup_cost,
            total_cost: raw.total_cost,
            plan_rows: raw.plan_rows,
            actual_rows: raw.actual_rows,
            actual_time: raw.actual_total_time,
            filter: raw.filter.clone().or_else(|| raw.join_filter.clone()),
            index_cond: raw.index_cond.clone(),
            index_name: raw.index_name.clone(),
            rows_removed: raw.rows_removed_by_filter,
            join_type: raw.join_type.clone(),
            inner_unique: raw.inner_unique,
            hash_cond: raw.hash_cond.clone(),
            merge_cond: raw.merge_cond.clone(),
            group_key: raw.group_key.clone(),
            sort_key: raw.sort_key.clone(),
            sort_method: raw.sort_method.clone(),
            output: raw.output.clone(),
            children,
            id,
        }
    }

    /// Returns one `(parent, child)` link per tree edge, in pre-order.
    pub fn tree_links(root: &NodeInfo) -> Vec<TreeLink> {
        let mut links = Vec::new();
        Self::collect_links(root, &mut links);
        links
    }

    fn collect_links(node: &NodeInfo, links: &mut Vec<TreeLink>) {
        for child in &node.children {
            links.push(TreeLink {
                source: node.id.clone(),
                target: child.id.clone(),
            });
            Self::collect_links(child, links);
        }
    }

    /// Lists every node in post-order, children before their parent. This
    /// reflects actual operator execution order in a pipelined engine.
    pub fn execution_order(root: &NodeInfo) -> Vec<&NodeInfo> {
        let mut order = Vec::new();
        Self::collect_post_order(root, &mut order);
        order
    }

    fn collect_post_order<'a>(node: &'a NodeInfo, order: &mut Vec<&'a NodeInfo>) {
        for child in &node.children {
            Self::collect_post_order(child, order);
        }
        order.push(node);
    }

    /// Flattens the tree in pre-order, root first.
    pub fn flatten(root: &NodeInfo) -> Vec<&NodeInfo> {
        let mut nodes = Vec::new();
        Self::collect_pre_order(root, &mut nodes);
        nodes
    }

    fn collect_pre_order<'a>(node: &'a NodeInfo, nodes: &mut Vec<&'a NodeInfo>) {
        nodes.push(node);
        for child in &node.children {
            Self::collect_pre_order(child, nodes);
        }
    }
}
