use plangraph::engine::MemoryEngine;
use plangraph::graph::{layout, NodeCategory, OperatorKind, QueryGraph};
use plangraph::plan::{PlanParser, RawPlanNode};
use plangraph::schema::Tables;
use proptest::prelude::*;
use serde_json::json;

fn actor_engine() -> MemoryEngine {
    MemoryEngine::new()
        .with_table("actor", &[("actor_id", "int4"), ("first_name", "varchar")])
        .with_primary_keys("actor", &["actor_id"])
}

fn single_scan_plan() -> RawPlanNode {
    serde_json::from_value(json!({
        "Node Type": "Seq Scan",
        "Relation Name": "actor",
        "Alias": "actor",
        "Total Cost": 4.5,
        "Plan Rows": 200,
        "Output": ["actor_id", "first_name"]
    }))
    .expect("fixture deserializes")
}

fn hash_join_plan() -> RawPlanNode {
    serde_json::from_value(json!({
        "Node Type": "Hash Join",
        "Total Cost": 155.12,
        "Output": ["a.first_name", "fa.film_id"],
        "Plans": [
            {
                "Node Type": "Seq Scan",
                "Relation Name": "film_actor",
                "Alias": "fa",
                "Total Cost": 84.62,
                "Plan Rows": 5462,
                "Output": ["fa.actor_id", "fa.film_id"]
            },
            {
                "Node Type": "Hash",
                "Total Cost": 64.0,
                "Plans": [
                    {
                        "Node Type": "Seq Scan",
                        "Relation Name": "actor",
                        "Alias": "a",
                        "Total Cost": 64.0,
                        "Plan Rows": 200,
                        "Output": ["a.actor_id", "a.first_name"]
                    }
                ]
            }
        ]
    }))
    .expect("fixture deserializes")
}

fn join_engine() -> MemoryEngine {
    MemoryEngine::new()
        .with_table("actor", &[("actor_id", "int4"), ("first_name", "varchar")])
        .with_primary_keys("actor", &["actor_id"])
        .with_table("film_actor", &[("actor_id", "int2"), ("film_id", "int2")])
        .with_primary_keys("film_actor", &["actor_id", "film_id"])
        .with_foreign_keys("film_actor", &["actor_id", "film_id"])
}

#[test]
fn single_scan_produces_relation_scan_and_one_edge() {
    let engine = actor_engine();
    let root = PlanParser::parse(&single_scan_plan());
    let flat = PlanParser::flatten(&root);
    let tables = Tables::init(&engine, &flat).expect("init succeeds");
    let graph = QueryGraph::build(&flat, &tables);

    assert_eq!(graph.nodes.len(), 2);
    assert_eq!(graph.edges.len(), 1);

    let table = &graph.nodes[0];
    let scan = &graph.nodes[1];
    assert_eq!(table.category, NodeCategory::Table);
    assert_eq!(scan.category, NodeCategory::Scan);

    let edge = &graph.edges[0];
    assert_eq!(edge.source, table.id, "relation feeds its scan");
    assert_eq!(edge.target, scan.id);
    assert_eq!(edge.id, format!("e-{}-{}", table.id, scan.id));
}

#[test]
fn single_scan_resolves_primary_key_attribute() {
    let engine = actor_engine();
    let root = PlanParser::parse(&single_scan_plan());
    let flat = PlanParser::flatten(&root);
    let tables = Tables::init(&engine, &flat).expect("init succeeds");
    let graph = QueryGraph::build(&flat, &tables);

    let scan = serde_json::to_value(&graph.nodes[1]).expect("scan serializes");
    let columns = scan["data"]["columns"]
        .as_array()
        .expect("scan payload carries columns");
    let actor_id = columns
        .iter()
        .find(|c| c["name"] == "actor_id")
        .expect("actor_id resolved");
    assert_eq!(actor_id["type"], "int4");
    assert_eq!(actor_id["keyType"], "PK");

    let first_name = columns
        .iter()
        .find(|c| c["name"] == "first_name")
        .expect("first_name resolved");
    assert_eq!(first_name["keyType"], serde_json::Value::Null);
}

#[test]
fn hash_join_graph_has_expected_shape_and_join_height() {
    let engine = join_engine();
    let root = PlanParser::parse(&hash_join_plan());
    let flat = PlanParser::flatten(&root);
    let tables = Tables::init(&engine, &flat).expect("init succeeds");
    let graph = QueryGraph::build(&flat, &tables);

    let count = |category: NodeCategory| {
        graph
            .nodes
            .iter()
            .filter(|n| n.category == category)
            .count()
    };
    assert_eq!(count(NodeCategory::Table), 2);
    assert_eq!(count(NodeCategory::Scan), 2);
    assert_eq!(count(NodeCategory::Mini), 1);
    assert_eq!(count(NodeCategory::Join), 1);

    // 2 relation edges + 3 reversed tree edges.
    assert_eq!(graph.edges.len(), 5);

    let find = |id: &str| graph.nodes.iter().find(|n| n.id == id).expect("node");
    let join = find("node-1");
    let outer_scan = find("node-2");
    let hash = find("node-3");
    assert_eq!(
        join.position.y,
        f64::min(outer_scan.position.y, hash.position.y),
        "join aligns with the lowest producer branch"
    );
}

#[test]
fn horizontal_bands_invert_depth_and_pin_tables_left() {
    let engine = join_engine();
    let root = PlanParser::parse(&hash_join_plan());
    let flat = PlanParser::flatten(&root);
    let tables = Tables::init(&engine, &flat).expect("init succeeds");
    let graph = QueryGraph::build(&flat, &tables);

    let find = |id: &str| graph.nodes.iter().find(|n| n.id == id).expect("node");
    // Deepest operator (the inner scan at depth 2) lands in band 1; the root
    // join in band 3. Relation nodes sit at x = 0.
    assert_eq!(find("node-4").position.x, layout::X_SPACING);
    assert_eq!(find("node-3").position.x, 2.0 * layout::X_SPACING);
    assert_eq!(find("node-1").position.x, 3.0 * layout::X_SPACING);
    assert_eq!(find("table-node-2").position.x, 0.0);
    assert_eq!(find("table-node-4").position.x, 0.0);
}

#[test]
fn stacked_tables_never_share_a_vertical_slot() {
    let engine = join_engine();
    let root = PlanParser::parse(&hash_join_plan());
    let flat = PlanParser::flatten(&root);
    let tables = Tables::init(&engine, &flat).expect("init succeeds");
    let graph = QueryGraph::build(&flat, &tables);

    let table_ys: Vec<f64> = graph
        .nodes
        .iter()
        .filter(|n| n.category == NodeCategory::Table)
        .map(|n| n.position.y)
        .collect();
    assert_eq!(table_ys.len(), 2);
    assert!(table_ys[1] > table_ys[0], "second table stacks below");
}

#[test]
fn mini_nodes_nest_below_their_inputs() {
    let engine = join_engine();
    let root = PlanParser::parse(&hash_join_plan());
    let flat = PlanParser::flatten(&root);
    let tables = Tables::init(&engine, &flat).expect("init succeeds");
    let graph = QueryGraph::build(&flat, &tables);

    let find = |id: &str| graph.nodes.iter().find(|n| n.id == id).expect("node");
    let hash = find("node-3");
    let inner_scan = find("node-4");
    assert!(
        hash.position.y > inner_scan.position.y,
        "hash drops below the scan feeding it"
    );
}

#[test]
fn layout_is_idempotent() {
    let engine = join_engine();
    let root = PlanParser::parse(&hash_join_plan());
    let flat = PlanParser::flatten(&root);
    let tables = Tables::init(&engine, &flat).expect("init succeeds");
    let mut graph = QueryGraph::build(&flat, &tables);

    let before: Vec<(String, f64, f64)> = graph
        .nodes
        .iter()
        .map(|n| (n.id.clone(), n.position.x, n.position.y))
        .collect();

    layout::assign_positions(&mut graph);

    let after: Vec<(String, f64, f64)> = graph
        .nodes
        .iter()
        .map(|n| (n.id.clone(), n.position.x, n.position.y))
        .collect();
    assert_eq!(before, after);
}

#[test]
fn deep_join_chain_assigns_every_plan_node() {
    // Left-deep chain of three joins over four scans; the correction pass
    // must leave no node at its default coordinate.
    let scan = |relation: &str| {
        json!({
            "Node Type": "Seq Scan",
            "Relation Name": relation,
            "Alias": relation,
            "Total Cost": 10.0
        })
    };
    let raw: RawPlanNode = serde_json::from_value(json!({
        "Node Type": "Nested Loop",
        "Plans": [
            {
                "Node Type": "Nested Loop",
                "Plans": [
                    {
                        "Node Type": "Nested Loop",
                        "Plans": [scan("t1"), scan("t2")]
                    },
                    scan("t3")
                ]
            },
            scan("t4")
        ]
    }))
    .expect("fixture deserializes");

    let engine = MemoryEngine::new()
        .with_table("t1", &[("id", "int4")])
        .with_table("t2", &[("id", "int4")])
        .with_table("t3", &[("id", "int4")])
        .with_table("t4", &[("id", "int4")]);
    let root = PlanParser::parse(&raw);
    let flat = PlanParser::flatten(&root);
    let tables = Tables::init(&engine, &flat).expect("init succeeds");
    let graph = QueryGraph::build(&flat, &tables);

    for node in &graph.nodes {
        assert!(
            node.position.y >= layout::UNASSIGNED_Y,
            "{} left unassigned at y={}",
            node.id,
            node.position.y
        );
    }
}

#[test]
fn plan_without_scans_still_lays_out() {
    let raw: RawPlanNode =
        serde_json::from_value(json!({ "Node Type": "Result" })).expect("fixture deserializes");
    let engine = MemoryEngine::new();
    let root = PlanParser::parse(&raw);
    let flat = PlanParser::flatten(&root);
    let tables = Tables::init(&engine, &flat).expect("init succeeds");
    let graph = QueryGraph::build(&flat, &tables);

    assert_eq!(graph.nodes.len(), 1);
    assert!(graph.edges.is_empty());
    assert_eq!(graph.nodes[0].position.x, layout::X_SPACING);
}

#[test]
fn unknown_category_attribute_resolution_fails_soft() {
    // A sort over a join output with one unresolvable expression column.
    let raw: RawPlanNode = serde_json::from_value(json!({
        "Node Type": "Sort",
        "Sort Key": ["a.first_name"],
        "Output": ["a.first_name", "count(*)"],
        "Plans": [
            {
                "Node Type": "Seq Scan",
                "Relation Name": "actor",
                "Alias": "a",
                "Output": ["a.actor_id", "a.first_name"]
            }
        ]
    }))
    .expect("fixture deserializes");
    let engine = actor_engine();
    let root = PlanParser::parse(&raw);
    let flat = PlanParser::flatten(&root);
    let tables = Tables::init(&engine, &flat).expect("init succeeds");
    let graph = QueryGraph::build(&flat, &tables);

    let sort = serde_json::to_value(&graph.nodes[1]).expect("sort serializes");
    let columns = sort["data"]["columns"].as_array().expect("columns present");
    assert_eq!(columns[0]["type"], "varchar");
    assert_eq!(columns[1]["type"], "", "expression column resolves to empty");
    assert_eq!(columns[1]["keyType"], serde_json::Value::Null);
}

proptest! {
    #[test]
    fn classification_is_total(name in ".*") {
        let category = OperatorKind::parse(&name).category();
        prop_assert!(matches!(
            category,
            NodeCategory::Scan
                | NodeCategory::Join
                | NodeCategory::Aggregate
                | NodeCategory::Sort
                | NodeCategory::Mini
                | NodeCategory::None
        ));
    }
}
