//! Engine implementation over an embedded SQLite database.
//!
//! Schema lookups go through the `pragma_table_info` / `pragma_foreign_key_list`
//! table-valued functions. Plans come from `EXPLAIN QUERY PLAN`, whose detail
//! strings are mapped onto the operator vocabulary the parser understands;
//! SQLite reports no costs, so every cost and row field carries the defined
//! zero substitution.

use std::collections::HashMap;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::{Map, Number, Value};

use crate::engine::{
    ColumnInfo, EngineError, FieldInfo, PlanSource, QueryRows, Result, SchemaSource,
};
use crate::plan::RawPlanNode;

/// Engine backed by a SQLite database file.
pub struct SqliteEngine {
    conn: Mutex<Connection>,
}

impl SqliteEngine {
    /// Opens the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Executes a batch of SQL statements, e.g. a schema dump.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }
}

struct EqpRow {
    id: i64,
    parent: i64,
    detail: String,
}

impl PlanSource for SqliteEngine {
    fn explain_plan(&self, query: &str) -> Result<RawPlanNode> {
        let conn = self.conn.lock();
        let sql = format!("EXPLAIN QUERY PLAN {query}");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(EqpRow {
                    id: row.get(0)?,
                    parent: row.get(1)?,
                    detail: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        assemble_plan(rows)
    }

    fn run_query(&self, query: &str) -> Result<QueryRows> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(query)?;
        let fields: Vec<FieldInfo> = stmt
            .columns()
            .iter()
            .map(|col| FieldInfo {
                name: col.name().to_owned(),
                data_type: col.decl_type().unwrap_or("").to_lowercase(),
            })
            .collect();
        let column_count = stmt.column_count();

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut object = Map::new();
            for (index, field) in fields.iter().enumerate().take(column_count) {
                object.insert(field.name.clone(), json_value(row.get_ref(index)?));
            }
            out.push(Value::Object(object));
        }
        Ok(QueryRows {
            row_count: out.len(),
            rows: out,
            fields,
        })
    }
}

impl SchemaSource for SqliteEngine {
    fn schema_columns(&self, relation: &str) -> Result<Vec<ColumnInfo>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT cid, name, type FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map([relation], |row| {
                Ok(ColumnInfo {
                    ordinal: row.get::<_, i64>(0)? as u64,
                    name: row.get(1)?,
                    column_type: row.get::<_, String>(2)?.to_lowercase(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(columns)
    }

    fn primary_key_columns(&self, relation: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT name FROM pragma_table_info(?1) WHERE pk > 0 ORDER BY pk")?;
        let keys = stmt
            .query_map([relation], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keys)
    }

    fn foreign_key_columns(&self, relation: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT \"from\" FROM pragma_foreign_key_list(?1)")?;
        let keys = stmt
            .query_map([relation], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keys)
    }
}

fn assemble_plan(rows: Vec<EqpRow>) -> Result<RawPlanNode> {
    let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
    let mut nodes: HashMap<i64, RawPlanNode> = HashMap::new();
    let mut order: Vec<i64> = Vec::new();

    for row in rows {
        children.entry(row.parent).or_default().push(row.id);
        nodes.insert(row.id, node_from_detail(&row.detail));
        order.push(row.id);
    }

    // Attach children to parents deepest-first so each subtree is complete
    // before its parent collects it.
    for id in order.iter().rev() {
        if let Some(child_ids) = children.remove(id) {
            let plans: Vec<RawPlanNode> = child_ids
                .into_iter()
                .filter_map(|child| nodes.remove(&child))
                .collect();
            if let Some(node) = nodes.get_mut(id) {
                node.plans = plans;
            }
        }
    }

    let mut roots: Vec<RawPlanNode> = children
        .remove(&0)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|id| nodes.remove(&id))
        .collect();

    match roots.len() {
        0 => Err(EngineError::EmptyPlan),
        1 => Ok(roots.remove(0)),
        _ => Ok(RawPlanNode::with_plans("Result", roots)),
    }
}

/// Maps one `EXPLAIN QUERY PLAN` detail line onto the raw-plan vocabulary.
fn node_from_detail(detail: &str) -> RawPlanNode {
    let detail = detail.trim();

    if let Some(rest) = detail.strip_prefix("SCAN ") {
        return scan_node(rest, "Seq Scan");
    }
    if let Some(rest) = detail.strip_prefix("SEARCH ") {
        return scan_node(rest, "Index Scan");
    }
    if detail.contains("USE TEMP B-TREE FOR ORDER BY") {
        return RawPlanNode::new("Sort");
    }
    if detail.contains("USE TEMP B-TREE FOR GROUP BY") {
        return RawPlanNode::new("Aggregate");
    }

    RawPlanNode::new(detail)
}

fn scan_node(rest: &str, sequential_type: &str) -> RawPlanNode {
    let (target, access) = match rest.split_once(" USING ") {
        Some((target, access)) => (target, Some(access)),
        None => (rest, None),
    };
    let relation = target.split_whitespace().next().unwrap_or(target);

    let mut node = match access {
        Some(access) if access.starts_with("COVERING INDEX ") => {
            let mut node = RawPlanNode::new("Index Only Scan");
            node.index_name = index_name(access.trim_start_matches("COVERING INDEX "));
            node.index_cond = index_cond(access);
            node
        }
        Some(access) if access.starts_with("INDEX ") => {
            let mut node = RawPlanNode::new("Index Scan");
            node.index_name = index_name(access.trim_start_matches("INDEX "));
            node.index_cond = index_cond(access);
            node
        }
        Some(access) if access.starts_with("INTEGER PRIMARY KEY") => {
            let mut node = RawPlanNode::new("Index Scan");
            node.index_cond = index_cond(access);
            node
        }
        Some(_) => RawPlanNode::new(sequential_type),
        None => RawPlanNode::new(sequential_type),
    };

    node.relation_name = Some(relation.to_owned());
    node.alias = Some(relation.to_owned());
    node
}

fn index_name(access: &str) -> Option<String> {
    let name = access.split(" (").next().unwrap_or(access).trim();
    (!name.is_empty()).then(|| name.to_owned())
}

fn index_cond(access: &str) -> Option<String> {
    let open = access.find('(')?;
    let close = access.rfind(')')?;
    (close > open).then(|| access[open..=close].to_owned())
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(Number::from(i)),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => Value::String(BASE64.encode(blob)),
    }
}
