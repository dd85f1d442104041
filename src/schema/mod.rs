//! Relation schema resolution for scanned relations.
//!
//! [`Tables`] walks the flattened node list once, issues three catalog
//! lookups per distinct scanned relation (primary keys, foreign keys,
//! ordered columns), and exposes pure lookups over the result. Every lookup
//! fails soft: unknown tables, columns, and aliases resolve to a defined
//! absence so the graph stays renderable.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::engine::SchemaSource;
use crate::error::Result;
use crate::plan::NodeInfo;

/// Role a column plays in its relation's key structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum KeyType {
    /// Primary-key column.
    #[serde(rename = "PK")]
    Primary,
    /// Foreign-key column.
    #[serde(rename = "FK")]
    Foreign,
    /// Column that participates in both key kinds.
    #[serde(rename = "PK, FK")]
    PrimaryForeign,
}

/// One column of a relation with its catalog type and key role.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    /// Column name.
    pub name: String,
    /// Catalog type name; empty when the column could not be resolved.
    #[serde(rename = "type")]
    pub column_type: String,
    /// Key role, absent for plain columns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_type: Option<KeyType>,
}

/// Synthetic node representing the full schema of one scanned relation.
///
/// Created once per distinct relation; consumed only by the graph builder.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableNodeInfo {
    /// Identifier of the form `table-{scan id}`.
    pub id: String,
    /// Identifier of the scan node this relation feeds.
    pub target_node: String,
    /// Relation name.
    pub relation_name: String,
    /// Full ordered column list.
    pub columns: Vec<Attribute>,
    /// One band left of the scan it feeds.
    pub depth: i64,
    /// Estimated row count taken from the anchoring scan.
    pub row_count: u64,
}

/// Per-request schema resolver built from the flattened node list.
pub struct Tables {
    primary_keys: HashMap<String, HashSet<String>>,
    foreign_keys: HashMap<String, HashSet<String>>,
    column_types: HashMap<String, HashMap<String, String>>,
    aliases: HashMap<String, String>,
    table_nodes: Vec<TableNodeInfo>,
}

impl Tables {
    /// Resolves schema metadata for every distinct relation scanned by
    /// `nodes`, issuing three lookups per relation against `source`.
    ///
    /// Collaborator failure propagates; no partial resolver is returned.
    pub fn init<S: SchemaSource + ?Sized>(source: &S, nodes: &[&NodeInfo]) -> Result<Self> {
        let mut tables = Self {
            primary_keys: HashMap::new(),
            foreign_keys: HashMap::new(),
            column_types: HashMap::new(),
            aliases: HashMap::new(),
            table_nodes: Vec::new(),
        };

        for node in nodes {
            if !node.is_scan() {
                continue;
            }
            let Some(relation) = node.relation_name.as_deref() else {
                continue;
            };
            if let Some(alias) = node.alias.as_deref() {
                tables
                    .aliases
                    .entry(alias.to_owned())
                    .or_insert_with(|| relation.to_owned());
            }
            tables
                .aliases
                .entry(relation.to_owned())
                .or_insert_with(|| relation.to_owned());

            if tables.column_types.contains_key(relation) {
                continue;
            }
            tables.resolve_relation(source, relation, node)?;
        }

        Ok(tables)
    }

    fn resolve_relation<S: SchemaSource + ?Sized>(
        &mut self,
        source: &S,
        relation: &str,
        scan: &NodeInfo,
    ) -> Result<()> {
        let primary: HashSet<String> = source.primary_key_columns(relation)?.into_iter().collect();
        let foreign: HashSet<String> = source.foreign_key_columns(relation)?.into_iter().collect();
        let columns = source.schema_columns(relation)?;

        let mut types = HashMap::new();
        let attributes: Vec<Attribute> = columns
            .into_iter()
            .map(|column| {
                types.insert(column.name.clone(), column.column_type.clone());
                Attribute {
                    key_type: key_role_in(&primary, &foreign, &column.name),
                    name: column.name,
                    column_type: column.column_type,
                }
            })
            .collect();

        self.table_nodes.push(TableNodeInfo {
            id: format!("table-{}", scan.id),
            target_node: scan.id.clone(),
            relation_name: relation.to_owned(),
            columns: attributes,
            depth: scan.depth as i64 - 1,
            row_count: scan.plan_rows,
        });
        self.primary_keys.insert(relation.to_owned(), primary);
        self.foreign_keys.insert(relation.to_owned(), foreign);
        self.column_types.insert(relation.to_owned(), types);
        Ok(())
    }

    /// Synthetic relation nodes, in the order their scans appear in the plan.
    pub fn table_nodes(&self) -> &[TableNodeInfo] {
        &self.table_nodes
    }

    /// Whether `column` belongs to `table`'s primary key.
    pub fn is_primary_key(&self, table: &str, column: &str) -> bool {
        self.primary_keys
            .get(table)
            .is_some_and(|keys| keys.contains(column))
    }

    /// Whether `column` is one of `table`'s foreign-key columns.
    pub fn is_foreign_key(&self, table: &str, column: &str) -> bool {
        self.foreign_keys
            .get(table)
            .is_some_and(|keys| keys.contains(column))
    }

    /// Key role of `column` within `table`, if any.
    pub fn key_role(&self, table: &str, column: &str) -> Option<KeyType> {
        let primary = self.primary_keys.get(table)?;
        let foreign = self.foreign_keys.get(table)?;
        key_role_in(primary, foreign, column)
    }

    /// Catalog type of `column` within `table`. Unknown tables and columns
    /// (e.g. computed expression columns) resolve to `None`.
    pub fn column_type(&self, table: &str, column: &str) -> Option<&str> {
        self.column_types
            .get(table)?
            .get(column)
            .map(String::as_str)
    }

    /// Resolves a query alias to its base relation name.
    ///
    /// Output columns of joins and sorts are qualified by alias, not
    /// relation. An unresolved alias is returned unchanged so callers can
    /// still render the node.
    pub fn relation_from_alias<'a>(&'a self, alias: &'a str) -> &'a str {
        self.aliases.get(alias).map_or(alias, String::as_str)
    }
}

fn key_role_in(
    primary: &HashSet<String>,
    foreign: &HashSet<String>,
    column: &str,
) -> Option<KeyType> {
    match (primary.contains(column), foreign.contains(column)) {
        (true, true) => Some(KeyType::PrimaryForeign),
        (true, false) => Some(KeyType::Primary),
        (false, true) => Some(KeyType::Foreign),
        (false, false) => None,
    }
}
