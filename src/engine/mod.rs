//! Collaborator seam for the backing database.
//!
//! The pipeline never talks to a database directly; it consumes two small
//! capabilities. [`PlanSource`] produces a raw plan tree for a query (and
//! executes queries for the passthrough endpoint), [`SchemaSource`] answers
//! catalog lookups for a relation. [`SqliteEngine`] implements both over an
//! embedded database; [`MemoryEngine`] is the fixture used by tests and
//! prototyping.

use serde::Serialize;
use thiserror::Error;

use crate::plan::RawPlanNode;

/// In-memory fixture implementation.
pub mod memory;

/// Embedded SQLite implementation.
pub mod sqlite;

pub use memory::MemoryEngine;
pub use sqlite::SqliteEngine;

/// Errors surfaced by engine implementations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The underlying database rejected a statement or connection.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// I/O failure while reaching the database file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Explain produced no usable plan for the query.
    #[error("explain produced no plan")]
    EmptyPlan,
    /// The fixture has no entry for the requested item.
    #[error("{0} not found")]
    NotFound(&'static str),
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// One column of a relation as reported by the schema catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Catalog type name.
    pub column_type: String,
    /// Ordinal position within the relation, starting at 0.
    pub ordinal: u64,
}

/// One output field of an executed query.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldInfo {
    /// Field name.
    pub name: String,
    /// Declared type of the field, empty when the engine reports none.
    pub data_type: String,
}

/// Result rows of a passthrough query execution.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRows {
    /// Rows as JSON objects keyed by field name.
    pub rows: Vec<serde_json::Value>,
    /// Number of rows returned.
    pub row_count: usize,
    /// Output field descriptors.
    pub fields: Vec<FieldInfo>,
}

/// Produces raw plan trees and executes queries.
///
/// `explain_plan` may legitimately fail (bad SQL, lost connection); that is
/// propagated to the caller as a request-level failure. A returned tree is
/// structurally valid by contract.
pub trait PlanSource {
    /// Explains `query` and returns the engine's raw plan tree.
    fn explain_plan(&self, query: &str) -> Result<RawPlanNode>;

    /// Executes `query` and returns its rows.
    fn run_query(&self, query: &str) -> Result<QueryRows>;
}

/// Answers schema catalog lookups for one relation.
///
/// Every method may return an empty list: a relation without a catalog entry
/// or without keys is not an error.
pub trait SchemaSource {
    /// Ordered column list with catalog types.
    fn schema_columns(&self, relation: &str) -> Result<Vec<ColumnInfo>>;

    /// Names of the relation's primary-key columns.
    fn primary_key_columns(&self, relation: &str) -> Result<Vec<String>>;

    /// Names of the relation's foreign-key columns.
    fn foreign_key_columns(&self, relation: &str) -> Result<Vec<String>>;
}

/// Full engine capability: plans, execution, and schema catalog.
pub trait Engine: PlanSource + SchemaSource {}

impl<T: PlanSource + SchemaSource> Engine for T {}
