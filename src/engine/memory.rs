//! In-memory engine fixture used for tests and prototyping.

use std::collections::HashMap;

use crate::engine::{ColumnInfo, EngineError, PlanSource, QueryRows, Result, SchemaSource};
use crate::plan::RawPlanNode;

/// Builder-style fixture implementing the engine traits from registered
/// tables and plans.
#[derive(Default)]
pub struct MemoryEngine {
    columns: HashMap<String, Vec<ColumnInfo>>,
    primary_keys: HashMap<String, Vec<String>>,
    foreign_keys: HashMap<String, Vec<String>>,
    plans: HashMap<String, RawPlanNode>,
    rows: HashMap<String, QueryRows>,
}

impl MemoryEngine {
    /// Creates an empty fixture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a relation with its ordered `(name, type)` columns.
    pub fn with_table(mut self, relation: impl Into<String>, columns: &[(&str, &str)]) -> Self {
        let columns = columns
            .iter()
            .enumerate()
            .map(|(ordinal, (name, column_type))| ColumnInfo {
                name: (*name).to_owned(),
                column_type: (*column_type).to_owned(),
                ordinal: ordinal as u64,
            })
            .collect();
        self.columns.insert(relation.into(), columns);
        self
    }

    /// Registers the relation's primary-key columns.
    pub fn with_primary_keys(mut self, relation: impl Into<String>, keys: &[&str]) -> Self {
        self.primary_keys
            .insert(relation.into(), keys.iter().map(|k| (*k).to_owned()).collect());
        self
    }

    /// Registers the relation's foreign-key columns.
    pub fn with_foreign_keys(mut self, relation: impl Into<String>, keys: &[&str]) -> Self {
        self.foreign_keys
            .insert(relation.into(), keys.iter().map(|k| (*k).to_owned()).collect());
        self
    }

    /// Registers the plan returned when `query` is explained.
    pub fn with_plan(mut self, query: impl Into<String>, plan: RawPlanNode) -> Self {
        self.plans.insert(query.into(), plan);
        self
    }

    /// Registers the rows returned when `query` is executed.
    pub fn with_rows(mut self, query: impl Into<String>, rows: QueryRows) -> Self {
        self.rows.insert(query.into(), rows);
        self
    }
}

impl PlanSource for MemoryEngine {
    fn explain_plan(&self, query: &str) -> Result<RawPlanNode> {
        self.plans
            .get(query)
            .cloned()
            .ok_or(EngineError::NotFound("plan"))
    }

    fn run_query(&self, query: &str) -> Result<QueryRows> {
        Ok(self.rows.get(query).cloned().unwrap_or_default())
    }
}

impl SchemaSource for MemoryEngine {
    fn schema_columns(&self, relation: &str) -> Result<Vec<ColumnInfo>> {
        Ok(self.columns.get(relation).cloned().unwrap_or_default())
    }

    fn primary_key_columns(&self, relation: &str) -> Result<Vec<String>> {
        Ok(self.primary_keys.get(relation).cloned().unwrap_or_default())
    }

    fn foreign_key_columns(&self, relation: &str) -> Result<Vec<String>> {
        Ok(self.foreign_keys.get(relation).cloned().unwrap_or_default())
    }
}
