use std::io;
use thiserror::Error;

use crate::engine::EngineError;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PlanGraphError>;

/// Top-level error for the plan-to-graph pipeline.
#[derive(Debug, Error)]
pub enum PlanGraphError {
    /// I/O failure outside the database engine.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The backing engine failed to produce a plan, rows, or catalog data.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}
