//! Plangraph turns a relational query engine's execution-plan description
//! into a positioned, typed graph suitable for diagram rendering.
//!
//! The pipeline runs in three stages: [`plan::PlanParser`] converts the raw
//! explain tree into annotated nodes, [`schema::Tables`] enriches scanned
//! relations with catalog metadata, and [`graph::QueryGraph`] classifies the
//! nodes and lays them out as a dataflow graph.

#![warn(missing_docs)]

/// Collaborator seam for the backing database: plan production, query
/// execution, and schema catalog lookups.
pub mod engine;

/// Crate-wide error type and result alias.
pub mod error;

/// Graph construction: node categories, display payloads, dataflow edges,
/// and the two-dimensional layout pass.
pub mod graph;

/// Raw plan input and the parser producing annotated plan nodes with
/// derived statistics.
pub mod plan;

/// Request orchestration from query text to explain payloads and graphs.
pub mod pipeline;

/// Relation schema resolution: key roles, column types, and the synthetic
/// table nodes feeding scan operators.
pub mod schema;

/// HTTP surface exposing the pipeline to the rendering frontend.
pub mod server;
