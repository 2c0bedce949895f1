//! Library interface for embedgraph-cli
//!
//! Exposes the pipeline orchestrator and the query API so integration tests
//! can drive them without the binary.
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::float_cmp,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Test allows"
    )
)]

/// Sequencing of a full processing run.
pub mod pipeline;
/// Read-only HTTP API over a run's database.
pub mod server;

pub use pipeline::{Pipeline, PipelineError, PipelineStage, RunReport, StageProgress};
pub use server::{ApiResponse, GraphData, GraphLink, GraphNode, build_graph, router, serve};
