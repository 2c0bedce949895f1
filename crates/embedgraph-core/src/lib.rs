//! Core types for the embedgraph pipeline.
//!
//! This crate provides the chunk and similarity data model, error handling,
//! and the configuration value objects shared by every other crate in the
//! workspace.
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Test allows"
    )
)]

/// Configuration for the model service and the processing pipeline.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// Chunk and similarity records.
pub mod types;

pub use config::{AppConfig, ModelConfig, PipelineConfig};
pub use error::{Error, Result};
pub use types::{ChunkSimilarity, TextChunk};
