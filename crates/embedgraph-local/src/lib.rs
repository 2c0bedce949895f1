//! Client for the local model service and the concurrent batch pool that
//! fans chunks out to it.
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

/// Seam between the batch pool and a concrete model service.
pub mod backend;
/// Bounded, order-preserving concurrent batch operations.
pub mod batch;
/// HTTP client for single-item embedding and summary calls.
pub mod client;
/// Error types for model service calls and batches.
pub mod error;
/// Service availability and model installation checks.
pub mod manager;
/// Wire types of the model service API.
pub mod models;
/// Normalization of raw summary output.
pub mod summary;

pub use backend::ModelBackend;
pub use batch::{BatchProcessor, ProgressCallback, resolve_workers};
pub use client::OllamaClient;
pub use error::{BatchFailure, BatchStage, ItemFailure, LocalError, Result};
pub use manager::OllamaManager;
pub use summary::{MAX_SUMMARY_WORDS, clean_summary};
