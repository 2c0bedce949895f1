//! File-based SQLite store for chunks and their pairwise similarities.
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

/// Store error type.
pub mod error;
/// Table definitions.
mod schema;
/// The [`Store`] handle and its queries.
pub mod store;

pub use error::{Result, StoreError};
pub use store::{Store, database_path_for};
