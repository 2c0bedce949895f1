use core::result::Result as CoreResult;
use std::io::Error as IoError;
use std::path::PathBuf;

use serde_json::Error as SerdeJsonError;
use sqlx::Error as SqlxError;
use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = CoreResult<T, StoreError>;

/// Errors raised by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database rejected or failed a statement.
    #[error("database error: {0}")]
    Database(#[from] SqlxError),

    /// Preparing the output location failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// An embedding could not be encoded for storage or parsed back.
    #[error("failed to convert embedding of chunk {chunk}: {source}")]
    Embedding {
        /// Chunk index for writes, row id for reads
        chunk: i64,
        /// JSON error
        #[source]
        source: SerdeJsonError,
    },

    /// Inserting one similarity record of a batch failed; nothing was kept.
    #[error("failed to insert similarity between chunks {first} and {second}: {source}")]
    Similarity {
        /// First chunk id of the pair
        first: i64,
        /// Second chunk id of the pair
        second: i64,
        /// Database error
        #[source]
        source: SqlxError,
    },

    /// The database file does not exist.
    #[error("database not found: {}", .0.display())]
    NotFound(PathBuf),
}
