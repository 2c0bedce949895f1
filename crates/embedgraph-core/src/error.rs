use core::result::Result as CoreResult;
use std::io::Error as IoError;

use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use toml::de::Error as TomlError;

/// Result type for core operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors that can occur in the core library.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] SerdeJsonError),

    /// TOML deserialization failed.
    #[error("TOML deserialization error: {0}")]
    Toml(#[from] TomlError),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Two vectors of different length were compared.
    #[error("vectors must have the same length: {left} vs {right}")]
    DimensionMismatch {
        /// Length of the first vector.
        left: usize,
        /// Length of the second vector.
        right: usize,
    },

    /// Comparing a pair of chunks failed.
    #[error("failed to compare chunks {first} and {second}: {source}")]
    PairComparison {
        /// Chunk index of the lower-positioned chunk.
        first: usize,
        /// Chunk index of the higher-positioned chunk.
        second: usize,
        /// Underlying vector math failure.
        #[source]
        source: Box<Error>,
    },

    /// A chunk that was never persisted reached a stage that needs its id.
    #[error("chunk {0} has no id; persist it before computing similarities")]
    UnpersistedChunk(usize),

    /// A general error not covered by other variants.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Returns `true` when the error signals corrupted embedding data rather
    /// than an environmental failure.
    pub fn is_data_corruption(&self) -> bool {
        match self {
            Self::DimensionMismatch { .. } => true,
            Self::PairComparison { source, .. } => source.is_data_corruption(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value as JsonValue, from_str};
    use std::io;

    #[test]
    fn test_error_display() {
        let config_error = Error::Config("invalid config".to_owned());
        assert_eq!(config_error.to_string(), "Configuration error: invalid config");

        let mismatch = Error::DimensionMismatch { left: 4, right: 5 };
        assert_eq!(
            mismatch.to_string(),
            "vectors must have the same length: 4 vs 5"
        );

        let unpersisted = Error::UnpersistedChunk(7);
        assert!(unpersisted.to_string().contains("chunk 7 has no id"));
    }

    #[test]
    fn test_pair_comparison_names_both_chunks() {
        let error = Error::PairComparison {
            first: 2,
            second: 9,
            source: Box::new(Error::DimensionMismatch { left: 3, right: 2 }),
        };
        let message = error.to_string();
        assert!(message.contains("chunks 2 and 9"));
        assert!(message.contains("3 vs 2"));
        assert!(error.is_data_corruption());
    }

    #[test]
    fn test_io_errors_are_not_corruption() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));
        assert!(!error.is_data_corruption());
    }

    #[test]
    fn test_error_from_json() {
        let json_error = from_str::<JsonValue>("invalid json").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }
}
