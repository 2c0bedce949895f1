use core::fmt::{Display, Formatter, Result as FmtResult};
use core::result::Result as CoreResult;

use reqwest::Error as ReqwestError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Result type for model service operations.
pub type Result<T> = CoreResult<T, LocalError>;

/// Errors raised while talking to the model service.
#[derive(Debug, Error)]
pub enum LocalError {
    /// The service could not be reached or answered the ping with a failure.
    #[error(
        "failed to connect to Ollama at {host}: {reason}\n\n\
         Please ensure:\n\
         1. Ollama is installed (visit https://ollama.ai)\n\
         2. Ollama is running (try 'ollama serve')\n\
         3. The correct host is specified (default: http://localhost:11434)"
    )]
    OllamaUnavailable {
        /// Base URL that was probed
        host: String,
        /// What went wrong
        reason: String,
    },

    /// Required models are not installed.
    #[error(
        "missing required models: {}\n\nPlease install them with:\n{}",
        .0.join(", "),
        install_commands(.0)
    )]
    ModelsMissing(Vec<String>),

    /// Asking the service to pull a model failed.
    #[error("Model pull failed: {0}")]
    ModelPullFailed(String),

    /// The request never produced a response (network failure).
    #[error("failed to call Ollama API at {endpoint}: {source}")]
    Request {
        /// Full URL of the call
        endpoint: String,
        /// Transport error
        #[source]
        source: ReqwestError,
    },

    /// The service answered with a non-success status.
    #[error("Ollama API returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        /// Full URL of the call
        endpoint: String,
        /// JSON error
        #[source]
        source: SerdeJsonError,
    },

    /// The response decoded but carried no usable content.
    #[error("invalid response from Ollama: {0}")]
    InvalidResponse(String),

    /// One or more items of a concurrent batch failed.
    #[error(transparent)]
    Batch(#[from] BatchFailure),

    /// A general error not covered by other variants.
    #[error("{0}")]
    Other(String),
}

impl LocalError {
    /// Whether the failure means the service itself is not usable, as opposed
    /// to a single request going wrong.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::OllamaUnavailable { .. } | Self::ModelsMissing(_) | Self::ModelPullFailed(_)
        )
    }
}

fn install_commands(models: &[String]) -> String {
    models
        .iter()
        .map(|model| format!("ollama pull {model}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Which field a batch populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStage {
    /// Embedding vectors
    Embedding,
    /// Short summaries
    Summarization,
}

impl Display for BatchStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Embedding => write!(f, "embedding"),
            Self::Summarization => write!(f, "summarization"),
        }
    }
}

/// A single failed job inside a batch.
#[derive(Debug)]
pub struct ItemFailure {
    /// Original input position of the chunk
    pub index: usize,
    /// Why the job failed
    pub error: LocalError,
}

/// Aggregate error naming every failed item of a batch.
///
/// When a batch fails no chunk of that batch should be trusted, even though
/// some of them were processed successfully in memory.
#[derive(Debug, Error)]
#[error(
    "{stage} errors occurred in {} of {total} chunks: {}",
    .failures.len(),
    describe_failures(.failures)
)]
pub struct BatchFailure {
    /// Stage that failed
    pub stage: BatchStage,
    /// Number of chunks in the batch
    pub total: usize,
    /// Failures, sorted by index
    pub failures: Vec<ItemFailure>,
}

impl BatchFailure {
    /// Input positions of every failed chunk, ascending.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|failure| failure.index).collect()
    }
}

fn describe_failures(failures: &[ItemFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("[chunk {}: {}]", failure.index, failure.error))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_models_lists_pull_commands() {
        let error = LocalError::ModelsMissing(vec![
            "nomic-embed-text".to_owned(),
            "qwen3:0.6b".to_owned(),
        ]);
        let message = error.to_string();
        assert!(message.contains("missing required models: nomic-embed-text, qwen3:0.6b"));
        assert!(message.contains("ollama pull nomic-embed-text\nollama pull qwen3:0.6b"));
        assert!(error.is_connectivity());
    }

    #[test]
    fn test_unavailable_includes_remediation() {
        let error = LocalError::OllamaUnavailable {
            host: "http://localhost:11434".to_owned(),
            reason: "connection refused".to_owned(),
        };
        let message = error.to_string();
        assert!(message.contains("ollama serve"));
        assert!(message.contains("https://ollama.ai"));
    }

    #[test]
    fn test_batch_failure_names_every_index() {
        let failure = BatchFailure {
            stage: BatchStage::Embedding,
            total: 5,
            failures: vec![
                ItemFailure {
                    index: 1,
                    error: LocalError::Other("boom".to_owned()),
                },
                ItemFailure {
                    index: 3,
                    error: LocalError::Status {
                        status: 500,
                        body: "overloaded".to_owned(),
                    },
                },
            ],
        };
        assert_eq!(failure.failed_indices(), vec![1, 3]);

        let message = LocalError::from(failure).to_string();
        assert!(message.starts_with("embedding errors occurred in 2 of 5 chunks"));
        assert!(message.contains("[chunk 1: boom]"));
        assert!(message.contains("[chunk 3: Ollama API returned status 500: overloaded]"));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(BatchStage::Embedding.to_string(), "embedding");
        assert_eq!(BatchStage::Summarization.to_string(), "summarization");
    }
}
