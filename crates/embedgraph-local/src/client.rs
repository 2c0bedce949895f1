use std::time::Duration;

use embedgraph_core::ModelConfig;
use reqwest::Client;

use crate::backend::ModelBackend;
use crate::manager::OllamaManager;
use crate::models::{
    OllamaEmbeddingRequest, OllamaEmbeddingResponse, OllamaGenerateRequest,
    OllamaGenerateResponse,
};
use crate::summary::clean_summary;
use crate::{LocalError, Result};

/// Single-item embedding and summary calls against an Ollama service
#[derive(Debug, Clone)]
pub struct OllamaClient {
    manager: OllamaManager,
    config: ModelConfig,
}

impl OllamaClient {
    /// Build a client for the service and models named in `config`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed
    pub fn new(config: ModelConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(seconds) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let client = builder
            .build()
            .map_err(|err| LocalError::Other(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            manager: OllamaManager::new(client, &config.host),
            config,
        })
    }

    /// Configuration this client was built with.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Availability and model management for the same service.
    pub fn manager(&self) -> &OllamaManager {
        &self.manager
    }

    /// Fail fast unless the service answers and both models are installed.
    ///
    /// # Errors
    /// Returns [`LocalError::OllamaUnavailable`] or [`LocalError::ModelsMissing`]
    pub async fn check_models_available(&self) -> Result<()> {
        self.manager.check_connection().await?;
        self.manager
            .ensure_models(
                &self.config.required_models(),
                self.config.pull_missing_models,
            )
            .await?;
        tracing::info!(
            "Ollama ready at {} (embedding: {}, summary: {})",
            self.manager.base_url(),
            self.config.embedding_model,
            self.config.summary_model
        );
        Ok(())
    }

    /// Embed one piece of text.
    ///
    /// # Errors
    /// Returns a distinct error for transport failure, non-success status,
    /// undecodable body and an empty vector
    pub async fn get_embedding(&self, text: &str) -> Result<Vec<f64>> {
        let request = OllamaEmbeddingRequest {
            model: self.config.embedding_model.clone(),
            prompt: text.to_owned(),
        };
        let response: OllamaEmbeddingResponse =
            self.manager.post_json("/api/embeddings", &request).await?;

        if response.embedding.is_empty() {
            return Err(LocalError::InvalidResponse(format!(
                "model '{}' returned an empty embedding",
                self.config.embedding_model
            )));
        }

        tracing::debug!("Embedded {} chars into {} dimensions", text.len(), response.embedding.len());
        Ok(response.embedding)
    }

    /// Ask the summary model for a short topic label and clean it.
    ///
    /// # Errors
    /// Returns a distinct error for transport failure, non-success status and
    /// undecodable body
    pub async fn get_summary(&self, text: &str) -> Result<String> {
        let request = OllamaGenerateRequest {
            model: self.config.summary_model.clone(),
            prompt: summary_prompt(text),
            stream: false,
        };
        let response: OllamaGenerateResponse =
            self.manager.post_json("/api/generate", &request).await?;

        let summary = clean_summary(&response.response);
        tracing::debug!("Summarized {} chars as '{summary}'", text.len());
        Ok(summary)
    }
}

fn summary_prompt(text: &str) -> String {
    format!(
        "Reply with the key topic of the following text in one to five words. \
         Give only the topic, with no explanation or reasoning.\n\n{text}\n\n/no_think"
    )
}

impl ModelBackend for OllamaClient {
    async fn check_ready(&self) -> Result<()> {
        self.check_models_available().await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f64>> {
        self.get_embedding(text).await
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        self.get_summary(text).await
    }
}
