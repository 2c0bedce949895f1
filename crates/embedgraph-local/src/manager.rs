use core::result::Result as CoreResult;
use std::collections::HashSet;

use reqwest::{Client, Error as ReqwestError, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::models::{OllamaListResponse, OllamaModel, OllamaPullRequest};
use crate::{LocalError, Result};

/// Suffix Ollama appends to untagged model names.
const LATEST_TAG: &str = ":latest";

/// Checks that the model service is up and has the models a run needs.
#[derive(Debug, Clone)]
pub struct OllamaManager {
    /// HTTP client used to interact with the Ollama service.
    client: Client,
    /// Base URL pointing to the Ollama runtime.
    base_url: String,
}

impl OllamaManager {
    /// Create a manager talking to `base_url` through `client`.
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Base URL of the service.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Verify the service answers its model listing endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::OllamaUnavailable`] with remediation steps if the
    /// service cannot be reached or does not answer with 200
    pub async fn check_connection(&self) -> Result<()> {
        let response = self
            .client
            .get(self.endpoint("/api/tags"))
            .send()
            .await
            .map_err(|err| self.unavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(self.unavailable(format!(
                "server responded with status {}",
                response.status().as_u16()
            )));
        }

        Ok(())
    }

    /// List installed models
    ///
    /// # Errors
    ///
    /// Returns an error if Ollama is not available or if the response cannot be parsed
    pub async fn list_models(&self) -> Result<Vec<OllamaModel>> {
        let list: OllamaListResponse = self.get_json("/api/tags").await?;
        Ok(list.models)
    }

    /// Names from `required` that are not installed.
    ///
    /// A model installed as `name:latest` also satisfies a bare `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the model list cannot be retrieved
    pub async fn missing_models(&self, required: &[String]) -> Result<Vec<String>> {
        let models = self.list_models().await?;
        Ok(missing_from(&models, required))
    }

    /// Pull a model from Ollama registry
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be pulled
    pub async fn pull_model(&self, model_name: &str) -> Result<()> {
        tracing::info!("Pulling model '{model_name}' (this may take a few minutes)...");

        let request = OllamaPullRequest {
            name: model_name.to_owned(),
            stream: false,
        };
        let response = self
            .client
            .post(self.endpoint("/api/pull"))
            .json(&request)
            .send()
            .await
            .map_err(|err| LocalError::ModelPullFailed(format!("{model_name}: {err}")))?;

        if response.status().is_success() {
            tracing::info!("Pulled model '{model_name}'");
            Ok(())
        } else {
            Err(LocalError::ModelPullFailed(format!(
                "Failed to pull model {}: {}",
                model_name,
                response.status()
            )))
        }
    }

    /// Ensure every required model is installed, optionally pulling the
    /// missing ones.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::ModelsMissing`] listing every absent model when
    /// pulling is disabled, or the first pull failure otherwise
    pub async fn ensure_models(&self, required: &[String], pull_missing: bool) -> Result<()> {
        let missing = self.missing_models(required).await?;
        if missing.is_empty() {
            return Ok(());
        }

        if !pull_missing {
            return Err(LocalError::ModelsMissing(missing));
        }

        for model in &missing {
            self.pull_model(model).await?;
        }
        Ok(())
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub(crate) async fn get_json<Resp: DeserializeOwned>(&self, path: &str) -> Result<Resp> {
        let endpoint = self.endpoint(path);
        let response = self.client.get(&endpoint).send().await;
        Self::decode(endpoint, response).await
    }

    pub(crate) async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let endpoint = self.endpoint(path);
        let response = self.client.post(&endpoint).json(body).send().await;
        Self::decode(endpoint, response).await
    }

    /// Map the three failure modes of a call to distinct errors: transport,
    /// non-success status, and undecodable body.
    async fn decode<Resp: DeserializeOwned>(
        endpoint: String,
        response: CoreResult<Response, ReqwestError>,
    ) -> Result<Resp> {
        let response = match response {
            Ok(response) => response,
            Err(source) => return Err(LocalError::Request { endpoint, source }),
        };

        let status = response.status();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(source) => return Err(LocalError::Request { endpoint, source }),
        };

        if !status.is_success() {
            return Err(LocalError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).trim().to_owned(),
            });
        }

        serde_json::from_slice(&bytes).map_err(|source| LocalError::Decode { endpoint, source })
    }

    fn unavailable(&self, reason: String) -> LocalError {
        LocalError::OllamaUnavailable {
            host: self.base_url.clone(),
            reason,
        }
    }
}

fn missing_from(models: &[OllamaModel], required: &[String]) -> Vec<String> {
    let mut installed: HashSet<&str> = HashSet::new();
    for model in models {
        installed.insert(model.name.as_str());
        if let Some(base_name) = model.name.strip_suffix(LATEST_TAG) {
            installed.insert(base_name);
        }
    }

    required
        .iter()
        .filter(|name| !installed.contains(name.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(name: &str) -> OllamaModel {
        OllamaModel {
            name: name.to_owned(),
        }
    }

    #[test]
    fn manager_trims_trailing_slash() {
        let manager = OllamaManager::new(Client::new(), "http://custom:8080/");
        assert_eq!(manager.base_url(), "http://custom:8080");
        assert_eq!(manager.endpoint("/api/tags"), "http://custom:8080/api/tags");
    }

    #[test]
    fn latest_tag_satisfies_bare_name() {
        let installed = vec![model("nomic-embed-text:latest"), model("qwen3:0.6b")];
        let required = vec!["nomic-embed-text".to_owned(), "qwen3:0.6b".to_owned()];
        assert!(missing_from(&installed, &required).is_empty());
    }

    #[test]
    fn reports_every_missing_model_in_order() {
        let installed = vec![model("llama3.2:1b")];
        let required = vec!["nomic-embed-text".to_owned(), "qwen3:0.6b".to_owned()];
        assert_eq!(missing_from(&installed, &required), required);
    }

    #[test]
    fn other_tags_do_not_satisfy_bare_name() {
        let installed = vec![model("qwen3:4b")];
        let required = vec!["qwen3".to_owned()];
        assert_eq!(missing_from(&installed, &required), required);
    }
}
