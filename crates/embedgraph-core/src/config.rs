//! Configuration types for the model service and the processing pipeline.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default address of the local model service.
pub const DEFAULT_HOST: &str = "http://localhost:11434";
/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
/// Default summarization model.
pub const DEFAULT_SUMMARY_MODEL: &str = "qwen3:0.6b";

/// Complete application configuration.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Model service configuration
    pub model: ModelConfig,
    /// Pipeline configuration
    pub pipeline: PipelineConfig,
}

/// Connection and model selection for the model service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of the model service
    pub host: String,
    /// Model used to embed chunks
    pub embedding_model: String,
    /// Model used to summarize chunks
    pub summary_model: String,
    /// Per-request timeout in seconds; `None` waits indefinitely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    /// Pull missing models instead of failing the availability check
    pub pull_missing_models: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_owned(),
            summary_model: DEFAULT_SUMMARY_MODEL.to_owned(),
            request_timeout_secs: None,
            pull_missing_models: false,
        }
    }
}

impl ModelConfig {
    /// Models that must be installed before a run can start.
    pub fn required_models(&self) -> Vec<String> {
        let mut models = vec![self.embedding_model.clone()];
        if self.summary_model != self.embedding_model {
            models.push(self.summary_model.clone());
        }
        models
    }
}

/// Concurrency and output settings for a processing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Workers for the embedding batch (0 = number of CPUs)
    pub embedding_workers: usize,
    /// Workers for the summary batch (0 = number of CPUs)
    pub summary_workers: usize,
    /// Directory the database file is written to
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            embedding_workers: 0,
            summary_workers: 0,
            output_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    /// Get the default config directory path (`~/.embedgraph`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_owned()))?;
        Ok(home.join(".embedgraph"))
    }

    /// Get the default config file path (`~/.embedgraph/config.toml`)
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from the default location, creating it with default
    /// values if it does not exist yet
    ///
    /// # Errors
    /// Returns an error if the config cannot be read or created
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            let config = Self::default();
            config.save_to_file(&config_path)?;
            Ok(config)
        }
    }

    /// Load config from a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|error| Error::Config(format!("Failed to read config: {error}")))?;
        let config: Self = toml::from_str(&contents)?;

        tracing::debug!(
            "Loaded config from {}: host={}, embedding_model={}, summary_model={}",
            path.display(),
            config.model.host,
            config.model.embedding_model,
            config.model.summary_model
        );

        Ok(config)
    }

    /// Save config to a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|error| Error::Config(format!("Failed to serialize config: {error}")))?;

        let header = "# embedgraph configuration file\n\
                      # This file is automatically generated on first run\n\
                      # Edit this file to customize your settings\n\n";

        fs::write(path, format!("{header}{contents}"))?;

        Ok(())
    }

    /// Apply `OLLAMA_HOST`, `EMBEDDING_MODEL` and `SUMMARY_MODEL` from the
    /// process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    #[must_use]
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(host) = non_empty("OLLAMA_HOST") {
            self.model.host = normalize_host(&host);
        }
        if let Some(model) = non_empty("EMBEDDING_MODEL") {
            self.model.embedding_model = model;
        }
        if let Some(model) = non_empty("SUMMARY_MODEL") {
            self.model.summary_model = model;
        }
        self
    }
}

/// Accept bare `host:port` values the way the model service's own CLI does.
pub fn normalize_host(host: &str) -> String {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_owned()
    } else {
        format!("http://{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.model.host, "http://localhost:11434");
        assert_eq!(config.model.embedding_model, "nomic-embed-text");
        assert_eq!(config.model.summary_model, "qwen3:0.6b");
        assert_eq!(config.model.request_timeout_secs, None);
        assert!(!config.model.pull_missing_models);
        assert_eq!(config.pipeline.embedding_workers, 0);
    }

    #[test]
    fn test_required_models_deduplicates() {
        let mut model = ModelConfig::default();
        assert_eq!(model.required_models().len(), 2);

        model.summary_model.clone_from(&model.embedding_model);
        assert_eq!(model.required_models(), vec!["nomic-embed-text".to_owned()]);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.model.host = "http://gpu-box:11434".to_owned();
        config.pipeline.embedding_workers = 8;
        config.save_to_file(&path).expect("save failed");

        let loaded = AppConfig::load_from_file(&path).expect("load failed");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[model]\nsummary_model = \"llama3.2:1b\"\n").expect("write failed");

        let loaded = AppConfig::load_from_file(&path).expect("load failed");
        assert_eq!(loaded.model.summary_model, "llama3.2:1b");
        assert_eq!(loaded.model.host, DEFAULT_HOST);
        assert_eq!(loaded.pipeline, PipelineConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[model\nhost = ").expect("write failed");

        let error = AppConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(error, Error::Toml(_)));
    }

    #[test]
    fn test_overrides_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("OLLAMA_HOST", "127.0.0.1:9999"),
            ("EMBEDDING_MODEL", "mxbai-embed-large"),
            ("SUMMARY_MODEL", "  "),
        ]);
        let config = AppConfig::default()
            .with_overrides_from(|key| vars.get(key).map(|value| (*value).to_owned()));

        assert_eq!(config.model.host, "http://127.0.0.1:9999");
        assert_eq!(config.model.embedding_model, "mxbai-embed-large");
        assert_eq!(config.model.summary_model, DEFAULT_SUMMARY_MODEL);
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("http://localhost:11434/"), "http://localhost:11434");
        assert_eq!(normalize_host("https://models.internal"), "https://models.internal");
        assert_eq!(normalize_host("0.0.0.0:11434"), "http://0.0.0.0:11434");
    }
}
