use serde::{Deserialize, Serialize};

/// Ollama API request for an embedding
#[derive(Debug, Serialize, Deserialize)]
pub struct OllamaEmbeddingRequest {
    /// Embedding model name.
    pub model: String,
    /// Text to embed.
    pub prompt: String,
}

/// Ollama API response for an embedding
#[derive(Debug, Serialize, Deserialize)]
pub struct OllamaEmbeddingResponse {
    /// Dense embedding vector.
    pub embedding: Vec<f64>,
}

/// Ollama API request for generation
#[derive(Debug, Serialize, Deserialize)]
pub struct OllamaGenerateRequest {
    /// Model to use for generation.
    pub model: String,
    /// Input prompt for the model.
    pub prompt: String,
    /// Whether to stream the response.
    pub stream: bool,
}

/// Ollama API response for generation
#[derive(Debug, Serialize, Deserialize)]
pub struct OllamaGenerateResponse {
    /// Generated text content.
    pub response: String,
    /// Whether generation is complete.
    #[serde(default)]
    pub done: bool,
}

/// Ollama API response for model list
#[derive(Debug, Serialize, Deserialize)]
pub struct OllamaListResponse {
    /// List of models installed in Ollama.
    #[serde(default)]
    pub models: Vec<OllamaModel>,
}

/// Information about an Ollama model returned from the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaModel {
    /// Model identifier, usually `name:tag`.
    pub name: String,
}

/// Ollama API request for pulling a model
#[derive(Debug, Serialize, Deserialize)]
pub struct OllamaPullRequest {
    /// Model to pull.
    pub name: String,
    /// Whether to stream download progress.
    pub stream: bool,
}
