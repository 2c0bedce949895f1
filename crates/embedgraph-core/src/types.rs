use serde::{Deserialize, Serialize};

/// One paragraph of source text moving through the pipeline.
///
/// Chunks are created without an id, get their embedding and summary filled
/// in by position, and receive an id once the store persists them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Row id assigned by the store; `None` until persisted
    pub id: Option<i64>,
    /// Paragraph text, never empty
    pub text: String,
    /// Zero-based position in the source document
    pub chunk_index: usize,
    /// Dense embedding vector, empty until generated
    #[serde(default)]
    pub embedding: Vec<f64>,
    /// Short topic summary, empty until generated
    #[serde(default)]
    pub summary: String,
}

impl TextChunk {
    /// Create a fresh, unprocessed chunk.
    pub fn new<T: Into<String>>(text: T, chunk_index: usize) -> Self {
        Self {
            id: None,
            text: text.into(),
            chunk_index,
            embedding: Vec::new(),
            summary: String::new(),
        }
    }

    /// Attach an embedding vector.
    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f64>) -> Self {
        self.embedding = embedding;
        self
    }

    /// Attach a summary.
    #[must_use]
    pub fn with_summary<T: Into<String>>(mut self, summary: T) -> Self {
        self.summary = summary.into();
        self
    }

    /// Whether the embedding stage has populated this chunk.
    pub fn is_embedded(&self) -> bool {
        !self.embedding.is_empty()
    }
}

/// Pairwise measurement between two persisted chunks.
///
/// `chunk_id_1` always belongs to the lower-positioned chunk of the pair, so
/// each unordered pair has exactly one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkSimilarity {
    /// Row id assigned by the store; `None` until persisted
    pub id: Option<i64>,
    /// Id of the lower-positioned chunk
    pub chunk_id_1: i64,
    /// Id of the higher-positioned chunk
    pub chunk_id_2: i64,
    /// Euclidean distance between the two embeddings
    pub distance: f64,
    /// Cosine similarity between the two embeddings
    pub similarity: f64,
}
