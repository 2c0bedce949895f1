use core::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use embedgraph_context::{calculate_all_similarities, chunk_file};
use embedgraph_core::{Error as CoreError, PipelineConfig};
use embedgraph_local::{BatchProcessor, LocalError, ModelBackend, ProgressCallback};
use embedgraph_store::{Store, StoreError};
use thiserror::Error;
use tracing::Instrument as _;
use uuid::Uuid;

/// Called with `(stage, completed, total)` as batch items finish.
pub type StageProgress = Arc<dyn Fn(PipelineStage, usize, usize) + Send + Sync>;

/// Steps of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Splitting the input into paragraphs
    Chunking,
    /// Checking the model service
    ModelCheck,
    /// Generating embeddings
    Embedding,
    /// Generating summaries
    Summarization,
    /// Writing chunks
    StoringChunks,
    /// Computing pairwise similarities
    Similarity,
    /// Writing similarities
    StoringSimilarities,
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Self::Chunking => "chunking",
            Self::ModelCheck => "model check",
            Self::Embedding => "embedding",
            Self::Summarization => "summarization",
            Self::StoringChunks => "storing chunks",
            Self::Similarity => "similarity",
            Self::StoringSimilarities => "storing similarities",
        };
        f.write_str(name)
    }
}

/// A run failed; the variant names the stage.
///
/// Work committed by earlier stages stays in the database.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input could not be read
    #[error("failed to chunk {}", path.display())]
    Chunking {
        /// Input file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: CoreError,
    },

    /// The model service is unreachable or lacks a model
    #[error("model service is not ready")]
    ModelCheck(#[source] LocalError),

    /// At least one embedding failed
    #[error("embedding stage failed")]
    Embedding(#[source] LocalError),

    /// At least one summary failed
    #[error("summarization stage failed")]
    Summarization(#[source] LocalError),

    /// The database could not be created or chunks could not be written
    #[error("failed to store chunks")]
    StoringChunks(#[source] StoreError),

    /// Embeddings could not be compared
    #[error("similarity computation failed")]
    Similarity(#[source] CoreError),

    /// The similarity batch was rejected; none of it was stored
    #[error("failed to store similarities")]
    StoringSimilarities(#[source] StoreError),
}

impl PipelineError {
    /// Stage the run stopped in.
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Chunking { .. } => PipelineStage::Chunking,
            Self::ModelCheck(_) => PipelineStage::ModelCheck,
            Self::Embedding(_) => PipelineStage::Embedding,
            Self::Summarization(_) => PipelineStage::Summarization,
            Self::StoringChunks(_) => PipelineStage::StoringChunks,
            Self::Similarity(_) => PipelineStage::Similarity,
            Self::StoringSimilarities(_) => PipelineStage::StoringSimilarities,
        }
    }

    /// What the operator can do about the failure, when that is known.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ModelCheck(source) if source.is_connectivity() => {
                Some("start the model service and install the listed models, then run again")
            }
            Self::Similarity(source) if source.is_data_corruption() => Some(
                "embeddings of this run differ in length; process the file again with a single embedding model",
            ),
            _ => None,
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Identifier attached to every log line of the run
    pub run_id: Uuid,
    /// Database the run wrote
    pub database: PathBuf,
    /// Chunks stored
    pub chunk_count: usize,
    /// Similarity records stored
    pub similarity_count: usize,
    /// Wall-clock start
    pub started_at: DateTime<Utc>,
    /// Total duration
    pub elapsed: Duration,
}

/// Runs chunking, both model batches, persistence and similarity in order.
pub struct Pipeline<B> {
    processor: BatchProcessor<B>,
    config: PipelineConfig,
    on_progress: Option<StageProgress>,
}

impl<B: ModelBackend + 'static> Pipeline<B> {
    /// Create a pipeline over `backend`.
    pub fn new(backend: Arc<B>, config: PipelineConfig) -> Self {
        Self {
            processor: BatchProcessor::new(backend),
            config,
            on_progress: None,
        }
    }

    /// Report batch progress to `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: StageProgress) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// Process `input_file` into a fresh database under the configured
    /// output directory.
    ///
    /// # Errors
    /// Returns the first failing stage; earlier committed work is not undone
    pub async fn run(&self, input_file: &Path) -> Result<RunReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", %run_id, input = %input_file.display());
        self.execute(run_id, input_file).instrument(span).await
    }

    async fn execute(&self, run_id: Uuid, input_file: &Path) -> Result<RunReport, PipelineError> {
        let started_at = Utc::now();
        let timer = Instant::now();

        let chunks = chunk_file(input_file).map_err(|source| PipelineError::Chunking {
            path: input_file.to_path_buf(),
            source,
        })?;
        tracing::info!("Split input into {} chunks", chunks.len());

        self.processor
            .backend()
            .check_ready()
            .await
            .map_err(PipelineError::ModelCheck)?;

        let embedding_progress = self.stage_callback(PipelineStage::Embedding);
        let chunks = self
            .processor
            .get_embeddings_concurrent(
                chunks,
                self.config.embedding_workers,
                embedding_progress.as_ref(),
            )
            .await
            .map_err(PipelineError::Embedding)?;

        let summary_progress = self.stage_callback(PipelineStage::Summarization);
        let mut chunks = self
            .processor
            .get_summaries_concurrent(
                chunks,
                self.config.summary_workers,
                summary_progress.as_ref(),
            )
            .await
            .map_err(PipelineError::Summarization)?;

        let store = Store::create(input_file, &self.config.output_dir)
            .await
            .map_err(PipelineError::StoringChunks)?;
        store
            .insert_chunks(&mut chunks)
            .await
            .map_err(PipelineError::StoringChunks)?;
        tracing::info!("Stored {} chunks in {}", chunks.len(), store.path().display());

        let similarities = calculate_all_similarities(&chunks).map_err(PipelineError::Similarity)?;
        store
            .insert_similarities(&similarities)
            .await
            .map_err(PipelineError::StoringSimilarities)?;
        tracing::info!("Stored {} similarities", similarities.len());

        let database = store.path().to_path_buf();
        store.close().await;

        Ok(RunReport {
            run_id,
            database,
            chunk_count: chunks.len(),
            similarity_count: similarities.len(),
            started_at,
            elapsed: timer.elapsed(),
        })
    }

    fn stage_callback(&self, stage: PipelineStage) -> Option<ProgressCallback> {
        self.on_progress.as_ref().map(|callback| {
            let callback = Arc::clone(callback);
            let adapted: ProgressCallback =
                Arc::new(move |completed, total| callback(stage, completed, total));
            adapted
        })
    }
}
