//! Fan a batch of chunks out to a fixed pool of workers and assemble the
//! results back in input order.
//!
//! Jobs are queued up front on a channel sized to the batch and the sender is
//! dropped, so workers pull until the queue drains. Each outcome travels back
//! on a second channel tagged with its input index. The calling task is the
//! single consumer of that channel, which makes it the only writer of the
//! progress counter and of the result slots.

use std::collections::HashSet;
use std::sync::Arc;

use embedgraph_core::TextChunk;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::backend::ModelBackend;
use crate::error::{BatchFailure, BatchStage, ItemFailure};
use crate::{LocalError, Result};

/// Called once per finished item with `(completed, total)`.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Worker count to use for a requested value, where 0 means one per CPU.
pub fn resolve_workers(requested: usize) -> usize {
    if requested == 0 {
        num_cpus::get().max(1)
    } else {
        requested
    }
}

/// A chunk waiting to be processed, tagged with its input position.
struct Job {
    index: usize,
    chunk: TextChunk,
}

/// What a worker reports back for one job.
struct JobOutcome {
    index: usize,
    outcome: Result<TextChunk>,
}

/// Runs embedding and summarization batches against a [`ModelBackend`].
pub struct BatchProcessor<B> {
    backend: Arc<B>,
}

impl<B> Clone for BatchProcessor<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: ModelBackend + 'static> BatchProcessor<B> {
    /// Create a processor sharing `backend` between its workers.
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// The shared backend.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Fill in the embedding of every chunk using up to `max_workers`
    /// concurrent requests.
    ///
    /// Output slot `i` holds the chunk that was at input position `i`.
    /// `on_progress` fires once per item in completion order.
    ///
    /// # Errors
    /// If any item fails, every worker still runs to completion and a
    /// [`LocalError::Batch`] naming each failed index is returned instead of
    /// the chunks
    pub async fn get_embeddings_concurrent(
        &self,
        chunks: Vec<TextChunk>,
        max_workers: usize,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<TextChunk>> {
        self.run(BatchStage::Embedding, chunks, max_workers, on_progress)
            .await
    }

    /// Fill in the summary of every chunk using up to `max_workers`
    /// concurrent requests. Same ordering and failure contract as
    /// [`Self::get_embeddings_concurrent`].
    ///
    /// # Errors
    /// Returns [`LocalError::Batch`] if any item fails
    pub async fn get_summaries_concurrent(
        &self,
        chunks: Vec<TextChunk>,
        max_workers: usize,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<TextChunk>> {
        self.run(BatchStage::Summarization, chunks, max_workers, on_progress)
            .await
    }

    async fn run(
        &self,
        stage: BatchStage,
        chunks: Vec<TextChunk>,
        max_workers: usize,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<TextChunk>> {
        let total = chunks.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let worker_count = resolve_workers(max_workers).min(total);
        tracing::info!("Starting {stage} of {total} chunks with {worker_count} workers");

        let (job_sender, job_receiver) = mpsc::channel::<Job>(total);
        for (index, chunk) in chunks.into_iter().enumerate() {
            job_sender
                .try_send(Job { index, chunk })
                .map_err(|err| LocalError::Other(format!("Failed to queue {stage} job: {err}")))?;
        }
        drop(job_sender);

        let jobs = Arc::new(Mutex::new(job_receiver));
        let (result_sender, mut result_receiver) = mpsc::channel::<JobOutcome>(total);
        let mut workers = self.spawn_workers(stage, worker_count, &jobs, &result_sender);
        // Workers hold the only remaining senders; the loop below ends once all
        // of them have exited.
        drop(result_sender);

        let mut slots: Vec<Option<TextChunk>> = vec![None; total];
        let mut failures = Vec::new();
        let mut completed = 0usize;

        while let Some(report) = result_receiver.recv().await {
            completed += 1;
            match report.outcome {
                Ok(chunk) => {
                    if let Some(slot) = slots.get_mut(report.index) {
                        *slot = Some(chunk);
                    }
                }
                Err(error) => {
                    tracing::warn!("{stage} failed for chunk {}: {error}", report.index);
                    failures.push(ItemFailure {
                        index: report.index,
                        error,
                    });
                }
            }
            if let Some(callback) = on_progress {
                callback(completed, total);
            }
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                tracing::error!("{stage} worker terminated abnormally: {err}");
            }
        }

        report_unfinished(&slots, &mut failures);

        if !failures.is_empty() {
            failures.sort_by_key(|failure| failure.index);
            return Err(BatchFailure {
                stage,
                total,
                failures,
            }
            .into());
        }

        tracing::info!("Finished {stage} of {total} chunks");
        Ok(slots.into_iter().flatten().collect())
    }

    fn spawn_workers(
        &self,
        stage: BatchStage,
        worker_count: usize,
        jobs: &Arc<Mutex<Receiver<Job>>>,
        results: &Sender<JobOutcome>,
    ) -> JoinSet<()> {
        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            let worker_jobs = Arc::clone(jobs);
            let worker_results = results.clone();
            let backend = Arc::clone(&self.backend);

            workers.spawn(async move {
                let mut handled = 0usize;
                loop {
                    let next = worker_jobs.lock().await.recv().await;
                    let Some(Job { index, chunk }) = next else {
                        break;
                    };

                    // A panicking backend call only fails its own chunk
                    let job_backend = Arc::clone(&backend);
                    let outcome = tokio::spawn(async move {
                        apply_stage(stage, job_backend.as_ref(), chunk).await
                    })
                    .await
                    .unwrap_or_else(|join_error| {
                        Err(LocalError::Other(format!(
                            "{stage} task for chunk {index} failed: {join_error}"
                        )))
                    });
                    handled += 1;

                    let report = JobOutcome { index, outcome };
                    if worker_results.send(report).await.is_err() {
                        break;
                    }
                }
                tracing::debug!("{stage} worker {worker_id} handled {handled} chunks");
            });
        }
        workers
    }
}

/// A slot left empty without a reported failure means its worker died.
fn report_unfinished(slots: &[Option<TextChunk>], failures: &mut Vec<ItemFailure>) {
    let reported: HashSet<usize> = failures.iter().map(|failure| failure.index).collect();
    for (index, slot) in slots.iter().enumerate() {
        if slot.is_none() && !reported.contains(&index) {
            failures.push(ItemFailure {
                index,
                error: LocalError::Other("worker stopped before finishing this chunk".to_owned()),
            });
        }
    }
}

async fn apply_stage<B: ModelBackend>(
    stage: BatchStage,
    backend: &B,
    mut chunk: TextChunk,
) -> Result<TextChunk> {
    match stage {
        BatchStage::Embedding => chunk.embedding = backend.embed(&chunk.text).await?,
        BatchStage::Summarization => chunk.summary = backend.summarize(&chunk.text).await?,
    }
    Ok(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds each text as its length and summarizes it as its first word.
    struct EchoBackend {
        calls: AtomicUsize,
    }

    impl ModelBackend for EchoBackend {
        async fn check_ready(&self) -> Result<()> {
            Ok(())
        }

        async fn embed(&self, text: &str) -> Result<Vec<f64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f64, 1.0])
        }

        async fn summarize(&self, text: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(text.split_whitespace().next().unwrap_or_default().to_owned())
        }
    }

    fn processor() -> BatchProcessor<EchoBackend> {
        BatchProcessor::new(Arc::new(EchoBackend {
            calls: AtomicUsize::new(0),
        }))
    }

    fn chunks(count: usize) -> Vec<TextChunk> {
        (0..count)
            .map(|index| TextChunk::new(format!("paragraph {index} {}", "x".repeat(index)), index))
            .collect()
    }

    #[test]
    fn test_resolve_workers() {
        assert_eq!(resolve_workers(3), 3);
        assert!(resolve_workers(0) >= 1);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let processor = processor();
        let result = processor
            .get_embeddings_concurrent(Vec::new(), 4, None)
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(processor.backend().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_embeddings_fill_every_slot() {
        let processor = processor();
        let result = processor
            .get_embeddings_concurrent(chunks(6), 0, None)
            .await
            .unwrap();
        assert_eq!(result.len(), 6);
        for (position, chunk) in result.iter().enumerate() {
            assert_eq!(chunk.chunk_index, position);
            assert_eq!(chunk.embedding, vec![chunk.text.len() as f64, 1.0]);
            assert!(chunk.summary.is_empty());
        }
        assert_eq!(processor.backend().calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_summaries_keep_embeddings() {
        let processor = processor();
        let embedded = processor
            .get_embeddings_concurrent(chunks(3), 2, None)
            .await
            .unwrap();
        let summarized = processor
            .get_summaries_concurrent(embedded.clone(), 2, None)
            .await
            .unwrap();
        for (before, after) in embedded.iter().zip(&summarized) {
            assert_eq!(before.embedding, after.embedding);
            assert_eq!(after.summary, "paragraph");
        }
    }

    #[tokio::test]
    async fn test_progress_counts_up_to_total() {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ProgressCallback = Arc::new(move |completed, total| {
            sink.lock().unwrap().push((completed, total));
        });

        processor()
            .get_embeddings_concurrent(chunks(4), 8, Some(&callback))
            .await
            .unwrap();

        let calls = seen.lock().unwrap().clone();
        assert_eq!(calls, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
    }
}
