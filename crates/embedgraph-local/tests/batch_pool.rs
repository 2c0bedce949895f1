//! Ordering, bounding and failure aggregation of the concurrent batch pool

#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::float_cmp,
        clippy::missing_panics_doc,
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use embedgraph_core::TextChunk;
use embedgraph_local::{
    BatchProcessor, BatchStage, LocalError, ModelBackend, ProgressCallback, Result,
};
use tokio::time::sleep;

/// Backend with uneven per-item latency that fails on texts marked `fail`.
#[derive(Default)]
struct JitterBackend {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl JitterBackend {
    async fn simulate(&self, text: &str) -> Result<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let seed = text.bytes().fold(7u64, |acc, byte| {
            acc.wrapping_mul(31).wrapping_add(u64::from(byte))
        });
        sleep(Duration::from_millis(seed % 7)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if text.starts_with("fail") {
            return Err(LocalError::Status {
                status: 500,
                body: format!("cannot process '{text}'"),
            });
        }
        Ok(text.len())
    }
}

impl ModelBackend for JitterBackend {
    async fn check_ready(&self) -> Result<()> {
        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f64>> {
        let length = self.simulate(text).await?;
        Ok(vec![length as f64, 0.5, -0.5])
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        self.simulate(text).await?;
        Ok(format!("about {text}"))
    }
}

fn numbered_chunks(count: usize) -> Vec<TextChunk> {
    (0..count)
        .map(|index| TextChunk::new(format!("chunk number {index}"), index))
        .collect()
}

fn recording_callback() -> (ProgressCallback, Arc<Mutex<Vec<(usize, usize)>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: ProgressCallback = Arc::new(move |completed, total| {
        sink.lock().unwrap().push((completed, total));
    });
    (callback, seen)
}

#[tokio::test]
async fn test_order_preserved_for_every_size_and_worker_count() {
    for count in [0usize, 1, 5, 100] {
        for workers in [1usize, 4, 32] {
            let processor = BatchProcessor::new(Arc::new(JitterBackend::default()));
            let input = numbered_chunks(count);
            let (callback, seen) = recording_callback();

            let output = processor
                .get_embeddings_concurrent(input.clone(), workers, Some(&callback))
                .await
                .unwrap_or_else(|err| panic!("N={count} W={workers}: {err}"));

            assert_eq!(output.len(), count, "N={count} W={workers}");
            for (position, (before, after)) in input.iter().zip(&output).enumerate() {
                assert_eq!(after.chunk_index, position);
                assert_eq!(after.text, before.text);
                assert_eq!(after.embedding[0], before.text.len() as f64);
            }

            let progress = seen.lock().unwrap().clone();
            let expected: Vec<(usize, usize)> = (1..=count).map(|done| (done, count)).collect();
            assert_eq!(progress, expected, "N={count} W={workers}");
        }
    }
}

#[tokio::test]
async fn test_concurrency_is_bounded_by_worker_count() {
    let backend = Arc::new(JitterBackend::default());
    let processor = BatchProcessor::new(Arc::clone(&backend));

    processor
        .get_summaries_concurrent(numbered_chunks(40), 4, None)
        .await
        .unwrap();

    let peak = backend.max_in_flight.load(Ordering::SeqCst);
    assert!(peak <= 4, "peak concurrency {peak} exceeded 4 workers");
    assert!(peak >= 2, "workers never overlapped");
    assert_eq!(backend.calls.load(Ordering::SeqCst), 40);
}

#[tokio::test]
async fn test_failures_are_aggregated_and_hide_successes() {
    let backend = Arc::new(JitterBackend::default());
    let processor = BatchProcessor::new(Arc::clone(&backend));
    let mut input = numbered_chunks(5);
    input[1].text = "fail one".to_owned();
    input[3].text = "fail three".to_owned();
    let (callback, seen) = recording_callback();

    let error = processor
        .get_embeddings_concurrent(input, 2, Some(&callback))
        .await
        .unwrap_err();

    let LocalError::Batch(failure) = &error else {
        panic!("expected a batch failure, got {error}");
    };
    assert_eq!(failure.stage, BatchStage::Embedding);
    assert_eq!(failure.total, 5);
    assert_eq!(failure.failed_indices(), vec![1, 3]);

    let message = error.to_string();
    assert!(message.contains("2 of 5 chunks"));
    assert!(message.contains("[chunk 1:"));
    assert!(message.contains("[chunk 3:"));

    // Every job ran even though two failed
    assert_eq!(backend.calls.load(Ordering::SeqCst), 5);
    assert_eq!(seen.lock().unwrap().len(), 5);
}

#[tokio::test]
async fn test_summary_failure_names_summarization_stage() {
    let processor = BatchProcessor::new(Arc::new(JitterBackend::default()));
    let mut input = numbered_chunks(3);
    input[2].text = "fail last".to_owned();

    let error = processor
        .get_summaries_concurrent(input, 0, None)
        .await
        .unwrap_err();

    assert!(error.to_string().starts_with("summarization errors occurred in 1 of 3 chunks"));
}

/// Panics on the chunk at index 1 and embeds everything else.
#[derive(Default)]
struct PanickingBackend {
    calls: AtomicUsize,
}

impl ModelBackend for PanickingBackend {
    async fn check_ready(&self) -> Result<()> {
        Ok(())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(text != "chunk number 1", "backend crashed on {text}");
        Ok(vec![1.0])
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        Ok(text.to_owned())
    }
}

#[tokio::test]
async fn test_panicking_item_does_not_stop_its_worker() {
    let backend = Arc::new(PanickingBackend::default());
    let processor = BatchProcessor::new(Arc::clone(&backend));
    let (callback, seen) = recording_callback();

    let error = processor
        .get_embeddings_concurrent(numbered_chunks(4), 1, Some(&callback))
        .await
        .unwrap_err();

    let LocalError::Batch(failure) = &error else {
        panic!("expected a batch failure, got {error}");
    };
    assert_eq!(failure.failed_indices(), vec![1]);
    assert!(error.to_string().contains("panicked"));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 4);
    assert_eq!(seen.lock().unwrap().len(), 4);
}
