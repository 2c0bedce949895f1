//! Vector math and the all-pairs similarity engine.

use embedgraph_core::{ChunkSimilarity, Error, Result, TextChunk};

/// Calculate cosine similarity between two vectors.
///
/// Returns exactly `0.0` when either vector has zero magnitude.
///
/// # Errors
/// Returns [`Error::DimensionMismatch`] if the vectors differ in length
pub fn cosine_similarity(vector_a: &[f64], vector_b: &[f64]) -> Result<f64> {
    ensure_same_length(vector_a, vector_b)?;

    let dot_product: f64 = vector_a
        .iter()
        .zip(vector_b.iter())
        .map(|(left, right)| left * right)
        .sum();
    let magnitude_a = vector_a.iter().map(|value| value * value).sum::<f64>().sqrt();
    let magnitude_b = vector_b.iter().map(|value| value * value).sum::<f64>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (magnitude_a * magnitude_b))
}

/// Calculate Euclidean distance between two vectors.
///
/// # Errors
/// Returns [`Error::DimensionMismatch`] if the vectors differ in length
pub fn euclidean_distance(vector_a: &[f64], vector_b: &[f64]) -> Result<f64> {
    ensure_same_length(vector_a, vector_b)?;

    let sum: f64 = vector_a
        .iter()
        .zip(vector_b.iter())
        .map(|(left, right)| {
            let diff = left - right;
            diff * diff
        })
        .sum();

    Ok(sum.sqrt())
}

fn ensure_same_length(vector_a: &[f64], vector_b: &[f64]) -> Result<()> {
    if vector_a.len() == vector_b.len() {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            left: vector_a.len(),
            right: vector_b.len(),
        })
    }
}

/// Compute one similarity record per unordered pair of chunks.
///
/// Pairs are visited by position with `i < j`, so `chunk_id_1` always belongs
/// to the earlier chunk. Every pair is computed exactly; nothing is sampled or
/// thresholded here.
///
/// # Errors
/// Fails without a partial result if any chunk lacks an id or any pair has
/// embeddings of different length
pub fn calculate_all_similarities(chunks: &[TextChunk]) -> Result<Vec<ChunkSimilarity>> {
    let ids = chunks
        .iter()
        .map(|chunk| chunk.id.ok_or(Error::UnpersistedChunk(chunk.chunk_index)))
        .collect::<Result<Vec<i64>>>()?;

    let pair_count = chunks.len() * chunks.len().saturating_sub(1) / 2;
    let mut similarities = Vec::with_capacity(pair_count);

    for (first_pos, first) in chunks.iter().enumerate() {
        for (offset, second) in chunks[first_pos + 1..].iter().enumerate() {
            let second_pos = first_pos + 1 + offset;
            let pair_error = |source: Error| Error::PairComparison {
                first: first.chunk_index,
                second: second.chunk_index,
                source: Box::new(source),
            };

            let distance =
                euclidean_distance(&first.embedding, &second.embedding).map_err(pair_error)?;
            let similarity =
                cosine_similarity(&first.embedding, &second.embedding).map_err(pair_error)?;

            similarities.push(ChunkSimilarity {
                id: None,
                chunk_id_1: ids[first_pos],
                chunk_id_2: ids[second_pos],
                distance,
                similarity,
            });
        }
    }

    tracing::debug!(
        "Computed {} pairwise similarities over {} chunks",
        similarities.len(),
        chunks.len()
    );

    Ok(similarities)
}
