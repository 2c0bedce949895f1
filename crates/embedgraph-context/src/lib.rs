//! Paragraph chunking and pairwise similarity for embedded documents.
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::float_cmp,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Test allows"
    )
)]

pub mod chunking;
pub mod similarity;

pub use chunking::{chunk_file, chunk_paragraphs};
pub use similarity::{calculate_all_similarities, cosine_similarity, euclidean_distance};
