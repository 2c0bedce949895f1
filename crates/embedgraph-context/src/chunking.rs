//! Plain text chunking by paragraphs.

use std::fs;
use std::mem::take;
use std::path::Path;

use embedgraph_core::{Result, TextChunk};

/// Split text into paragraph chunks.
///
/// Lines are trimmed, blank lines close the current paragraph, and the lines
/// of one paragraph are joined with single spaces. Indices run `0..N`.
#[must_use]
pub fn chunk_paragraphs(content: &str) -> Vec<TextChunk> {
    let mut chunks = Vec::new();
    let mut buffer = String::new();

    for line in content.lines() {
        let line = line.trim();

        if line.is_empty() {
            if !buffer.is_empty() {
                let index = chunks.len();
                chunks.push(TextChunk::new(take(&mut buffer), index));
            }
        } else {
            if !buffer.is_empty() {
                buffer.push(' ');
            }
            buffer.push_str(line);
        }
    }

    if !buffer.is_empty() {
        let index = chunks.len();
        chunks.push(TextChunk::new(buffer, index));
    }

    chunks
}

/// Read a file and split it into paragraph chunks.
///
/// # Errors
/// Returns an error if the file cannot be read
pub fn chunk_file(path: &Path) -> Result<Vec<TextChunk>> {
    let content = fs::read_to_string(path)?;
    let chunks = chunk_paragraphs(&content);
    tracing::debug!("Chunked {} into {} paragraphs", path.display(), chunks.len());
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_on_blank_lines() {
        let text = "First paragraph\ncontinues here.\n\nSecond one.\n\n\n\nThird.";
        let chunks = chunk_paragraphs(text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "First paragraph continues here.");
        assert_eq!(chunks[1].text, "Second one.");
        assert_eq!(chunks[2].text, "Third.");
        let indices: Vec<usize> = chunks.iter().map(|chunk| chunk.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_whitespace_only_lines_are_blank() {
        let text = "  alpha  \n   \t \n  beta\r\n";
        let chunks = chunk_paragraphs(text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "alpha");
        assert_eq!(chunks[1].text, "beta");
    }

    #[test]
    fn test_empty_input_has_no_chunks() {
        assert!(chunk_paragraphs("").is_empty());
        assert!(chunk_paragraphs("\n\n   \n").is_empty());
    }

    #[test]
    fn test_chunks_are_unprocessed() {
        let chunks = chunk_paragraphs("one\n\ntwo");
        assert!(chunks.iter().all(|chunk| chunk.id.is_none()));
        assert!(chunks.iter().all(|chunk| !chunk.is_embedded()));
    }
}
