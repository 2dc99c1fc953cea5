//! Input normalization and batch assembly
//!
//! Every text that reaches the encoder is whitespace-collapsed and
//! non-empty, so tokenization never yields a zero-length sequence.

use ndarray::Array2;

use super::error::{EmbeddingError, EmbeddingResult};

/// Stand-in for texts that are empty after trimming
pub const EMPTY_TEXT_PLACEHOLDER: &str = " ";

/// Collapse whitespace runs to single spaces and substitute the placeholder
/// for blank input.
pub fn normalize_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        EMPTY_TEXT_PLACEHOLDER.to_string()
    } else {
        collapsed
    }
}

/// Normalize a batch of inputs, coercing each element through `ToString`.
///
/// Order is preserved: output row `i` corresponds to input `i`.
pub fn normalize_batch<T: ToString>(texts: &[T]) -> Vec<String> {
    texts
        .iter()
        .map(|t| normalize_text(&t.to_string()))
        .collect()
}

/// Keep the first `max_len` tokens and drop the tail.
pub fn truncate_tokens(mut ids: Vec<i64>, max_len: usize) -> Vec<i64> {
    ids.truncate(max_len);
    ids
}

/// Right-pad a batch of token sequences to the longest one in the batch.
///
/// Padding is batch-local: two batches may come out with different widths.
pub fn pad_batch(sequences: &[Vec<i64>], pad_id: i64) -> EmbeddingResult<Array2<i64>> {
    let max_len = sequences.iter().map(Vec::len).max().unwrap_or(0);
    if max_len == 0 {
        return Err(EmbeddingError::InvalidInput {
            reason: "cannot pad an empty batch or zero-length sequences".to_string(),
        });
    }

    let mut padded = Array2::from_elem((sequences.len(), max_len), pad_id);
    for (row, ids) in sequences.iter().enumerate() {
        for (col, &id) in ids.iter().enumerate() {
            padded[[row, col]] = id;
        }
    }
    Ok(padded)
}
