//! Embedding stage
//!
//! Turns raw text into fixed-width vectors:
//! - Whitespace normalization with a placeholder for blank input
//! - Per-text tokenization truncated to the encoder's maximum length
//! - Consecutive batches, right-padded to the batch-local maximum
//! - Last hidden layer mean-pooled over the token axis

mod config;
mod error;
mod encoder;
mod embedder;
mod text;


pub use config::{EmbeddingConfig, DEFAULT_HIDDEN_SIZE, DEFAULT_MAX_SEQ_LENGTH};
pub use error::{EmbeddingError, EmbeddingResult};
pub use encoder::{OnnxEncoder, SequenceEncoder};
pub use embedder::{Embedder, EmbeddingMatrix};
pub use text::{normalize_batch, normalize_text, pad_batch, truncate_tokens, EMPTY_TEXT_PLACEHOLDER};
