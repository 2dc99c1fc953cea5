//! Batched text-to-vector embedding
//!
//! Texts are normalized, tokenized one by one, grouped into consecutive
//! batches, right-padded to the longest sequence of their batch, encoded,
//! and mean-pooled over the token axis. Pooling averages every position,
//! padding included.

use std::sync::Arc;

use ndarray::{concatenate, Array2, Array3, Axis};

use super::config::EmbeddingConfig;
use super::encoder::{OnnxEncoder, SequenceEncoder};
use super::error::{EmbeddingError, EmbeddingResult};
use super::text::{normalize_batch, pad_batch, truncate_tokens};

/// Dense `(n_texts, hidden_size)` matrix; row `i` embeds input `i`.
pub type EmbeddingMatrix = Array2<f32>;

/// Text embedder over a loaded sequence encoder
#[derive(Clone)]
pub struct Embedder {
    encoder: Arc<dyn SequenceEncoder>,
    config: EmbeddingConfig,
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("hidden_size", &self.encoder.hidden_size())
            .field("config", &self.config)
            .finish()
    }
}

impl Embedder {
    /// Wrap an already loaded encoder
    pub fn new(encoder: Arc<dyn SequenceEncoder>, config: EmbeddingConfig) -> Self {
        Self { encoder, config }
    }

    /// Load the ONNX encoder named by the configuration
    pub fn load(config: EmbeddingConfig) -> EmbeddingResult<Self> {
        let encoder = OnnxEncoder::load(&config)?;
        Ok(Self::new(Arc::new(encoder), config))
    }

    /// Encoder hidden width, i.e. the number of columns of every result
    pub fn hidden_size(&self) -> usize {
        self.encoder.hidden_size()
    }

    /// Configured default batch size
    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    /// Embed a single text into a `(1, hidden_size)` matrix
    pub fn embed_one(&self, text: &str) -> EmbeddingResult<EmbeddingMatrix> {
        self.embed(&[text], self.config.batch_size)
    }

    /// Embed `texts` with the configured batch size
    pub fn embed_all<T: ToString>(&self, texts: &[T]) -> EmbeddingResult<EmbeddingMatrix> {
        self.embed(texts, self.config.batch_size)
    }

    /// Embed `texts` in consecutive batches of `batch_size`.
    ///
    /// Any failure aborts the whole call; there are no partial results.
    pub fn embed<T: ToString>(
        &self,
        texts: &[T],
        batch_size: usize,
    ) -> EmbeddingResult<EmbeddingMatrix> {
        if batch_size == 0 {
            return Err(EmbeddingError::InvalidInput {
                reason: "batch size must be positive".to_string(),
            });
        }

        let hidden_size = self.encoder.hidden_size();
        if texts.is_empty() {
            return Ok(Array2::zeros((0, hidden_size)));
        }

        let normalized = normalize_batch(texts);
        let tokenized = normalized
            .iter()
            .map(|text| {
                self.encoder
                    .tokenize(text)
                    .map(|ids| truncate_tokens(ids, self.config.max_seq_length))
            })
            .collect::<EmbeddingResult<Vec<_>>>()?;

        let mut pooled = Vec::with_capacity(tokenized.len().div_ceil(batch_size));
        for (index, batch) in tokenized.chunks(batch_size).enumerate() {
            let input_ids = pad_batch(batch, self.config.pad_token_id)?;
            tracing::debug!(
                batch = index,
                rows = input_ids.nrows(),
                padded_len = input_ids.ncols(),
                "Encoding batch"
            );

            let hidden = self.encoder.forward(&input_ids)?;
            pooled.push(Self::mean_pool(&hidden, input_ids.nrows(), hidden_size)?);
        }

        let views: Vec<_> = pooled.iter().map(|m| m.view()).collect();
        let matrix = concatenate(Axis(0), &views)?;

        if matrix.iter().any(|v| !v.is_finite()) {
            tracing::warn!(rows = matrix.nrows(), "Embedding contains non-finite values");
        }

        Ok(matrix)
    }

    /// Average `[batch, seq, hidden]` hidden states over the token axis.
    pub fn mean_pool(
        hidden: &Array3<f32>,
        expected_rows: usize,
        hidden_size: usize,
    ) -> EmbeddingResult<Array2<f32>> {
        let (rows, _, width) = hidden.dim();
        if rows != expected_rows || width != hidden_size {
            return Err(EmbeddingError::ShapeMismatch {
                expected: format!("[{}, _, {}]", expected_rows, hidden_size),
                actual: hidden.shape().to_vec(),
            });
        }

        hidden
            .mean_axis(Axis(1))
            .ok_or_else(|| EmbeddingError::ShapeMismatch {
                expected: "at least one token per sequence".to_string(),
                actual: hidden.shape().to_vec(),
            })
    }
}
