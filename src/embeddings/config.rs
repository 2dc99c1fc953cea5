//! Configuration for the embedding stage

use std::path::PathBuf;
use serde::{Deserialize, Serialize};

/// Hidden width of the default RoBERTa-base encoder.
pub const DEFAULT_HIDDEN_SIZE: usize = 768;

/// Longest token sequence handed to the encoder; longer inputs keep their prefix.
pub const DEFAULT_MAX_SEQ_LENGTH: usize = 512;

/// Main configuration for the embedding stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Directory containing the ONNX model and tokenizer
    pub models_dir: PathBuf,

    /// Model filename (relative to models_dir)
    pub model_file: String,

    /// Tokenizer definition (relative to models_dir)
    pub tokenizer_file: String,

    /// Maximum sequence length after tokenization
    pub max_seq_length: usize,

    /// Encoder hidden width
    pub hidden_size: usize,

    /// Token id used to right-pad sequences inside a batch
    pub pad_token_id: i64,

    /// Number of texts per forward pass
    pub batch_size: usize,

    /// Whether to use GPU acceleration
    pub use_gpu: bool,

    /// ONNX Runtime intra-op threads
    pub intra_threads: i16,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            model_file: "twitter-roberta-base-sentiment-latest.onnx".to_string(),
            tokenizer_file: "tokenizer.json".to_string(),
            max_seq_length: DEFAULT_MAX_SEQ_LENGTH,
            hidden_size: DEFAULT_HIDDEN_SIZE,
            pad_token_id: 0,
            batch_size: 32,
            use_gpu: true,
            intra_threads: 4,
        }
    }
}

impl EmbeddingConfig {
    /// Full path to the ONNX model
    pub fn model_path(&self) -> PathBuf {
        self.models_dir.join(&self.model_file)
    }

    /// Full path to the tokenizer definition
    pub fn tokenizer_path(&self) -> PathBuf {
        self.models_dir.join(&self.tokenizer_file)
    }

    /// Set the models directory
    pub fn with_models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.models_dir = dir.into();
        self
    }

    /// Set the batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the hidden width
    pub fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }
}
