//! Error types for the embedding stage

use thiserror::Error;

/// Result type for embedding operations
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Errors that can occur while turning text into vectors
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Model or tokenizer file not found
    #[error("Model not found: {path}")]
    ModelNotFound { path: String },

    /// Model loading failed
    #[error("Model loading failed: {reason}")]
    ModelLoadFailed { reason: String },

    /// Forward pass failed
    #[error("Inference failed: {reason}")]
    InferenceFailed { reason: String },

    /// Tokenization failed
    #[error("Tokenization failed: {reason}")]
    TokenizationFailed { reason: String },

    /// Encoder produced a tensor of unexpected shape
    #[error("Unexpected encoder output shape {actual:?}, expected {expected}")]
    ShapeMismatch { expected: String, actual: Vec<usize> },

    /// Invalid input
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// ONNX runtime error
    #[error("ONNX runtime error: {0}")]
    OnnxError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<ort::OrtError> for EmbeddingError {
    fn from(err: ort::OrtError) -> Self {
        EmbeddingError::OnnxError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for EmbeddingError {
    fn from(err: ndarray::ShapeError) -> Self {
        EmbeddingError::InferenceFailed {
            reason: format!("Tensor shape error: {}", err),
        }
    }
}

impl EmbeddingError {
    /// Whether this error means the encoder itself is unusable.
    ///
    /// These surface as `ModelUnavailable` at the orchestrator boundary;
    /// everything else is a per-call failure.
    pub fn is_model_unavailable(&self) -> bool {
        matches!(
            self,
            EmbeddingError::ModelNotFound { .. }
                | EmbeddingError::ModelLoadFailed { .. }
                | EmbeddingError::OnnxError(_)
        )
    }
}
