//! Inference error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifier::ClassifierError;
use crate::core::error::{ErrorRecovery, RecoveryAction};
use crate::embeddings::EmbeddingError;

/// Caller-visible error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Blank text after trimming
    EmptyInput,
    /// Encoder or classifier not loaded
    ModelUnavailable,
    /// The embedding stage failed on a loaded encoder
    EmbeddingFailure,
    /// The classifier raised during `predict` or `predict_proba`
    PredictionFailure,
}

/// Errors surfaced by [`InferenceOrchestrator::analyze`](super::InferenceOrchestrator::analyze)
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Please enter a text to analyze")]
    EmptyInput,

    #[error("Model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    #[error("Embedding failed: {reason}")]
    EmbeddingFailed { reason: String },

    #[error("Prediction failed: {reason}")]
    PredictionFailure { reason: String },
}

impl InferenceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InferenceError::EmptyInput => ErrorKind::EmptyInput,
            InferenceError::ModelUnavailable { .. } => ErrorKind::ModelUnavailable,
            InferenceError::EmbeddingFailed { .. } => ErrorKind::EmbeddingFailure,
            InferenceError::PredictionFailure { .. } => ErrorKind::PredictionFailure,
        }
    }
}

impl From<EmbeddingError> for InferenceError {
    fn from(err: EmbeddingError) -> Self {
        if err.is_model_unavailable() {
            InferenceError::ModelUnavailable {
                reason: err.to_string(),
            }
        } else {
            InferenceError::EmbeddingFailed {
                reason: err.to_string(),
            }
        }
    }
}

impl From<ClassifierError> for InferenceError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::Unavailable { reason } => InferenceError::ModelUnavailable { reason },
            other => InferenceError::PredictionFailure {
                reason: other.to_string(),
            },
        }
    }
}

impl ErrorRecovery for InferenceError {
    fn is_retryable(&self) -> bool {
        matches!(self, InferenceError::ModelUnavailable { .. })
    }

    fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            InferenceError::ModelUnavailable { .. } => Some(5000),
            _ => None,
        }
    }

    fn recovery_action(&self) -> RecoveryAction {
        match self {
            InferenceError::EmptyInput => RecoveryAction::NotifyUser,
            InferenceError::ModelUnavailable { .. } => RecoveryAction::Retry,
            InferenceError::EmbeddingFailed { .. } | InferenceError::PredictionFailure { .. } => {
                RecoveryAction::Abort
            }
        }
    }
}

pub type InferenceResult<T> = Result<T, InferenceError>;
