//! Error types for the sentiment core
//!
//! Each module owns its error enum; [`SentimentError`] collects them for
//! callers that drive several modules at once.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifier::ClassifierError;
use crate::embeddings::EmbeddingError;
use crate::inference::InferenceError;
use crate::logging::LoggingError;
use crate::privacy::PrivacyError;

/// Result type alias for crate-level operations
pub type Result<T> = std::result::Result<T, SentimentError>;

/// Main error type
#[derive(Error, Debug)]
pub enum SentimentError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Privacy pipeline error: {0}")]
    Privacy(#[from] PrivacyError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config load failed: {reason}")]
    LoadFailed { reason: String },

    #[error("Invalid config value: {field} = {value}")]
    InvalidValue { field: String, value: String },

    #[error("Config save failed: {reason}")]
    SaveFailed { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<::config::ConfigError> for ConfigError {
    fn from(err: ::config::ConfigError) -> Self {
        ConfigError::LoadFailed {
            reason: err.to_string(),
        }
    }
}

/// Trait for error recovery strategies
pub trait ErrorRecovery {
    /// Check if the error is retryable
    fn is_retryable(&self) -> bool;

    /// Suggested retry delay in milliseconds
    fn retry_delay_ms(&self) -> Option<u64>;

    fn recovery_action(&self) -> RecoveryAction;
}

/// Recovery action suggestions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Retry once the dependency is restored
    Retry,
    /// Notify user and wait for input
    NotifyUser,
    /// Abort the operation
    Abort,
}

impl ErrorRecovery for SentimentError {
    fn is_retryable(&self) -> bool {
        match self {
            SentimentError::Inference(e) => e.is_retryable(),
            SentimentError::Embedding(e) => e.is_model_unavailable(),
            SentimentError::Classifier(ClassifierError::Unavailable { .. }) => true,
            SentimentError::Io(_) => true,
            _ => false,
        }
    }

    fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            SentimentError::Inference(e) => e.retry_delay_ms(),
            _ if self.is_retryable() => Some(1000),
            _ => None,
        }
    }

    fn recovery_action(&self) -> RecoveryAction {
        match self {
            SentimentError::Inference(e) => e.recovery_action(),
            SentimentError::Config(_) | SentimentError::Logging(_) => RecoveryAction::NotifyUser,
            _ if self.is_retryable() => RecoveryAction::Retry,
            _ => RecoveryAction::Abort,
        }
    }
}
