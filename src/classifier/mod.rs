//! Classifier capability
//!
//! The inference core does not own a model. Whatever classifier is plugged
//! in only has to label rows of an embedding matrix, and may optionally
//! report per-class probabilities.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::embeddings::EmbeddingMatrix;

/// Errors raised by a plugged-in classifier
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The classifier could not be loaded or initialized
    #[error("Classifier unavailable: {reason}")]
    Unavailable { reason: String },

    /// `predict` raised
    #[error("Prediction failed: {reason}")]
    PredictFailed { reason: String },

    /// The classifier returned a different number of rows than it was given
    #[error("Classifier returned {actual} rows for {expected} inputs")]
    RowCountMismatch { expected: usize, actual: usize },
}

/// Result type for classifier calls
pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Probability pair for one row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub negative: f64,
    pub positive: f64,
}

impl ClassProbabilities {
    pub fn new(negative: f64, positive: f64) -> Self {
        Self { negative, positive }
    }

    /// Probability of the more likely class
    pub fn max(&self) -> f64 {
        self.negative.max(self.positive)
    }
}

/// Binary sentiment classifier over embedding rows.
///
/// Label `0` is negative and `1` is positive; other values are passed
/// through untouched.
pub trait SentimentClassifier: Send + Sync {
    /// One label per row of `features`
    fn predict(&self, features: &EmbeddingMatrix) -> ClassifierResult<Vec<i64>>;

    /// One probability pair per row, or `None` when the model has no
    /// probability output
    fn predict_proba(
        &self,
        _features: &EmbeddingMatrix,
    ) -> ClassifierResult<Option<Vec<ClassProbabilities>>> {
        Ok(None)
    }
}
