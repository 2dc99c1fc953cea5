//! Deterministic encoder and classifier doubles shared by unit tests

use std::sync::Arc;

use ndarray::{Array2, Array3};
use parking_lot::Mutex;

use crate::classifier::{ClassProbabilities, ClassifierError, ClassifierResult, SentimentClassifier};
use crate::embeddings::{
    Embedder, EmbeddingConfig, EmbeddingError, EmbeddingMatrix, EmbeddingResult, SequenceEncoder,
};

pub const BOS_ID: i64 = 5;
pub const EOS_ID: i64 = 6;

const POSITIVE_WORDS: &[&str] = &["love", "amazing", "great", "good", "excellent", "wonderful"];
const NEGATIVE_WORDS: &[&str] = &["hate", "terrible", "awful", "bad", "broken", "worst"];

/// Encoder with hash-based token ids and a sentiment signal in hidden dim 0
pub struct HashEncoder {
    hidden_size: usize,
    fail_on: Option<String>,
    pub forward_shapes: Mutex<Vec<(usize, usize)>>,
}

impl HashEncoder {
    pub fn new(hidden_size: usize) -> Self {
        Self {
            hidden_size,
            fail_on: None,
            forward_shapes: Mutex::new(Vec::new()),
        }
    }

    /// Tokenization fails for any text containing `marker`
    pub fn failing_on(hidden_size: usize, marker: &str) -> Self {
        Self {
            fail_on: Some(marker.to_string()),
            ..Self::new(hidden_size)
        }
    }

    fn word_id(word: &str) -> i64 {
        if let Some(i) = POSITIVE_WORDS.iter().position(|w| *w == word) {
            return 10 + i as i64;
        }
        if let Some(i) = NEGATIVE_WORDS.iter().position(|w| *w == word) {
            return 50 + i as i64;
        }
        let hash: u64 = word
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        (hash % 30000) as i64 + 1000
    }

    fn hidden_value(id: i64, dim: usize) -> f32 {
        if dim == 0 {
            return match id {
                10..=49 => 1.0,
                50..=89 => -1.0,
                _ => 0.0,
            };
        }
        let mixed = (id.unsigned_abs() * 31 + dim as u64 * 17) % 997;
        mixed as f32 / 997.0 - 0.5
    }
}

impl SequenceEncoder for HashEncoder {
    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn tokenize(&self, text: &str) -> EmbeddingResult<Vec<i64>> {
        if let Some(marker) = &self.fail_on {
            if text.contains(marker.as_str()) {
                return Err(EmbeddingError::TokenizationFailed {
                    reason: format!("refusing to tokenize {:?}", text),
                });
            }
        }

        let mut ids = vec![BOS_ID];
        for word in text.split_whitespace() {
            let cleaned: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect();
            if !cleaned.is_empty() {
                ids.push(Self::word_id(&cleaned));
            }
        }
        ids.push(EOS_ID);
        Ok(ids)
    }

    fn forward(&self, input_ids: &Array2<i64>) -> EmbeddingResult<Array3<f32>> {
        let (rows, cols) = input_ids.dim();
        self.forward_shapes.lock().push((rows, cols));
        Ok(Array3::from_shape_fn((rows, cols, self.hidden_size), |(b, s, h)| {
            Self::hidden_value(input_ids[[b, s]], h)
        }))
    }
}

pub fn hash_embedder(hidden_size: usize) -> (Embedder, Arc<HashEncoder>) {
    let encoder = Arc::new(HashEncoder::new(hidden_size));
    let config = EmbeddingConfig::default().with_hidden_size(hidden_size);
    (Embedder::new(encoder.clone(), config), encoder)
}

/// Logistic probe on hidden dim 0
pub struct ProbeClassifier {
    pub weight: f64,
    pub with_proba: bool,
}

impl ProbeClassifier {
    pub fn new() -> Self {
        Self { weight: 20.0, with_proba: true }
    }

    pub fn without_proba() -> Self {
        Self { weight: 20.0, with_proba: false }
    }

    fn positive_probability(&self, value: f32) -> f64 {
        1.0 / (1.0 + (-self.weight * value as f64).exp())
    }
}

impl SentimentClassifier for ProbeClassifier {
    fn predict(&self, features: &EmbeddingMatrix) -> ClassifierResult<Vec<i64>> {
        Ok(features
            .rows()
            .into_iter()
            .map(|row| i64::from(self.positive_probability(row[0]) >= 0.5))
            .collect())
    }

    fn predict_proba(&self, features: &EmbeddingMatrix) -> ClassifierResult<Option<Vec<ClassProbabilities>>> {
        if !self.with_proba {
            return Ok(None);
        }
        Ok(Some(
            features
                .rows()
                .into_iter()
                .map(|row| {
                    let positive = self.positive_probability(row[0]);
                    ClassProbabilities::new(1.0 - positive, positive)
                })
                .collect(),
        ))
    }
}

/// Always returns the same raw label
pub struct FixedLabelClassifier(pub i64);

impl SentimentClassifier for FixedLabelClassifier {
    fn predict(&self, features: &EmbeddingMatrix) -> ClassifierResult<Vec<i64>> {
        Ok(vec![self.0; features.nrows()])
    }
}

/// Fails in `predict` or `predict_proba`
pub struct FailingClassifier {
    pub fail_proba_only: bool,
}

impl SentimentClassifier for FailingClassifier {
    fn predict(&self, features: &EmbeddingMatrix) -> ClassifierResult<Vec<i64>> {
        if self.fail_proba_only {
            return Ok(vec![1; features.nrows()]);
        }
        Err(ClassifierError::PredictFailed {
            reason: "booster exploded".to_string(),
        })
    }

    fn predict_proba(&self, _features: &EmbeddingMatrix) -> ClassifierResult<Option<Vec<ClassProbabilities>>> {
        Err(ClassifierError::PredictFailed {
            reason: "probability head missing".to_string(),
        })
    }
}
