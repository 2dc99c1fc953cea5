//! Sequence encoder capability and its ONNX Runtime implementation
//!
//! The embedder only needs two things from an encoder: a tokenizer that
//! maps text to token ids, and a forward pass that maps a padded id matrix
//! to per-token hidden states.

use std::path::Path;
use std::sync::Arc;

use ndarray::{Array2, Array3, CowArray, Ix3};
use ort::tensor::OrtOwnedTensor;
use ort::{Environment, ExecutionProvider, GraphOptimizationLevel, Session, SessionBuilder, Value};
use tokenizers::Tokenizer;

use super::config::EmbeddingConfig;
use super::error::{EmbeddingError, EmbeddingResult};

/// A pretrained sequence encoder.
///
/// Implementations must be re-entrant for `tokenize` and `forward`: the
/// embedder shares one instance read-only across callers.
pub trait SequenceEncoder: Send + Sync {
    /// Width of the per-token hidden states
    fn hidden_size(&self) -> usize;

    /// Token ids for one text, special tokens included, not truncated
    fn tokenize(&self, text: &str) -> EmbeddingResult<Vec<i64>>;

    /// Last hidden layer for a `[batch, seq]` id matrix, shaped `[batch, seq, hidden]`
    fn forward(&self, input_ids: &Array2<i64>) -> EmbeddingResult<Array3<f32>>;
}

/// Encoder backed by a HuggingFace tokenizer and an ONNX Runtime session
pub struct OnnxEncoder {
    tokenizer: Tokenizer,
    session: Session,
    hidden_size: usize,
    output_index: usize,
    _environment: Arc<Environment>,
}

impl OnnxEncoder {
    /// Load the tokenizer and the ONNX model named by the configuration.
    pub fn load(config: &EmbeddingConfig) -> EmbeddingResult<Self> {
        let tokenizer = Self::load_tokenizer(&config.tokenizer_path())?;

        let model_path = config.model_path();
        if !model_path.exists() {
            return Err(EmbeddingError::ModelNotFound {
                path: model_path.to_string_lossy().to_string(),
            });
        }

        let mut providers = Vec::new();
        if cfg!(feature = "cuda") && config.use_gpu {
            providers.push(ExecutionProvider::CUDA(Default::default()));
        }
        providers.push(ExecutionProvider::CPU(Default::default()));

        let environment = Environment::builder()
            .with_name("fhe-sentiment")
            .with_execution_providers(providers)
            .build()
            .map_err(|e| EmbeddingError::ModelLoadFailed {
                reason: format!("Failed to create ONNX Runtime environment: {}", e),
            })?
            .into_arc();

        let session = SessionBuilder::new(&environment)?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.intra_threads)?
            .with_model_from_file(&model_path)
            .map_err(|e| EmbeddingError::ModelLoadFailed {
                reason: format!("Failed to load {}: {}", model_path.display(), e),
            })?;

        let output_index = session
            .outputs
            .iter()
            .position(|o| o.name == "last_hidden_state")
            .unwrap_or(0);

        tracing::info!(
            model = %model_path.display(),
            inputs = session.inputs.len(),
            output_index,
            "Loaded ONNX encoder"
        );

        Ok(Self {
            tokenizer,
            session,
            hidden_size: config.hidden_size,
            output_index,
            _environment: environment,
        })
    }

    /// Padding and truncation are disabled: the embedder does both itself.
    fn load_tokenizer(path: &Path) -> EmbeddingResult<Tokenizer> {
        if !path.exists() {
            return Err(EmbeddingError::ModelNotFound {
                path: path.to_string_lossy().to_string(),
            });
        }
        let mut tokenizer = Tokenizer::from_file(path).map_err(|e| {
            EmbeddingError::ModelLoadFailed {
                reason: format!("Failed to load tokenizer from {}: {}", path.display(), e),
            }
        })?;
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(None)
            .map_err(|e| EmbeddingError::ModelLoadFailed {
                reason: format!("Failed to disable tokenizer truncation: {}", e),
            })?;
        Ok(tokenizer)
    }
}

impl SequenceEncoder for OnnxEncoder {
    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn tokenize(&self, text: &str) -> EmbeddingResult<Vec<i64>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbeddingError::TokenizationFailed {
                reason: e.to_string(),
            })?;
        Ok(encoding.get_ids().iter().map(|&id| id as i64).collect())
    }

    fn forward(&self, input_ids: &Array2<i64>) -> EmbeddingResult<Array3<f32>> {
        let shape = input_ids.dim();

        // No masking: every position, padding included, is attended.
        let ids = CowArray::from(input_ids.clone().into_dyn());
        let mask = CowArray::from(Array2::<i64>::ones(shape).into_dyn());
        let type_ids = CowArray::from(Array2::<i64>::zeros(shape).into_dyn());

        let mut values = Vec::with_capacity(self.session.inputs.len());
        for input in &self.session.inputs {
            let array = match input.name.as_str() {
                "input_ids" => &ids,
                "attention_mask" => &mask,
                "token_type_ids" => &type_ids,
                other => {
                    return Err(EmbeddingError::InferenceFailed {
                        reason: format!("Unsupported model input: {}", other),
                    })
                }
            };
            let value = Value::from_array(self.session.allocator(), array).map_err(|e| {
                EmbeddingError::InferenceFailed {
                    reason: format!("Failed to create {} value: {}", input.name, e),
                }
            })?;
            values.push(value);
        }

        let outputs = self
            .session
            .run(values)
            .map_err(|e| EmbeddingError::InferenceFailed {
                reason: format!("Inference failed: {}", e),
            })?;

        let output = outputs
            .get(self.output_index)
            .ok_or_else(|| EmbeddingError::InferenceFailed {
                reason: "No output found".to_string(),
            })?;

        let tensor: OrtOwnedTensor<f32, _> =
            output.try_extract().map_err(|e| EmbeddingError::InferenceFailed {
                reason: format!("Failed to extract hidden states: {}", e),
            })?;
        let view = tensor.view();
        let actual = view.shape().to_vec();

        view.to_owned()
            .into_dimensionality::<Ix3>()
            .map_err(|_| EmbeddingError::ShapeMismatch {
                expected: format!("[{}, {}, {}]", shape.0, shape.1, self.hidden_size),
                actual,
            })
    }
}
