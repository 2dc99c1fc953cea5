//! Simulated FHE pipeline
//!
//! **This is not encryption.** The "encrypt" stage adds small uniform
//! integer noise and the "decrypt" stage subtracts freshly drawn noise of the
//! same range. The two draws are independent, so de-obfuscation does not
//! invert obfuscation and no confidentiality is provided. The pipeline only
//! exhibits the shape of an FHE round trip for display.
//!
//! Stages always run in this order, once per request:
//! `Quantized -> Obfuscated -> Computed -> Deobfuscated -> Dequantized`.

use std::str::FromStr;

use ndarray::{Array2, Axis, Zip};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::config::{PrivacyConfig, MAX_NOISE_BOUND};
use super::error::{PrivacyError, PrivacyResult};
use super::keys::{KeyPair, PublicKey, SecretKey};
use super::quantizer::{QuantizationContext, Quantizer};

/// Named pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    Quantized,
    Obfuscated,
    Computed,
    Deobfuscated,
    Dequantized,
}

impl PipelineStage {
    pub const ORDER: [PipelineStage; 5] = [
        PipelineStage::Quantized,
        PipelineStage::Obfuscated,
        PipelineStage::Computed,
        PipelineStage::Deobfuscated,
        PipelineStage::Dequantized,
    ];
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Quantized => "quantized",
            PipelineStage::Obfuscated => "obfuscated",
            PipelineStage::Computed => "computed",
            PipelineStage::Deobfuscated => "deobfuscated",
            PipelineStage::Dequantized => "dequantized",
        };
        f.write_str(name)
    }
}

/// How the envelope was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObfuscationMethod {
    Simulated,
}

/// Metadata travelling with an obfuscated matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeMetadata {
    pub original_shape: (usize, usize),
    pub method: ObfuscationMethod,
}

/// Output of the obfuscate stage
#[derive(Debug, Clone, PartialEq)]
pub struct ObfuscationEnvelope {
    pub encrypted: Array2<i32>,
    pub metadata: EnvelopeMetadata,
}

/// Operations the simulated compute stage understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeOp {
    /// Sum each row over its features
    Predict,
}

impl FromStr for ComputeOp {
    type Err = PrivacyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "predict" => Ok(ComputeOp::Predict),
            other => Err(PrivacyError::UnsupportedOperation(other.to_string())),
        }
    }
}

/// Output of the compute stage: one value per input row
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedEnvelope {
    pub result: Array2<i32>,
    pub operation: ComputeOp,
    pub metadata: EnvelopeMetadata,
}

/// Every intermediate of one pipeline pass
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub context: QuantizationContext,
    pub quantized: Array2<i32>,
    pub envelope: ObfuscationEnvelope,
    pub computed: ComputedEnvelope,
    pub deobfuscated: Array2<i32>,
    pub dequantized: Array2<f32>,
    pub stages: Vec<PipelineStage>,
}

/// Five-stage simulator owning the quantizer and a key pair
#[derive(Debug)]
pub struct PrivacySimulator {
    quantizer: Quantizer,
    keys: KeyPair,
    obfuscation_noise: i32,
    compute_noise: i32,
}

impl PrivacySimulator {
    pub fn new(config: &PrivacyConfig) -> PrivacyResult<Self> {
        for bound in [config.obfuscation_noise, config.compute_noise] {
            if !(0..=MAX_NOISE_BOUND).contains(&bound) {
                return Err(PrivacyError::InvalidNoiseBound(bound));
            }
        }

        let keys = KeyPair::generate();
        tracing::debug!(
            n_bits = config.n_bits,
            public_key = %keys.public_key.fingerprint(),
            "Privacy simulator initialized"
        );

        Ok(Self {
            quantizer: Quantizer::new(config.n_bits)?,
            keys,
            obfuscation_noise: config.obfuscation_noise,
            compute_noise: config.compute_noise,
        })
    }

    pub fn quantizer(&self) -> &Quantizer {
        &self.quantizer
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.keys.public_key
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.keys.secret_key
    }

    /// Stage 1
    pub fn quantize(
        &self,
        matrix: &Array2<f32>,
    ) -> PrivacyResult<(Array2<i32>, QuantizationContext)> {
        self.quantizer.quantize(matrix)
    }

    /// Stage 2: add independent noise in `-bound..=bound` to every element.
    ///
    /// Pipeline arithmetic saturates at the `i32` limits.
    pub fn obfuscate<R: Rng>(
        &self,
        quantized: &Array2<i32>,
        key: &PublicKey,
        rng: &mut R,
    ) -> PrivacyResult<ObfuscationEnvelope> {
        if key != &self.keys.public_key {
            return Err(PrivacyError::KeyMismatch);
        }

        let noise = noise_matrix(quantized.dim(), self.obfuscation_noise, rng);
        Ok(ObfuscationEnvelope {
            encrypted: saturating_add(quantized, &noise),
            metadata: EnvelopeMetadata {
                original_shape: quantized.dim(),
                method: ObfuscationMethod::Simulated,
            },
        })
    }

    /// Stage 3: run `op` on the obfuscated matrix, then add compute noise.
    pub fn compute<R: Rng>(
        &self,
        envelope: &ObfuscationEnvelope,
        op: ComputeOp,
        rng: &mut R,
    ) -> ComputedEnvelope {
        let result = match op {
            ComputeOp::Predict => envelope
                .encrypted
                .map_axis(Axis(1), |row| {
                    row.iter().fold(0i32, |acc, &v| acc.saturating_add(v))
                })
                .insert_axis(Axis(1)),
        };
        let noise = noise_matrix(result.dim(), self.compute_noise, rng);

        ComputedEnvelope {
            result: saturating_add(&result, &noise),
            operation: op,
            metadata: envelope.metadata.clone(),
        }
    }

    /// Stage 4: subtract a fresh noise draw.
    ///
    /// The subtracted noise is independent of the noise added in stage 2,
    /// so the output is not the pre-obfuscation value.
    pub fn deobfuscate<R: Rng>(
        &self,
        computed: &ComputedEnvelope,
        key: &SecretKey,
        rng: &mut R,
    ) -> PrivacyResult<Array2<i32>> {
        if !key.matches(&self.keys.secret_key) {
            return Err(PrivacyError::KeyMismatch);
        }

        let expected = (computed.metadata.original_shape.0, 1);
        if computed.result.dim() != expected {
            return Err(PrivacyError::ShapeMismatch {
                expected,
                actual: computed.result.dim(),
            });
        }

        let noise = noise_matrix(computed.result.dim(), self.obfuscation_noise, rng);
        Ok(Zip::from(&computed.result)
            .and(&noise)
            .map_collect(|&v, &n| v.saturating_sub(n)))
    }

    /// Stage 5
    pub fn dequantize(
        &self,
        quantized: &Array2<i32>,
        context: &QuantizationContext,
    ) -> PrivacyResult<Array2<f32>> {
        self.quantizer.dequantize(quantized, context)
    }

    /// Run all five stages on `matrix` with the simulator's own keys.
    pub fn run<R: Rng>(&self, matrix: &Array2<f32>, rng: &mut R) -> PrivacyResult<PipelineRun> {
        let mut stages = Vec::with_capacity(PipelineStage::ORDER.len());

        let (quantized, context) = self.quantize(matrix)?;
        stages.push(PipelineStage::Quantized);

        let envelope = self.obfuscate(&quantized, self.public_key(), rng)?;
        stages.push(PipelineStage::Obfuscated);

        let computed = self.compute(&envelope, ComputeOp::Predict, rng);
        stages.push(PipelineStage::Computed);

        let deobfuscated = self.deobfuscate(&computed, self.secret_key(), rng)?;
        stages.push(PipelineStage::Deobfuscated);

        let dequantized = self.dequantize(&deobfuscated, &context)?;
        stages.push(PipelineStage::Dequantized);

        tracing::debug!(
            rows = matrix.nrows(),
            data_min = context.data_min,
            data_max = context.data_max,
            "Simulated pipeline completed"
        );

        Ok(PipelineRun {
            context,
            quantized,
            envelope,
            computed,
            deobfuscated,
            dequantized,
            stages,
        })
    }
}

fn noise_matrix<R: Rng>(shape: (usize, usize), bound: i32, rng: &mut R) -> Array2<i32> {
    Array2::from_shape_simple_fn(shape, || rng.gen_range(-bound..=bound))
}

fn saturating_add(values: &Array2<i32>, noise: &Array2<i32>) -> Array2<i32> {
    Zip::from(values)
        .and(noise)
        .map_collect(|&v, &n| v.saturating_add(n))
}
