//! Min/max affine quantization
//!
//! Floats are normalized into `[0, 1]` over the matrix's own range and
//! scaled to `0..=2^n_bits - 1`, truncating toward zero. The range is
//! returned in a [`QuantizationContext`] that the matching dequantize call
//! needs unchanged.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::config::MAX_BITS;
use super::error::{PrivacyError, PrivacyResult};

/// Per-call record of the range used to quantize one matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantizationContext {
    pub n_bits: u32,
    pub scale: f64,
    pub data_min: f64,
    pub data_max: f64,
}

impl QuantizationContext {
    /// A constant matrix skips normalization
    pub fn is_degenerate(&self) -> bool {
        self.data_max == self.data_min
    }

    /// Worst-case absolute reconstruction error per element
    pub fn step(&self) -> f64 {
        (self.data_max - self.data_min) / self.scale
    }
}

/// Fixed-width quantizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantizer {
    n_bits: u32,
}

impl Quantizer {
    pub fn new(n_bits: u32) -> PrivacyResult<Self> {
        if n_bits == 0 || n_bits > MAX_BITS {
            return Err(PrivacyError::InvalidBitWidth {
                n_bits,
                max: MAX_BITS,
            });
        }
        Ok(Self { n_bits })
    }

    pub fn n_bits(&self) -> u32 {
        self.n_bits
    }

    /// `2^n_bits - 1`
    pub fn scale(&self) -> f64 {
        ((1u64 << self.n_bits) - 1) as f64
    }

    /// Map `matrix` onto `0..=scale` integers.
    pub fn quantize(
        &self,
        matrix: &Array2<f32>,
    ) -> PrivacyResult<(Array2<i32>, QuantizationContext)> {
        if matrix.is_empty() {
            return Err(PrivacyError::EmptyMatrix);
        }
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(PrivacyError::NonFiniteInput);
        }

        let (data_min, data_max) = matrix.iter().fold((f64::MAX, f64::MIN), |(lo, hi), &v| {
            (lo.min(v as f64), hi.max(v as f64))
        });
        let context = QuantizationContext {
            n_bits: self.n_bits,
            scale: self.scale(),
            data_min,
            data_max,
        };

        let range = data_max - data_min;
        let scale = context.scale;
        let quantized = matrix.mapv(|v| {
            let normalized = if range > 0.0 {
                (v as f64 - data_min) / range
            } else {
                v as f64
            };
            // `as` truncates toward zero and saturates at the `i32` limits
            (normalized * scale) as i32
        });

        Ok((quantized, context))
    }

    /// Inverse affine map using the range captured at quantize time.
    pub fn dequantize(
        &self,
        quantized: &Array2<i32>,
        context: &QuantizationContext,
    ) -> PrivacyResult<Array2<f32>> {
        if context.n_bits != self.n_bits {
            return Err(PrivacyError::ContextMismatch {
                reason: format!(
                    "context was produced with {} bits, quantizer uses {}",
                    context.n_bits, self.n_bits
                ),
            });
        }
        if !(context.data_min.is_finite() && context.data_max.is_finite())
            || context.data_max < context.data_min
        {
            return Err(PrivacyError::ContextMismatch {
                reason: format!(
                    "invalid range [{}, {}]",
                    context.data_min, context.data_max
                ),
            });
        }

        let range = context.data_max - context.data_min;
        let scale = self.scale();
        Ok(quantized.mapv(|q| {
            let normalized = q as f64 / scale;
            (normalized * range + context.data_min) as f32
        }))
    }
}
