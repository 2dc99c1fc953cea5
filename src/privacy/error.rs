//! Error types for the privacy pipeline

use thiserror::Error;

/// Result type for quantization and pipeline operations
pub type PrivacyResult<T> = Result<T, PrivacyError>;

/// Errors raised by the quantizer and the simulated FHE stages
#[derive(Debug, Error)]
pub enum PrivacyError {
    /// Bit width outside the supported range
    #[error("Unsupported bit width {n_bits}, expected 1..={max}")]
    InvalidBitWidth { n_bits: u32, max: u32 },

    /// Nothing to quantize
    #[error("Cannot quantize an empty matrix")]
    EmptyMatrix,

    /// NaN or infinite input
    #[error("Matrix contains non-finite values")]
    NonFiniteInput,

    /// Dequantization context does not belong to this quantizer
    #[error("Quantization context mismatch: {reason}")]
    ContextMismatch { reason: String },

    /// Matrix shape disagrees with the envelope metadata
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// Key handle was not issued by this simulator
    #[error("Key handle does not belong to this pipeline")]
    KeyMismatch,

    /// Unknown computation name
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Noise bound outside `0..=MAX_NOISE_BOUND`
    #[error("Invalid noise bound: {0}")]
    InvalidNoiseBound(i32),
}
