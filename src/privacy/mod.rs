//! Privacy pipeline
//!
//! Quantization plus a simulated FHE round trip used to narrate what
//! encrypted inference would look like:
//! - Min/max quantization to a fixed bit width and back
//! - Noise-based obfuscation standing in for encryption (not secure)
//! - A stand-in "homomorphic" computation and a fresh-noise "decryption"
//! - A key pair that only gates who may call each stage

mod config;
mod error;
mod keys;
mod quantizer;
mod simulator;

#[cfg(test)]
mod tests;

pub use config::{PrivacyConfig, MAX_BITS, MAX_NOISE_BOUND};
pub use error::{PrivacyError, PrivacyResult};
pub use keys::{KeyPair, PublicKey, SecretKey, KEY_BYTES};
pub use quantizer::{QuantizationContext, Quantizer};
pub use simulator::{
    ComputeOp, ComputedEnvelope, EnvelopeMetadata, ObfuscationEnvelope, ObfuscationMethod,
    PipelineRun, PipelineStage, PrivacySimulator,
};
