//! Configuration for the simulated FHE pipeline

use serde::{Deserialize, Serialize};

/// Largest supported quantization bit width.
///
/// Values are stored as `i32` and reconstructed through `f32`, so widths
/// beyond 16 bits stop buying precision.
pub const MAX_BITS: u32 = 16;

/// Largest accepted noise bound for either noise source
pub const MAX_NOISE_BOUND: i32 = 1 << 16;

/// Simulator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyConfig {
    /// Quantization precision
    pub n_bits: u32,

    /// Obfuscation and de-obfuscation noise is drawn from `-bound..=bound`
    pub obfuscation_noise: i32,

    /// Noise added by the simulated computation, drawn from `-bound..=bound`
    pub compute_noise: i32,

    /// Fixed seed for the noise source; entropy-seeded when unset
    pub noise_seed: Option<u64>,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            n_bits: 3,
            obfuscation_noise: 2,
            compute_noise: 1,
            noise_seed: None,
        }
    }
}

impl PrivacyConfig {
    /// Set the quantization precision
    pub fn with_n_bits(mut self, n_bits: u32) -> Self {
        self.n_bits = n_bits;
        self
    }

    /// Fix the noise seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.noise_seed = Some(seed);
        self
    }
}
