//! Application configuration
//!
//! Sources are layered, later ones winning:
//! - Built-in defaults
//! - An optional JSON or TOML file
//! - Environment variables such as `FHE_SENTIMENT__PRIVACY__N_BITS=4`

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::ConfigError;
use crate::embeddings::EmbeddingConfig;
use crate::inference::InferenceConfig;
use crate::logging::LoggingConfig;
use crate::privacy::{PrivacyConfig, MAX_BITS, MAX_NOISE_BOUND};

/// Prefix of environment variable overrides
pub const ENV_PREFIX: &str = "FHE_SENTIMENT";

/// Separator between nested keys in environment variable names
pub const ENV_SEPARATOR: &str = "__";

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub embedding: EmbeddingConfig,
    pub privacy: PrivacyConfig,
    pub inference: InferenceConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load defaults, then `path` if given and present, then environment
    /// overrides, and validate the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// [`load`](Self::load) with a custom environment prefix
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(false));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(env_prefix)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        tracing::debug!(
            path = ?path,
            n_bits = config.privacy.n_bits,
            batch_size = config.embedding.batch_size,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Reject values no component can run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&str, bool, String); 7] = [
            (
                "embedding.batch_size",
                self.embedding.batch_size > 0,
                self.embedding.batch_size.to_string(),
            ),
            (
                "embedding.max_seq_length",
                self.embedding.max_seq_length > 0,
                self.embedding.max_seq_length.to_string(),
            ),
            (
                "embedding.hidden_size",
                self.embedding.hidden_size > 0,
                self.embedding.hidden_size.to_string(),
            ),
            (
                "privacy.n_bits",
                (1..=MAX_BITS).contains(&self.privacy.n_bits),
                self.privacy.n_bits.to_string(),
            ),
            (
                "privacy.obfuscation_noise",
                (0..=MAX_NOISE_BOUND).contains(&self.privacy.obfuscation_noise),
                self.privacy.obfuscation_noise.to_string(),
            ),
            (
                "privacy.compute_noise",
                (0..=MAX_NOISE_BOUND).contains(&self.privacy.compute_noise),
                self.privacy.compute_noise.to_string(),
            ),
            (
                "inference.history_capacity",
                self.inference.history_capacity > 0,
                self.inference.history_capacity.to_string(),
            ),
        ];

        for (field, ok, value) in checks {
            if !ok {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }

    /// Write the configuration as pretty JSON via a temp file and rename
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            reason: e.to_string(),
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, content)?;
        std::fs::rename(&temp_path, path)?;
        Ok(())
    }
}
