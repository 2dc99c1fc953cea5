//! Core module
//!
//! - Layered application configuration
//! - Crate-level error type and recovery hints

pub mod config;
pub mod error;


pub use config::{AppConfig, ENV_PREFIX, ENV_SEPARATOR};
pub use error::{ConfigError, ErrorRecovery, RecoveryAction, Result, SentimentError};
