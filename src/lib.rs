//! FHE Sentiment - privacy-preserving sentiment inference
//!
//! This crate provides:
//! - Batched text embedding over an ONNX sequence encoder
//! - Min/max quantization of embedding matrices
//! - A simulated five-stage FHE pipeline for pedagogical traces
//! - An orchestrator that classifies text and keeps running statistics
//!
//! The simulated pipeline adds and removes random noise; it is **not**
//! encryption and gives no confidentiality.

pub mod classifier;
pub mod core;
pub mod embeddings;
pub mod inference;
pub mod logging;
pub mod privacy;

#[cfg(test)]
mod test_support;

// Re-export commonly used items
pub use crate::core::config::AppConfig;
pub use crate::core::error::{Result, SentimentError};
pub use classifier::{ClassProbabilities, SentimentClassifier};
pub use embeddings::{Embedder, EmbeddingConfig, EmbeddingMatrix};
pub use inference::{
    AnalysisReport, InferenceOrchestrator, PredictionResult, RunningStatistics, SentimentLabel,
};
pub use logging::{LoggingConfig, LoggingSystem, MetricsCollector};
pub use privacy::{PrivacyConfig, PrivacySimulator, Quantizer};
