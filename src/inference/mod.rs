//! Sentiment inference
//!
//! - One `analyze` call per text, clear or privacy mode
//! - Step-by-step trace of the simulated encrypted pipeline
//! - Label mapping with documented probability fallbacks
//! - Lock-guarded running statistics with a bounded history

mod config;
mod error;
mod orchestrator;
mod stats;
mod types;


pub use config::InferenceConfig;
pub use error::{ErrorKind, InferenceError, InferenceResult};
pub use orchestrator::{HealthStatus, InferenceOrchestrator};
pub use stats::{
    truncate_display, PredictionRecord, RunningStatistics, SharedStatistics, StatisticsSnapshot,
    DEFAULT_DISPLAY_CHARS, DEFAULT_HISTORY_CAPACITY,
};
pub use types::{
    AnalysisFailure, AnalysisReport, PredictionResult, SentimentLabel, StepStatus, TraceStage,
    TraceStep,
};
