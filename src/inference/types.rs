//! Records produced by one analyze call

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{ErrorKind, InferenceError};
use crate::core::error::{ErrorRecovery, RecoveryAction};

/// Sentiment class decoded from the classifier's raw label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "label", content = "raw")]
pub enum SentimentLabel {
    Negative,
    Positive,
    /// Any label other than 0 or 1, kept verbatim
    Unknown(i64),
}

impl SentimentLabel {
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            0 => SentimentLabel::Negative,
            1 => SentimentLabel::Positive,
            other => SentimentLabel::Unknown(other),
        }
    }

    pub fn raw(&self) -> i64 {
        match self {
            SentimentLabel::Negative => 0,
            SentimentLabel::Positive => 1,
            SentimentLabel::Unknown(raw) => *raw,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Negative => "Negative",
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Unknown(_) => "Unknown",
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authoritative outcome of one classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: SentimentLabel,
    /// `max(proba_negative, proba_positive) * 100`
    pub confidence: f64,
    pub proba_negative: f64,
    pub proba_positive: f64,
    /// Wall-clock duration of the classifier call
    pub processing_time_seconds: f64,
}

/// Steps shown to the user, one record each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStage {
    Input,
    Vector,
    Quantization,
    Encryption,
    Prediction,
    Decryption,
    Result,
}

impl TraceStage {
    pub const ORDER: [TraceStage; 7] = [
        TraceStage::Input,
        TraceStage::Vector,
        TraceStage::Quantization,
        TraceStage::Encryption,
        TraceStage::Prediction,
        TraceStage::Decryption,
        TraceStage::Result,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Skipped,
    Failed,
}

/// One human-readable trace record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    pub stage: TraceStage,
    pub status: StepStatus,
    pub detail: String,
}

impl TraceStep {
    pub fn completed(stage: TraceStage, detail: impl Into<String>) -> Self {
        Self {
            stage,
            status: StepStatus::Completed,
            detail: detail.into(),
        }
    }

    pub fn skipped(stage: TraceStage, detail: impl Into<String>) -> Self {
        Self {
            stage,
            status: StepStatus::Skipped,
            detail: detail.into(),
        }
    }

    pub fn failed(stage: TraceStage, detail: impl Into<String>) -> Self {
        Self {
            stage,
            status: StepStatus::Failed,
            detail: detail.into(),
        }
    }
}

/// Serializable form of an [`InferenceError`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub recovery: RecoveryAction,
}

impl From<&InferenceError> for AnalysisFailure {
    fn from(err: &InferenceError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            recovery: err.recovery_action(),
        }
    }
}

/// Everything one analyze call returns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub request_id: Uuid,
    pub privacy_mode: bool,
    pub trace: Vec<TraceStep>,
    pub prediction: Option<PredictionResult>,
    pub error: Option<AnalysisFailure>,
}

impl AnalysisReport {
    pub(crate) fn new(privacy_mode: bool) -> Self {
        Self {
            request_id: Uuid::now_v7(),
            privacy_mode,
            trace: Vec::with_capacity(TraceStage::ORDER.len()),
            prediction: None,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.prediction.is_some() && self.error.is_none()
    }

    pub fn step(&self, stage: TraceStage) -> Option<&TraceStep> {
        self.trace.iter().find(|s| s.stage == stage)
    }

    /// Final result text, or the error message
    pub fn summary(&self) -> String {
        if let Some(error) = &self.error {
            return error.message.clone();
        }
        self.step(TraceStage::Result)
            .map(|s| s.detail.clone())
            .unwrap_or_default()
    }
}
