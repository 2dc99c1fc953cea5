//! Running prediction statistics
//!
//! The aggregate is owned by whoever builds the orchestrator and shared
//! behind a mutex; every successful analysis updates it in one lock scope,
//! so `negative_count + positive_count == total_predictions` holds for any
//! observer.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::types::{PredictionResult, SentimentLabel};

/// Default ring buffer capacity
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Default number of characters kept in a history entry
pub const DEFAULT_DISPLAY_CHARS: usize = 50;

/// Statistics shared between the orchestrator and dashboards
pub type SharedStatistics = Arc<Mutex<RunningStatistics>>;

/// One entry of the recent-predictions history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub timestamp: DateTime<Utc>,
    /// Input text, cut to the display length with `...` appended
    pub text: String,
    pub label: SentimentLabel,
    pub confidence: f64,
}

/// Keep the first `max_chars` characters and append `...` when cut
pub fn truncate_display(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningStatistics {
    pub total_predictions: u64,
    pub negative_count: u64,
    /// Every non-negative label, unknown ones included
    pub positive_count: u64,
    pub avg_confidence: f64,
    pub total_processing_time: f64,
    history: VecDeque<PredictionRecord>,
    history_capacity: usize,
    display_chars: usize,
}

impl Default for RunningStatistics {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY, DEFAULT_DISPLAY_CHARS)
    }
}

impl RunningStatistics {
    /// Empty aggregate; a zero capacity is raised to one
    pub fn new(history_capacity: usize, display_chars: usize) -> Self {
        let history_capacity = history_capacity.max(1);
        Self {
            total_predictions: 0,
            negative_count: 0,
            positive_count: 0,
            avg_confidence: 0.0,
            total_processing_time: 0.0,
            history: VecDeque::with_capacity(history_capacity),
            history_capacity,
            display_chars,
        }
    }

    pub fn shared(self) -> SharedStatistics {
        Arc::new(Mutex::new(self))
    }

    /// Fold one successful prediction into the aggregate.
    ///
    /// `accumulate_time` controls whether the prediction's processing time
    /// feeds `total_processing_time`.
    pub fn record(&mut self, text: &str, prediction: &PredictionResult, accumulate_time: bool) {
        self.total_predictions += 1;
        match prediction.label {
            SentimentLabel::Negative => self.negative_count += 1,
            _ => self.positive_count += 1,
        }

        let n = self.total_predictions as f64;
        self.avg_confidence = (self.avg_confidence * (n - 1.0) + prediction.confidence) / n;

        if accumulate_time {
            self.total_processing_time += prediction.processing_time_seconds;
        }

        if self.history.len() == self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(PredictionRecord {
            timestamp: Utc::now(),
            text: truncate_display(text, self.display_chars),
            label: prediction.label,
            confidence: prediction.confidence,
        });
    }

    /// History in chronological order, oldest first
    pub fn history(&self) -> impl ExactSizeIterator<Item = &PredictionRecord> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        let total = self.total_predictions;
        let percent = |count: u64| {
            if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            }
        };

        StatisticsSnapshot {
            total_predictions: total,
            negative_count: self.negative_count,
            positive_count: self.positive_count,
            negative_percent: percent(self.negative_count),
            positive_percent: percent(self.positive_count),
            avg_confidence: self.avg_confidence,
            avg_processing_time: if total > 0 {
                self.total_processing_time / total as f64
            } else {
                0.0
            },
            history: self.history.iter().cloned().collect(),
        }
    }
}

/// Point-in-time copy of the statistics for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub total_predictions: u64,
    pub negative_count: u64,
    pub positive_count: u64,
    pub negative_percent: f64,
    pub positive_percent: f64,
    pub avg_confidence: f64,
    /// `total_processing_time / total_predictions`
    pub avg_processing_time: f64,
    /// Oldest first
    pub history: Vec<PredictionRecord>,
}

impl StatisticsSnapshot {
    /// Up to `n` most recent records, newest first
    pub fn recent(&self, n: usize) -> Vec<&PredictionRecord> {
        self.history.iter().rev().take(n).collect()
    }
}

impl std::fmt::Display for StatisticsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Total predictions: {}", self.total_predictions)?;
        writeln!(
            f,
            "Negative: {} ({:.1}%)",
            self.negative_count, self.negative_percent
        )?;
        writeln!(
            f,
            "Positive: {} ({:.1}%)",
            self.positive_count, self.positive_percent
        )?;
        writeln!(f, "Average confidence: {:.1}%", self.avg_confidence)?;
        writeln!(
            f,
            "Average processing time: {:.4}s",
            self.avg_processing_time
        )?;

        let recent = self.recent(5);
        if recent.is_empty() {
            return write!(f, "No predictions yet");
        }
        write!(f, "Recent predictions:")?;
        for record in recent {
            write!(
                f,
                "\n- [{}] {} -> {} ({:.1}%)",
                record.timestamp.format("%H:%M:%S"),
                record.text,
                record.label,
                record.confidence
            )?;
        }
        Ok(())
    }
}
