//! Stage timing and error counters
//!
//! The orchestrator records one duration sample per stage it runs and a
//! counter sample per failed analysis, so slow stages show up without a
//! profiler attached.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Metric name for the embedding stage
pub const METRIC_EMBEDDING: &str = "embedding";
/// Metric name for the simulated privacy pipeline
pub const METRIC_PRIVACY_PIPELINE: &str = "privacy_pipeline";
/// Metric name for the classifier call
pub const METRIC_CLASSIFIER: &str = "classifier";
/// Counter of analyze calls that returned an error
pub const METRIC_ANALYSIS_ERRORS: &str = "analysis_errors";

/// Type of metric being recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetricType {
    Duration(Duration),
    Counter(u64),
    Gauge(f64),
}

impl MetricType {
    /// Milliseconds for durations, the raw value otherwise
    pub fn as_f64(&self) -> f64 {
        match self {
            MetricType::Duration(d) => d.as_secs_f64() * 1000.0,
            MetricType::Counter(c) => *c as f64,
            MetricType::Gauge(g) => *g,
        }
    }
}

/// A single metric entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricEntry {
    pub name: String,
    pub value: MetricType,
    pub timestamp: DateTime<Utc>,
}

/// Aggregated statistics for a metric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricStats {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Last recorded value
    pub last: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for MetricStats {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::MAX,
            max: f64::MIN,
            mean: 0.0,
            last: 0.0,
            last_updated: None,
        }
    }
}

impl MetricStats {
    fn update(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.mean = self.sum / self.count as f64;
        self.last = value;
        self.last_updated = Some(Utc::now());
    }
}

/// Metrics collector for recording and aggregating stage timings
pub struct MetricsCollector {
    metrics: RwLock<HashMap<String, MetricStats>>,
    recent_entries: RwLock<VecDeque<MetricEntry>>,
    max_recent_entries: usize,
    total_recorded: AtomicU64,
    start_time: Instant,
}

impl std::fmt::Debug for MetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsCollector")
            .field("metrics", &self.metrics.read().len())
            .field("total_recorded", &self.total_recorded())
            .finish()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    /// Collector keeping at most `max_recent_entries` raw samples
    pub fn with_capacity(max_recent_entries: usize) -> Self {
        Self {
            metrics: RwLock::new(HashMap::new()),
            recent_entries: RwLock::new(VecDeque::with_capacity(max_recent_entries.min(1024))),
            max_recent_entries,
            total_recorded: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, name: &str, value: MetricType) {
        self.metrics
            .write()
            .entry(name.to_string())
            .or_default()
            .update(value.as_f64());
        self.push_recent(name, value);
    }

    pub fn record_duration(&self, name: &str, duration: Duration) {
        self.record(name, MetricType::Duration(duration));
    }

    pub fn record_gauge(&self, name: &str, value: f64) {
        self.record(name, MetricType::Gauge(value));
    }

    /// Add one to a running counter
    pub fn increment(&self, name: &str) {
        // Read-modify-write under one guard
        let value = {
            let mut metrics = self.metrics.write();
            let stats = metrics.entry(name.to_string()).or_default();
            let value = MetricType::Counter(stats.last as u64 + 1);
            stats.update(value.as_f64());
            value
        };
        self.push_recent(name, value);
    }

    fn push_recent(&self, name: &str, value: MetricType) {
        let numeric_value = value.as_f64();
        if self.max_recent_entries > 0 {
            let mut recent = self.recent_entries.write();
            while recent.len() >= self.max_recent_entries {
                recent.pop_front();
            }
            recent.push_back(MetricEntry {
                name: name.to_string(),
                value,
                timestamp: Utc::now(),
            });
        }

        self.total_recorded.fetch_add(1, Ordering::Relaxed);

        tracing::trace!(
            target: "metrics",
            metric_name = name,
            metric_value = numeric_value,
            "Metric recorded"
        );
    }

    pub fn get_stats(&self, name: &str) -> Option<MetricStats> {
        self.metrics.read().get(name).cloned()
    }

    pub fn get_all_stats(&self) -> HashMap<String, MetricStats> {
        self.metrics.read().clone()
    }

    /// Recent samples, oldest first
    pub fn get_recent_entries(&self) -> Vec<MetricEntry> {
        self.recent_entries.read().iter().cloned().collect()
    }

    pub fn get_recent_entries_for(&self, name: &str) -> Vec<MetricEntry> {
        self.recent_entries
            .read()
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    pub fn total_recorded(&self) -> u64 {
        self.total_recorded.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn clear(&self) {
        self.metrics.write().clear();
        self.recent_entries.write().clear();
        self.total_recorded.store(0, Ordering::Relaxed);
    }

    /// Aggregated stats as pretty JSON
    pub fn export_json(&self) -> String {
        serde_json::to_string_pretty(&self.get_all_stats()).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Records the elapsed time under `name` when dropped
pub struct TimerGuard<'a> {
    collector: &'a MetricsCollector,
    name: &'static str,
    start: Instant,
}

impl<'a> TimerGuard<'a> {
    pub fn new(collector: &'a MetricsCollector, name: &'static str) -> Self {
        Self {
            collector,
            name,
            start: Instant::now(),
        }
    }
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.collector.record_duration(self.name, self.start.elapsed());
    }
}

pub fn time_operation<'a>(collector: &'a MetricsCollector, name: &'static str) -> TimerGuard<'a> {
    TimerGuard::new(collector, name)
}
