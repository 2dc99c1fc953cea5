//! Logging and metrics
//!
//! - Structured `tracing` output, text or JSON, to console and/or a rolling file
//! - Per-module level overrides on top of the global level
//! - In-memory stage timings for spotting slow inference stages

mod config;
mod metrics;


pub use config::{LogFormat, LogLevel, LogOutput, LoggingConfig, RotationStrategy};
pub use metrics::{
    time_operation, MetricEntry, MetricStats, MetricType, MetricsCollector, TimerGuard,
    METRIC_ANALYSIS_ERRORS, METRIC_CLASSIFIER, METRIC_EMBEDDING, METRIC_PRIVACY_PIPELINE,
};

use std::sync::Arc;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Logging system errors
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to initialize logging: {0}")]
    InitializationError(String),

    #[error("Failed to create log directory: {0}")]
    DirectoryCreationError(String),

    #[error("Invalid filter directive: {0}")]
    InvalidDirective(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type LoggingResult<T> = Result<T, LoggingError>;

type FilteredRegistry = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<FilteredRegistry> + Send + Sync + 'static>;

/// Installed subscriber plus the state that must outlive it
pub struct LoggingSystem {
    config: LoggingConfig,
    metrics: Arc<MetricsCollector>,
    _guards: Vec<WorkerGuard>,
}

impl std::fmt::Debug for LoggingSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingSystem")
            .field("config", &self.config)
            .finish()
    }
}

impl LoggingSystem {
    /// Install the global subscriber described by `config`.
    ///
    /// Fails if a global subscriber is already set.
    pub fn init(config: LoggingConfig) -> LoggingResult<Self> {
        let env_filter = build_env_filter(&config)?;
        let mut guards = Vec::new();
        let mut layers: Vec<BoxedLayer> = Vec::new();

        if matches!(config.output, LogOutput::Console | LogOutput::Both) {
            layers.push(create_console_layer(&config));
        }
        if config.writes_file() {
            let (file_layer, guard) = create_file_layer(&config)?;
            layers.push(file_layer);
            guards.push(guard);
        }

        tracing_subscriber::registry()
            .with(env_filter)
            .with(layers)
            .try_init()
            .map_err(|e| LoggingError::InitializationError(e.to_string()))?;

        tracing::info!(
            level = %config.level,
            format = ?config.format,
            output = ?config.output,
            "Logging initialized"
        );

        let metrics = Arc::new(MetricsCollector::with_capacity(config.max_recent_metrics));
        Ok(Self {
            config,
            metrics,
            _guards: guards,
        })
    }

    /// Shared collector to hand to the orchestrator
    pub fn metrics(&self) -> Arc<MetricsCollector> {
        Arc::clone(&self.metrics)
    }

    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    pub fn log_level(&self) -> LogLevel {
        self.config.level
    }
}

/// Global level plus one directive per module override
pub fn build_env_filter(config: &LoggingConfig) -> LoggingResult<EnvFilter> {
    let mut filter = EnvFilter::new(config.level.as_directive());
    for (module, level) in &config.module_levels {
        let directive = format!("{}={}", module, level.as_directive());
        let parsed = directive
            .parse()
            .map_err(|_| LoggingError::InvalidDirective(directive.clone()))?;
        filter = filter.add_directive(parsed);
    }
    Ok(filter)
}

fn create_console_layer(config: &LoggingConfig) -> BoxedLayer {
    let layer = fmt::layer()
        .with_target(config.include_target)
        .with_thread_ids(config.include_thread_id)
        .with_file(config.include_file_info)
        .with_line_number(config.include_file_info);

    match config.format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Text => layer.boxed(),
    }
}

fn create_file_layer(config: &LoggingConfig) -> LoggingResult<(BoxedLayer, WorkerGuard)> {
    let log_dir = config.resolved_log_directory();
    std::fs::create_dir_all(&log_dir).map_err(|e| {
        LoggingError::DirectoryCreationError(format!("{:?}: {}", log_dir, e))
    })?;

    let rotation = match config.rotation {
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
        RotationStrategy::Never => Rotation::NEVER,
    };
    let appender = RollingFileAppender::new(rotation, &log_dir, &config.file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let layer = fmt::layer()
        .with_writer(non_blocking)
        .with_target(config.include_target)
        .with_thread_ids(config.include_thread_id)
        .with_file(config.include_file_info)
        .with_line_number(config.include_file_info)
        .with_ansi(false);

    let boxed = match config.format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Text => layer.boxed(),
    };
    Ok((boxed, guard))
}

/// Initialize logging with default configuration
pub fn init_default_logging() -> LoggingResult<LoggingSystem> {
    LoggingSystem::init(LoggingConfig::default())
}
