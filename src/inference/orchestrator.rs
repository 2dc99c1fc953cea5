//! Analyze flow: embed, trace the simulated pipeline, classify, record
//!
//! The label always comes from the classifier applied to the clear
//! embedding. In privacy mode the simulated pipeline runs alongside and
//! only contributes trace records; its numeric output never reaches the
//! prediction.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::error::{InferenceError, InferenceResult};
use super::stats::{RunningStatistics, SharedStatistics, StatisticsSnapshot};
use super::types::{AnalysisReport, PredictionResult, SentimentLabel, TraceStage, TraceStep};
use crate::classifier::{ClassifierError, SentimentClassifier};
use crate::core::config::AppConfig;
use crate::embeddings::{Embedder, EmbeddingMatrix};
use crate::logging::{
    time_operation, MetricsCollector, METRIC_ANALYSIS_ERRORS, METRIC_CLASSIFIER,
    METRIC_EMBEDDING, METRIC_PRIVACY_PIPELINE,
};
use crate::privacy::{PipelineRun, PrivacySimulator};

/// Probabilities used when a clear-mode classifier has no probability output
const CLEAR_MODE_FALLBACK: (f64, f64, f64) = (0.5, 0.5, 50.0);

/// Probabilities used when a privacy-mode classifier has no probability output
const PRIVACY_MODE_FALLBACK: (f64, f64, f64) = (0.0, 0.0, 0.0);

/// Readiness of the two model dependencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub encoder_loaded: bool,
    pub classifier_loaded: bool,
}

impl HealthStatus {
    pub fn is_ready(&self) -> bool {
        self.encoder_loaded && self.classifier_loaded
    }
}

/// Single entry point for sentiment analysis
pub struct InferenceOrchestrator {
    embedder: RwLock<Option<Embedder>>,
    classifier: RwLock<Option<Arc<dyn SentimentClassifier>>>,
    simulator: PrivacySimulator,
    rng: Mutex<StdRng>,
    stats: SharedStatistics,
    metrics: Arc<MetricsCollector>,
}

impl std::fmt::Debug for InferenceOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceOrchestrator")
            .field("health", &self.health())
            .field("simulator", &self.simulator)
            .finish()
    }
}

impl InferenceOrchestrator {
    /// Orchestrator over explicit parts; the noise source is entropy-seeded.
    pub fn new(
        embedder: Option<Embedder>,
        simulator: PrivacySimulator,
        stats: SharedStatistics,
    ) -> Self {
        Self {
            embedder: RwLock::new(embedder),
            classifier: RwLock::new(None),
            simulator,
            rng: Mutex::new(StdRng::from_entropy()),
            stats,
            metrics: Arc::new(MetricsCollector::new()),
        }
    }

    /// Build from configuration.
    ///
    /// A missing encoder model is not fatal here: the orchestrator starts
    /// unready and every analysis reports `ModelUnavailable` until an
    /// encoder is installed.
    pub fn from_config(config: &AppConfig, metrics: Arc<MetricsCollector>) -> crate::Result<Self> {
        config.validate()?;

        let embedder = match Embedder::load(config.embedding.clone()) {
            Ok(embedder) => {
                tracing::info!(
                    model = ?config.embedding.model_path(),
                    hidden_size = embedder.hidden_size(),
                    "Encoder loaded"
                );
                Some(embedder)
            }
            Err(e) if e.is_model_unavailable() => {
                tracing::warn!(error = %e, "Encoder unavailable, starting without it");
                None
            }
            Err(e) => return Err(e.into()),
        };

        let simulator = PrivacySimulator::new(&config.privacy)?;
        let stats = RunningStatistics::new(
            config.inference.history_capacity,
            config.inference.display_chars,
        )
        .shared();

        let mut orchestrator = Self::new(embedder, simulator, stats).with_metrics(metrics);
        if let Some(seed) = config.privacy.noise_seed {
            orchestrator = orchestrator.with_rng(StdRng::seed_from_u64(seed));
        }
        Ok(orchestrator)
    }

    pub fn with_classifier(self, classifier: Arc<dyn SentimentClassifier>) -> Self {
        self.install_classifier(classifier);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Replace the noise source, e.g. with a seeded one for reproducible traces
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn install_embedder(&self, embedder: Embedder) {
        *self.embedder.write() = Some(embedder);
        tracing::info!("Encoder installed");
    }

    pub fn install_classifier(&self, classifier: Arc<dyn SentimentClassifier>) {
        *self.classifier.write() = Some(classifier);
        tracing::info!("Classifier installed");
    }

    /// Drop the classifier; analyses fail with `ModelUnavailable` until a
    /// new one is installed
    pub fn remove_classifier(&self) -> Option<Arc<dyn SentimentClassifier>> {
        let previous = self.classifier.write().take();
        if previous.is_some() {
            tracing::warn!("Classifier removed");
        }
        previous
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "ok".to_string(),
            encoder_loaded: self.embedder.read().is_some(),
            classifier_loaded: self.classifier.read().is_some(),
        }
    }

    /// Handle to the shared statistics
    pub fn statistics(&self) -> SharedStatistics {
        Arc::clone(&self.stats)
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        self.stats.lock().snapshot()
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        Arc::clone(&self.metrics)
    }

    pub fn simulator(&self) -> &PrivacySimulator {
        &self.simulator
    }

    /// Analyze one text.
    ///
    /// Never panics on bad input; failures are reported in
    /// [`AnalysisReport::error`] and leave the statistics untouched.
    pub fn analyze(&self, text: &str, use_privacy_mode: bool) -> AnalysisReport {
        let mut report = AnalysisReport::new(use_privacy_mode);
        let span = tracing::debug_span!(
            "analyze",
            request_id = %report.request_id,
            privacy_mode = use_privacy_mode
        );
        let _enter = span.enter();

        match self.run(text, use_privacy_mode, &mut report.trace) {
            Ok(prediction) => {
                tracing::info!(
                    label = %prediction.label,
                    confidence = prediction.confidence,
                    processing_time = prediction.processing_time_seconds,
                    "Analysis completed"
                );
                report.prediction = Some(prediction);
            }
            Err(e) => {
                self.metrics.increment(METRIC_ANALYSIS_ERRORS);
                tracing::warn!(error = %e, kind = ?e.kind(), "Analysis failed");
                report.error = Some((&e).into());
            }
        }

        report
    }

    fn run(
        &self,
        text: &str,
        use_privacy_mode: bool,
        trace: &mut Vec<TraceStep>,
    ) -> InferenceResult<PredictionResult> {
        let text = text.trim();
        if text.is_empty() {
            return Err(InferenceError::EmptyInput);
        }

        let embedder = self
            .embedder
            .read()
            .clone()
            .ok_or_else(|| InferenceError::ModelUnavailable {
                reason: "encoder not loaded".to_string(),
            })?;
        let classifier = self
            .classifier
            .read()
            .clone()
            .ok_or_else(|| InferenceError::ModelUnavailable {
                reason: "classifier not loaded".to_string(),
            })?;

        trace.push(TraceStep::completed(
            TraceStage::Input,
            format!(
                "Input text:\n{}\n\nLength: {} characters",
                text,
                text.chars().count()
            ),
        ));

        let features = {
            let _timer = time_operation(&self.metrics, METRIC_EMBEDDING);
            embedder.embed_one(text)?
        };
        trace.push(TraceStep::completed(
            TraceStage::Vector,
            describe_vector(&features),
        ));

        let pipeline = if use_privacy_mode {
            self.trace_pipeline(&features, trace)
        } else {
            trace.push(TraceStep::skipped(
                TraceStage::Quantization,
                "Skipped (clear mode): floats are processed directly",
            ));
            trace.push(TraceStep::skipped(
                TraceStage::Encryption,
                "Skipped (clear mode): data stays in clear text",
            ));
            None
        };

        let prediction = match self.classify(classifier.as_ref(), &features, use_privacy_mode) {
            Ok(prediction) => prediction,
            Err(e) => {
                trace.push(TraceStep::failed(TraceStage::Prediction, e.to_string()));
                return Err(e);
            }
        };

        trace.push(TraceStep::completed(
            TraceStage::Prediction,
            describe_prediction(use_privacy_mode, pipeline.as_ref()),
        ));
        trace.push(self.decryption_step(use_privacy_mode, pipeline.as_ref(), &prediction));
        trace.push(TraceStep::completed(
            TraceStage::Result,
            describe_result(&prediction, use_privacy_mode),
        ));

        self.stats
            .lock()
            .record(text, &prediction, use_privacy_mode);

        Ok(prediction)
    }

    /// Run the simulated pipeline and push the quantization and encryption
    /// records. A pipeline failure is traced, not propagated.
    fn trace_pipeline(
        &self,
        features: &EmbeddingMatrix,
        trace: &mut Vec<TraceStep>,
    ) -> Option<PipelineRun> {
        let result = {
            let _timer = time_operation(&self.metrics, METRIC_PRIVACY_PIPELINE);
            let mut rng = self.rng.lock();
            self.simulator.run(features, &mut *rng)
        };

        match result {
            Ok(run) => {
                let sample: Vec<String> = run
                    .quantized
                    .iter()
                    .take(5)
                    .map(|q| q.to_string())
                    .collect();
                trace.push(TraceStep::completed(
                    TraceStage::Quantization,
                    format!(
                        "Quantization: float32 -> integers in 0..={}\n\
                         Precision: n_bits={}\n\
                         Range: [{:.4}, {:.4}]\n\
                         First 5 values: [{}]",
                        run.context.scale as u64,
                        run.context.n_bits,
                        run.context.data_min,
                        run.context.data_max,
                        sample.join(", ")
                    ),
                ));
                trace.push(TraceStep::completed(
                    TraceStage::Encryption,
                    format!(
                        "Encryption (simulated, not secure): noise added with public key {}\n\
                         Shape: {:?}\n\
                         Method: {:?}",
                        self.simulator.public_key().fingerprint(),
                        run.envelope.metadata.original_shape,
                        run.envelope.metadata.method
                    ),
                ));
                Some(run)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Simulated pipeline failed, continuing with clear prediction");
                trace.push(TraceStep::failed(TraceStage::Quantization, e.to_string()));
                trace.push(TraceStep::failed(TraceStage::Encryption, e.to_string()));
                None
            }
        }
    }

    fn classify(
        &self,
        classifier: &dyn SentimentClassifier,
        features: &EmbeddingMatrix,
        use_privacy_mode: bool,
    ) -> InferenceResult<PredictionResult> {
        let rows = features.nrows();
        let start = Instant::now();

        let labels = classifier.predict(features)?;
        let raw = single_row(labels, rows)?;
        let proba = classifier
            .predict_proba(features)?
            .map(|p| single_row(p, rows))
            .transpose()?;

        let elapsed = start.elapsed();
        self.metrics.record_duration(METRIC_CLASSIFIER, elapsed);

        let (proba_negative, proba_positive, confidence) = match proba {
            Some(p) => (p.negative, p.positive, p.max() * 100.0),
            None if use_privacy_mode => PRIVACY_MODE_FALLBACK,
            None => CLEAR_MODE_FALLBACK,
        };

        Ok(PredictionResult {
            label: SentimentLabel::from_raw(raw),
            confidence,
            proba_negative,
            proba_positive,
            processing_time_seconds: elapsed.as_secs_f64(),
        })
    }

    fn decryption_step(
        &self,
        use_privacy_mode: bool,
        pipeline: Option<&PipelineRun>,
        prediction: &PredictionResult,
    ) -> TraceStep {
        if !use_privacy_mode {
            return TraceStep::skipped(
                TraceStage::Decryption,
                "Skipped (clear mode): result is already in clear",
            );
        }
        match pipeline {
            Some(run) => TraceStep::completed(
                TraceStage::Decryption,
                format!(
                    "Decryption (simulated) with the secret key\n\
                     Dequantized pipeline output: {:.4}\n\
                     Result: {} (0=Negative, 1=Positive)",
                    run.dequantized.iter().next().copied().unwrap_or_default(),
                    prediction.label.raw()
                ),
            ),
            None => TraceStep::failed(
                TraceStage::Decryption,
                "Simulated pipeline did not complete",
            ),
        }
    }
}

/// Exactly one item per input row, then the first one
fn single_row<T>(items: Vec<T>, expected: usize) -> InferenceResult<T> {
    if items.len() != expected {
        return Err(ClassifierError::RowCountMismatch {
            expected,
            actual: items.len(),
        }
        .into());
    }
    items
        .into_iter()
        .next()
        .ok_or_else(|| InferenceError::PredictionFailure {
            reason: "classifier returned no rows".to_string(),
        })
}

fn describe_vector(features: &EmbeddingMatrix) -> String {
    let first: Vec<String> = features
        .iter()
        .take(5)
        .map(|v| format!("{:.4}", v))
        .collect();
    let (min, max) = features
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let mean = features.mean().unwrap_or_default();

    format!(
        "Vector representation\n\
         Shape: {:?}\n\
         Dimensions: {}\n\
         First 5 values: [{}]\n\
         Min: {:.4}, Max: {:.4}, Mean: {:.4}\n\n\
         Status: in clear text",
        features.dim(),
        features.ncols(),
        first.join(", "),
        min,
        max,
        mean
    )
}

fn describe_prediction(use_privacy_mode: bool, pipeline: Option<&PipelineRun>) -> String {
    if !use_privacy_mode {
        return "Prediction (clear mode): classifier applied directly to the clear vector"
            .to_string();
    }
    match pipeline {
        Some(run) => format!(
            "Prediction on obfuscated data (simulated)\n\
             Operation: {:?} over shape {:?}\n\
             Label computed by the classifier on the clear vector",
            run.computed.operation,
            run.computed.result.dim()
        ),
        None => "Prediction: classifier applied to the clear vector (simulation failed)"
            .to_string(),
    }
}

fn describe_result(prediction: &PredictionResult, use_privacy_mode: bool) -> String {
    let rule = "=".repeat(50);
    let note = if use_privacy_mode {
        format!(
            "Processing time: {:.4}s",
            prediction.processing_time_seconds
        )
    } else {
        "Note: processed without encryption".to_string()
    };
    format!(
        "{rule}\n\
         Sentiment: {}\n\
         Confidence: {:.1}%\n\n\
         Probabilities:\n  Negative: {:.1}%\n  Positive: {:.1}%\n\n\
         {note}\n\
         {rule}",
        prediction.label,
        prediction.confidence,
        prediction.proba_negative * 100.0,
        prediction.proba_positive * 100.0,
    )
}
