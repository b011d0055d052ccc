//! Observability infrastructure for the classifier
//!
//! Provides:
//! - Prometheus metrics (update/prediction latency, per-model counters, class counts)
//! - Structured event logging with tracing

use crate::error::ErrorKind;
use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, register_int_gauge_vec,
    Histogram, IntCounterVec, IntGauge, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ClassifierMetricsInner> = OnceLock::new();

struct ClassifierMetricsInner {
    update_latency_seconds: Histogram,
    prediction_latency_seconds: Histogram,
    models_registered: IntGauge,
    model_classes: IntGaugeVec,
    updates_total: IntCounterVec,
    predictions_total: IntCounterVec,
    update_errors_total: IntCounterVec,
    prediction_errors_total: IntCounterVec,
}

impl ClassifierMetricsInner {
    fn new() -> Self {
        Self {
            update_latency_seconds: register_histogram!(
                "bayes_classifier_update_latency_seconds",
                "Time spent applying one online posterior update",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register update_latency_seconds"),

            prediction_latency_seconds: register_histogram!(
                "bayes_classifier_prediction_latency_seconds",
                "Time spent sampling the predictive distribution for one event",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            models_registered: register_int_gauge!(
                "bayes_classifier_models_registered",
                "Number of models currently held by the registry"
            )
            .expect("Failed to register models_registered"),

            model_classes: register_int_gauge_vec!(
                "bayes_classifier_model_classes",
                "Number of known classes per model",
                &["model"]
            )
            .expect("Failed to register model_classes"),

            updates_total: register_int_counter_vec!(
                "bayes_classifier_updates_total",
                "Total number of successful model updates",
                &["model"]
            )
            .expect("Failed to register updates_total"),

            predictions_total: register_int_counter_vec!(
                "bayes_classifier_predictions_total",
                "Total number of predictions served",
                &["model"]
            )
            .expect("Failed to register predictions_total"),

            update_errors_total: register_int_counter_vec!(
                "bayes_classifier_update_errors_total",
                "Total number of rejected updates by error kind",
                &["kind"]
            )
            .expect("Failed to register update_errors_total"),

            prediction_errors_total: register_int_counter_vec!(
                "bayes_classifier_prediction_errors_total",
                "Total number of failed predictions by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),
        }
    }
}

/// Classifier metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct ClassifierMetrics {
    _private: (),
}

impl Default for ClassifierMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ClassifierMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ClassifierMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record one successful update and the model's resulting class count
    pub fn observe_update(&self, model: &str, duration_secs: f64, classes: usize) {
        let inner = self.inner();
        inner.update_latency_seconds.observe(duration_secs);
        inner.updates_total.with_label_values(&[model]).inc();
        inner
            .model_classes
            .with_label_values(&[model])
            .set(classes as i64);
    }

    pub fn observe_prediction(&self, model: &str, duration_secs: f64) {
        let inner = self.inner();
        inner.prediction_latency_seconds.observe(duration_secs);
        inner.predictions_total.with_label_values(&[model]).inc();
    }

    pub fn inc_update_errors(&self, kind: ErrorKind) {
        self.inner()
            .update_errors_total
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    pub fn inc_prediction_errors(&self, kind: ErrorKind) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    pub fn set_models_registered(&self, count: usize) {
        self.inner().models_registered.set(count as i64);
    }
}

/// Structured logger for classifier events
///
/// Gives every significant event a stable `event` field so log pipelines
/// can filter on it.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn log_model_attached(&self, model: &str, feature_count: usize, operator: &str) {
        info!(
            event = "model_attached",
            instance = %self.instance,
            model = %model,
            feature_count = feature_count,
            operator = %operator,
            "Stream operator attached to model"
        );
    }

    pub fn log_class_added(&self, model: &str, label: &str, classes: usize) {
        info!(
            event = "class_added",
            instance = %self.instance,
            model = %model,
            label = %label,
            classes = classes,
            "Model learned a new class"
        );
    }

    pub fn log_update_rejected(&self, model: &str, kind: ErrorKind, reason: &str) {
        warn!(
            event = "update_rejected",
            instance = %self.instance,
            model = %model,
            kind = kind.as_str(),
            reason = %reason,
            "Update rejected, posterior unchanged"
        );
    }

    pub fn log_prediction(&self, model: &str, label: &str, confidence: f64, samples: usize) {
        debug!(
            event = "prediction",
            instance = %self.instance,
            model = %model,
            label = %label,
            confidence = confidence,
            samples = samples,
            "Prediction served"
        );
    }

    pub fn log_startup(&self, version: &str, port: u16) {
        info!(
            event = "agent_started",
            instance = %self.instance,
            agent_version = %version,
            port = port,
            "Classifier agent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str, models: usize) {
        info!(
            event = "agent_shutdown",
            instance = %self.instance,
            reason = %reason,
            models = models,
            "Classifier agent shutting down"
        );
    }
}
