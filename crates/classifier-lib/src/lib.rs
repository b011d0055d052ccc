//! Streaming Bayesian softmax classification
//!
//! This crate provides:
//! - A per-model diagonal Gaussian posterior over softmax weights, updated
//!   online one labeled observation at a time
//! - Monte-Carlo predictions with a calibrated confidence score
//! - A process-wide registry of named, shared models
//! - Stream operators that train and query registered models
//! - Prometheus metrics and structured logging

pub mod classifier;
pub mod config;
pub mod error;
pub mod features;
pub mod labels;
pub mod observability;
pub mod pipeline;
pub mod posterior;
pub mod registry;

pub use classifier::{ModelSummary, PosteriorSnapshot, Prediction, SoftmaxClassifier, UpdateOutcome};
pub use config::{ClassifierConfig, ConfidenceMetric, MAX_PREDICTION_SAMPLES};
pub use error::{ClassifierError, ErrorKind, Result};
pub use features::FeatureVector;
pub use labels::{Label, LabelSet};
pub use observability::{ClassifierMetrics, StructuredLogger};
pub use registry::{ModelHandle, ModelRegistry};
