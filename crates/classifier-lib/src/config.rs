//! Classifier configuration

use crate::error::{ClassifierError, Result};
use crate::posterior::{DEFAULT_NEWTON_STEPS, DEFAULT_PRIOR_PRECISION};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of posterior draws per prediction
pub const DEFAULT_PREDICTION_SAMPLES: usize = 1000;

/// Upper bound on posterior draws for a single prediction
pub const MAX_PREDICTION_SAMPLES: usize = 100_000;

/// Predictions slower than this are counted and logged
pub const SLOW_PREDICTION_THRESHOLD: Duration = Duration::from_millis(5);

/// Scalar reported alongside the predicted label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceMetric {
    /// Mean probability assigned to the winning class across draws
    #[default]
    MeanProbability,
    /// Standard deviation of the winning class probability across draws
    StdDeviation,
}

/// Settings applied to every model a registry creates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Precision of the zero-mean Gaussian prior for a new class
    pub prior_precision: f64,
    /// Newton iterations per online update
    pub newton_steps: usize,
    /// Sample count used when a prediction does not specify one
    pub default_prediction_samples: usize,
    pub confidence_metric: ConfidenceMetric,
    #[serde(with = "millis")]
    pub slow_prediction_threshold: Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            prior_precision: DEFAULT_PRIOR_PRECISION,
            newton_steps: DEFAULT_NEWTON_STEPS,
            default_prediction_samples: DEFAULT_PREDICTION_SAMPLES,
            confidence_metric: ConfidenceMetric::default(),
            slow_prediction_threshold: SLOW_PREDICTION_THRESHOLD,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.prior_precision.is_finite() && self.prior_precision > 0.0) {
            return Err(ClassifierError::config(format!(
                "prior_precision must be a positive finite number, got {}",
                self.prior_precision
            )));
        }
        if self.newton_steps == 0 {
            return Err(ClassifierError::config("newton_steps must be at least 1"));
        }
        if self.default_prediction_samples == 0
            || self.default_prediction_samples > MAX_PREDICTION_SAMPLES
        {
            return Err(ClassifierError::config(format!(
                "default_prediction_samples must be between 1 and {}, got {}",
                MAX_PREDICTION_SAMPLES, self.default_prediction_samples
            )));
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
