//! Results returned by the classifier core

use crate::labels::Label;
use serde::{Deserialize, Serialize};

/// Label and calibrated confidence for one feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Label,
    pub class_index: usize,
    /// Mean (or std, per configuration) of the winner's probability, in `[0, 1]`
    pub confidence: f64,
    /// Fraction of posterior draws that voted for the winner
    pub vote_share: f64,
    pub samples: usize,
}

/// Effect of one online update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub class_index: usize,
    /// True when the label was first seen by this update
    pub new_class: bool,
    /// Negative log-likelihood of the label before the update
    pub loss: f64,
    pub classes: usize,
}

/// Consistent copy of a model's learned state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosteriorSnapshot {
    pub labels: Vec<Label>,
    /// Per class, `feature_count + 1` means with the bias last
    pub means: Vec<Vec<f64>>,
    pub variances: Vec<Vec<f64>>,
    pub updates: u64,
}

/// Descriptive summary of a registered model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub name: String,
    pub feature_count: usize,
    pub classes: Vec<Label>,
    pub updates: u64,
    pub predictions: u64,
    pub default_prediction_samples: usize,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<i64>,
}
