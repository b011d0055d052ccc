//! Feature vectors and their validation helpers
//!
//! A feature vector is the fixed-length numeric input for one event. The
//! classifier appends an implicit bias component when scoring, so a model
//! with `n` features stores `n + 1` weights per class.

use crate::error::{ClassifierError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Largest accepted feature magnitude, keeping squared terms finite
pub const MAX_FEATURE_MAGNITUDE: f64 = 1e154;

/// Immutable ordered tuple of real-valued features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Box<[f64]>);

impl FeatureVector {
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self(values.into().into_boxed_slice())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Fail with `DimensionMismatch` unless the vector has `expected` entries
    pub fn check_dimension(&self, expected: usize) -> Result<()> {
        check_dimension(&self.0, expected)
    }

    /// Fail with `InvalidInput` if any entry is NaN or infinite
    pub fn check_finite(&self) -> Result<()> {
        check_finite(&self.0)
    }

    /// Fail with `InvalidInput` unless every entry is finite and no larger in
    /// magnitude than [`MAX_FEATURE_MAGNITUDE`]
    pub fn check_bounded(&self) -> Result<()> {
        check_finite(&self.0)?;
        check_magnitude(&self.0)
    }

    /// Iterate the features followed by the constant bias input `1.0`
    pub fn with_bias(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied().chain(std::iter::once(1.0))
    }

    /// Score `weights` (length `len() + 1`, bias last) against this vector
    pub fn score(&self, weights: &[f64]) -> f64 {
        debug_assert_eq!(weights.len(), self.0.len() + 1);
        self.with_bias().zip(weights).map(|(x, w)| x * w).sum()
    }
}

impl Deref for FeatureVector {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl From<&[f64]> for FeatureVector {
    fn from(values: &[f64]) -> Self {
        Self::new(values.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for FeatureVector {
    fn from(values: [f64; N]) -> Self {
        Self::new(values.to_vec())
    }
}

pub fn check_dimension(values: &[f64], expected: usize) -> Result<()> {
    if values.len() != expected {
        return Err(ClassifierError::DimensionMismatch {
            expected,
            actual: values.len(),
        });
    }
    Ok(())
}

pub fn check_finite(values: &[f64]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(idx) => Err(ClassifierError::InvalidInput(format!(
            "feature {} is not a finite number ({})",
            idx, values[idx]
        ))),
        None => Ok(()),
    }
}

pub fn check_magnitude(values: &[f64]) -> Result<()> {
    match values.iter().position(|v| v.abs() > MAX_FEATURE_MAGNITUDE) {
        Some(idx) => Err(ClassifierError::InvalidInput(format!(
            "feature {} is too large to score ({})",
            idx, values[idx]
        ))),
        None => Ok(()),
    }
}
