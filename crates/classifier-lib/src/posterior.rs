//! Diagonal Gaussian posterior over the softmax weight matrix
//!
//! Each class `k` owns a weight vector `w_k` of dimension `features + 1`
//! (bias last) with an independent Gaussian per component, stored as a mean
//! and a precision (inverse variance). New classes start from the prior
//! `N(0, 1 / prior_precision)`.
//!
//! An update treats the current posterior as the prior for one observation
//! and applies an online Laplace step:
//!
//! 1. Starting at the current mean, take a few diagonal Newton steps on
//!    `log N(w; m, diag(q)^-1) + log softmax(W x)[y]`.
//! 2. Add the diagonal curvature of the likelihood at the new mode,
//!    `p_k (1 - p_k) x_j^2`, to every precision.
//!
//! Precisions only grow, so variances shrink monotonically as evidence
//! accrues. All arithmetic happens on a [`Proposal`] which is only
//! committed when every value is finite.

use crate::error::{ClassifierError, Result};
use crate::features::FeatureVector;
use rand::Rng;
use rand_distr::StandardNormal;

/// Default prior precision for new classes (unit variance)
pub const DEFAULT_PRIOR_PRECISION: f64 = 1.0;

/// Default number of Newton iterations per update
pub const DEFAULT_NEWTON_STEPS: usize = 3;

/// Posterior parameters for every known class
#[derive(Debug, Clone)]
pub struct Posterior {
    dim: usize,
    prior_precision: f64,
    /// Row-major `classes x dim`
    means: Vec<f64>,
    /// Row-major `classes x dim`
    precisions: Vec<f64>,
}

/// Candidate posterior produced by [`Posterior::propose`]
#[derive(Debug)]
pub struct Proposal {
    means: Vec<f64>,
    precisions: Vec<f64>,
    /// Negative log-likelihood of the target under the pre-update mean
    pub loss: f64,
}

impl Posterior {
    pub fn new(feature_count: usize, prior_precision: f64) -> Self {
        Self {
            dim: feature_count + 1,
            prior_precision,
            means: Vec::new(),
            precisions: Vec::new(),
        }
    }

    pub fn classes(&self) -> usize {
        self.means.len() / self.dim
    }

    /// Weight dimension including the bias component
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn feature_count(&self) -> usize {
        self.dim - 1
    }

    pub fn prior_precision(&self) -> f64 {
        self.prior_precision
    }

    pub fn mean(&self, class: usize) -> &[f64] {
        &self.means[class * self.dim..(class + 1) * self.dim]
    }

    pub fn precision(&self, class: usize) -> &[f64] {
        &self.precisions[class * self.dim..(class + 1) * self.dim]
    }

    pub fn variance(&self, class: usize) -> Vec<f64> {
        self.precision(class).iter().map(|q| 1.0 / q).collect()
    }

    /// Class scores under the posterior mean
    pub fn mean_logits(&self, features: &FeatureVector) -> Vec<f64> {
        (0..self.classes())
            .map(|k| features.score(self.mean(k)))
            .collect()
    }

    /// Compute the posterior after observing `features` with class `target`
    ///
    /// `target` may equal `classes()`, in which case the proposal contains a
    /// new class initialized from the prior. The receiver is not modified.
    pub fn propose(
        &self,
        features: &FeatureVector,
        target: usize,
        newton_steps: usize,
    ) -> Result<Proposal> {
        let dim = self.dim;
        let mut prior_means = self.means.clone();
        let mut prior_precisions = self.precisions.clone();
        if target == self.classes() {
            prior_means.extend(std::iter::repeat(0.0).take(dim));
            prior_precisions.extend(std::iter::repeat(self.prior_precision).take(dim));
        } else if target > self.classes() {
            return Err(ClassifierError::UnknownClassIndex {
                index: target,
                classes: self.classes(),
            });
        }
        let classes = prior_means.len() / dim;
        let x: Vec<f64> = features.with_bias().collect();
        let x_sq: Vec<f64> = x.iter().map(|v| v * v).collect();

        let mut probs = logits(&prior_means, &x, classes);
        softmax_in_place(&mut probs);
        let loss = -probs[target].max(f64::MIN_POSITIVE).ln();

        let mut weights = prior_means.clone();
        for _ in 0..newton_steps {
            let mut p = logits(&weights, &x, classes);
            softmax_in_place(&mut p);
            for k in 0..classes {
                let residual = if k == target { 1.0 } else { 0.0 } - p[k];
                let curvature = p[k] * (1.0 - p[k]);
                for j in 0..dim {
                    let i = k * dim + j;
                    let grad = residual * x[j] - prior_precisions[i] * (weights[i] - prior_means[i]);
                    let hess = prior_precisions[i] + curvature * x_sq[j];
                    weights[i] += grad / hess;
                }
            }
        }

        let mut p = logits(&weights, &x, classes);
        softmax_in_place(&mut p);
        let mut precisions = prior_precisions;
        for k in 0..classes {
            let curvature = p[k] * (1.0 - p[k]);
            for j in 0..dim {
                precisions[k * dim + j] += curvature * x_sq[j];
            }
        }

        let finite = weights.iter().chain(precisions.iter()).all(|v| v.is_finite())
            && precisions.iter().all(|q| *q > 0.0);
        if !finite || !loss.is_finite() {
            return Err(ClassifierError::InvalidInput(
                "observation drives the posterior to non-finite values".to_string(),
            ));
        }

        Ok(Proposal {
            means: weights,
            precisions,
            loss,
        })
    }

    /// Replace the parameters with a proposal built from this posterior
    pub fn commit(&mut self, proposal: Proposal) {
        debug_assert_eq!(proposal.means.len() % self.dim, 0);
        self.means = proposal.means;
        self.precisions = proposal.precisions;
    }

    /// Per-class distribution of the score `w_k . x` for one input
    ///
    /// With independent Gaussian weights the score is itself Gaussian with
    /// mean `m_k . x` and variance `sum_j x_j^2 / q_kj`, so sampling scores
    /// is equivalent to sampling the full weight matrix and scoring it.
    /// Fails with `InvalidInput` when either moment is not finite.
    pub fn score_distribution(&self, features: &FeatureVector) -> Result<Vec<ScoreDistribution>> {
        (0..self.classes())
            .map(|k| {
                let mean = features.score(self.mean(k));
                let variance: f64 = features
                    .with_bias()
                    .zip(self.precision(k))
                    .map(|(x, q)| x * x / q)
                    .sum();
                if !(mean.is_finite() && variance.is_finite()) {
                    return Err(ClassifierError::InvalidInput(format!(
                        "score of class {} is not finite for these features",
                        k
                    )));
                }
                Ok(ScoreDistribution {
                    mean,
                    std_dev: variance.sqrt(),
                })
            })
            .collect()
    }
}

/// Gaussian marginal of one class score
#[derive(Debug, Clone, Copy)]
pub struct ScoreDistribution {
    pub mean: f64,
    pub std_dev: f64,
}

impl ScoreDistribution {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let z: f64 = rng.sample(StandardNormal);
        self.mean + self.std_dev * z
    }
}

fn logits(weights: &[f64], x: &[f64], classes: usize) -> Vec<f64> {
    let dim = x.len();
    (0..classes)
        .map(|k| {
            weights[k * dim..(k + 1) * dim]
                .iter()
                .zip(x)
                .map(|(w, v)| w * v)
                .sum()
        })
        .collect()
}

/// Numerically stable softmax, overwriting scores with probabilities
pub fn softmax_in_place(scores: &mut [f64]) {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut total = 0.0;
    for s in scores.iter_mut() {
        *s = (*s - max).exp();
        total += *s;
    }
    for s in scores.iter_mut() {
        *s /= total;
    }
}

/// Index of the largest value, lowest index on ties
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}
