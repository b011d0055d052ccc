//! Online Bayesian softmax classifier
//!
//! A [`SoftmaxClassifier`] owns one model: its label set and its posterior.
//! All mutable state sits behind a single `RwLock`, so an update is applied
//! atomically with respect to every prediction on the same model while
//! predictions run concurrently with each other.

mod output;
mod sampling;

pub use output::{ModelSummary, PosteriorSnapshot, Prediction, UpdateOutcome};
pub use sampling::{draw_votes, VoteTally};

use crate::config::{ClassifierConfig, ConfidenceMetric, MAX_PREDICTION_SAMPLES};
use crate::error::{ClassifierError, Result};
use crate::features::FeatureVector;
use crate::labels::{Label, LabelSet};
use crate::posterior::Posterior;
use rand::Rng;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Learned state guarded by the model lock
#[derive(Debug)]
struct ModelState {
    labels: LabelSet,
    posterior: Posterior,
    updates: u64,
    last_updated_at: Option<i64>,
}

/// A named, continuously updatable Bayesian multinomial logistic regression
pub struct SoftmaxClassifier {
    name: String,
    feature_count: usize,
    config: ClassifierConfig,
    state: RwLock<ModelState>,
    default_samples: AtomicUsize,
    prediction_count: AtomicU64,
    slow_prediction_count: AtomicU64,
    created_at: i64,
}

impl SoftmaxClassifier {
    pub fn new(name: impl Into<String>, feature_count: usize, config: ClassifierConfig) -> Self {
        let state = ModelState {
            labels: LabelSet::new(),
            posterior: Posterior::new(feature_count, config.prior_precision),
            updates: 0,
            last_updated_at: None,
        };
        Self {
            name: name.into(),
            feature_count,
            default_samples: AtomicUsize::new(config.default_prediction_samples),
            config,
            state: RwLock::new(state),
            prediction_count: AtomicU64::new(0),
            slow_prediction_count: AtomicU64::new(0),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Number of known classes
    pub fn classes(&self) -> Result<usize> {
        Ok(self.state.read()?.labels.len())
    }

    /// A model becomes active with its first successful update
    pub fn is_active(&self) -> Result<bool> {
        Ok(!self.state.read()?.labels.is_empty())
    }

    pub fn default_prediction_samples(&self) -> usize {
        self.default_samples.load(Ordering::Relaxed)
    }

    pub fn set_default_prediction_samples(&self, samples: usize) -> Result<()> {
        check_sample_count(samples)?;
        self.default_samples.store(samples, Ordering::Relaxed);
        Ok(())
    }

    /// Incorporate one labeled observation into the posterior
    ///
    /// Fails with `DimensionMismatch` or `InvalidInput` without touching the
    /// model. An unseen label appends a new class.
    pub fn update(&self, features: &FeatureVector, label: &Label) -> Result<UpdateOutcome> {
        features.check_dimension(self.feature_count)?;
        features.check_bounded()?;

        let mut state = self.state.write()?;
        let (target, new_class) = match state.labels.index_of(label) {
            Some(idx) => (idx, false),
            None => (state.labels.len(), true),
        };

        let proposal = state
            .posterior
            .propose(features, target, self.config.newton_steps)
            .map_err(|e| {
                warn!(model = %self.name, label = %label, error = %e, "Rejected update");
                e
            })?;
        let loss = proposal.loss;
        state.posterior.commit(proposal);

        if new_class {
            state.labels.intern(label);
            info!(
                model = %self.name,
                label = %label,
                class_index = target,
                classes = state.labels.len(),
                "New class added to model"
            );
        }
        state.updates += 1;
        state.last_updated_at = Some(chrono::Utc::now().timestamp());

        Ok(UpdateOutcome {
            class_index: target,
            new_class,
            loss,
            classes: state.labels.len(),
        })
    }

    /// Predict with the model's default sample count
    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction> {
        self.predict_with_uncertainty(features, self.default_prediction_samples())
    }

    /// Predict a label by voting over `sample_count` posterior draws
    pub fn predict_with_uncertainty(
        &self,
        features: &FeatureVector,
        sample_count: usize,
    ) -> Result<Prediction> {
        self.predict_with_rng(features, sample_count, &mut rand::rng())
    }

    /// Same as [`predict_with_uncertainty`](Self::predict_with_uncertainty)
    /// with a caller-supplied random source
    pub fn predict_with_rng<R: Rng + ?Sized>(
        &self,
        features: &FeatureVector,
        sample_count: usize,
        rng: &mut R,
    ) -> Result<Prediction> {
        features.check_dimension(self.feature_count)?;
        features.check_bounded()?;
        check_sample_count(sample_count)?;

        let start = Instant::now();
        let (tally, label) = {
            let state = self.state.read()?;
            if state.labels.is_empty() {
                return Err(ClassifierError::ModelNotInitialized {
                    name: self.name.clone(),
                });
            }
            let scores = state.posterior.score_distribution(features)?;
            let tally = draw_votes(&scores, sample_count, rng);
            let label = state.labels.label(tally.winner)?.clone();
            (tally, label)
        };

        if !(tally.mean_probability.is_finite() && tally.std_deviation.is_finite()) {
            return Err(ClassifierError::InvalidInput(
                "posterior draws produced non-finite probabilities".to_string(),
            ));
        }
        let confidence = match self.config.confidence_metric {
            ConfidenceMetric::MeanProbability => tally.mean_probability,
            ConfidenceMetric::StdDeviation => tally.std_deviation,
        }
        .clamp(0.0, 1.0);

        self.prediction_count.fetch_add(1, Ordering::Relaxed);
        let elapsed = start.elapsed();
        if elapsed > self.config.slow_prediction_threshold {
            self.slow_prediction_count.fetch_add(1, Ordering::Relaxed);
            warn!(
                model = %self.name,
                elapsed_ms = elapsed.as_millis(),
                samples = sample_count,
                "Prediction exceeded {}ms target",
                self.config.slow_prediction_threshold.as_millis()
            );
        } else {
            debug!(model = %self.name, elapsed_us = elapsed.as_micros(), "Prediction completed");
        }

        Ok(Prediction {
            label,
            class_index: tally.winner,
            confidence,
            vote_share: tally.vote_share(),
            samples: sample_count,
        })
    }

    /// Decode a class index into its label
    pub fn label_of(&self, index: usize) -> Result<Label> {
        Ok(self.state.read()?.labels.label(index)?.clone())
    }

    /// Copy labels and posterior parameters under the read lock
    pub fn snapshot(&self) -> Result<PosteriorSnapshot> {
        let state = self.state.read()?;
        let classes = state.posterior.classes();
        Ok(PosteriorSnapshot {
            labels: state.labels.to_vec(),
            means: (0..classes)
                .map(|k| state.posterior.mean(k).to_vec())
                .collect(),
            variances: (0..classes).map(|k| state.posterior.variance(k)).collect(),
            updates: state.updates,
        })
    }

    pub fn summary(&self) -> Result<ModelSummary> {
        let state = self.state.read()?;
        Ok(ModelSummary {
            name: self.name.clone(),
            feature_count: self.feature_count,
            classes: state.labels.to_vec(),
            updates: state.updates,
            predictions: self.prediction_count.load(Ordering::Relaxed),
            default_prediction_samples: self.default_prediction_samples(),
            created_at: self.created_at,
            last_updated_at: state.last_updated_at,
        })
    }

    pub fn stats(&self) -> ClassifierStats {
        ClassifierStats {
            total_predictions: self.prediction_count.load(Ordering::Relaxed),
            slow_predictions: self.slow_prediction_count.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for SoftmaxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftmaxClassifier")
            .field("name", &self.name)
            .field("feature_count", &self.feature_count)
            .finish_non_exhaustive()
    }
}

fn check_sample_count(samples: usize) -> Result<()> {
    if samples == 0 || samples > MAX_PREDICTION_SAMPLES {
        return Err(ClassifierError::InvalidInput(format!(
            "prediction sample count must be between 1 and {}, got {}",
            MAX_PREDICTION_SAMPLES, samples
        )));
    }
    Ok(())
}

/// Prediction counters for one model
#[derive(Debug, Clone)]
pub struct ClassifierStats {
    pub total_predictions: u64,
    pub slow_predictions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn trained_model() -> SoftmaxClassifier {
        let model = SoftmaxClassifier::new("m", 2, ClassifierConfig::default());
        let a = FeatureVector::from([1.0, 0.0]);
        let b = FeatureVector::from([0.0, 1.0]);
        for _ in 0..50 {
            model.update(&a, &"A".into()).unwrap();
            model.update(&b, &"B".into()).unwrap();
            model.update(&a, &"A".into()).unwrap();
        }
        model
    }

    #[test]
    fn test_trained_model_predicts_a_with_high_confidence() {
        let model = trained_model();
        let prediction = model
            .predict_with_uncertainty(&FeatureVector::from([1.0, 0.0]), 1000)
            .unwrap();
        assert_eq!(prediction.label, Label::from("A"));
        assert_eq!(prediction.class_index, 0);
        assert!(prediction.confidence > 0.7, "confidence {}", prediction.confidence);
        assert_eq!(prediction.samples, 1000);

        let other = model
            .predict_with_uncertainty(&FeatureVector::from([0.0, 1.0]), 1000)
            .unwrap();
        assert_eq!(other.label, Label::from("B"));
    }

    #[test]
    fn test_dimension_mismatch_leaves_state_unchanged() {
        let model = trained_model();
        let before = model.snapshot().unwrap();

        let err = model
            .update(&FeatureVector::from([1.0, 0.0, 2.0]), &"A".into())
            .unwrap_err();
        assert!(matches!(
            err,
            ClassifierError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        let err = model
            .predict_with_uncertainty(&FeatureVector::from([1.0]), 10)
            .unwrap_err();
        assert!(matches!(err, ClassifierError::DimensionMismatch { .. }));

        let after = model.snapshot().unwrap();
        assert_eq!(before.means, after.means);
        assert_eq!(before.updates, after.updates);
    }

    #[test]
    fn test_nan_update_rejected_and_predictions_unchanged() {
        let model = trained_model();
        let x = FeatureVector::from([1.0, 0.0]);
        let before = model.predict_with_rng(&x, 500, &mut StdRng::seed_from_u64(9)).unwrap();
        let snapshot = model.snapshot().unwrap();

        let err = model
            .update(&FeatureVector::from([f64::NAN, 1.0]), &"A".into())
            .unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidInput(_)));

        let after = model.predict_with_rng(&x, 500, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(before, after);
        assert_eq!(snapshot.variances, model.snapshot().unwrap().variances);
    }

    #[test]
    fn test_failed_update_with_new_label_does_not_grow_label_set() {
        let model = trained_model();
        let result = model.update(&FeatureVector::from([f64::INFINITY, 0.0]), &"C".into());
        assert!(result.is_err());
        assert_eq!(model.classes().unwrap(), 2);
    }

    #[test]
    fn test_single_sample_prediction() {
        let model = trained_model();
        let prediction = model
            .predict_with_uncertainty(&FeatureVector::from([0.3, 0.7]), 1)
            .unwrap();
        assert!((0.0..=1.0).contains(&prediction.confidence));
        assert_eq!(prediction.vote_share, 1.0);
        assert!(prediction.class_index < 2);
    }

    #[test]
    fn test_zero_samples_rejected() {
        let model = trained_model();
        let err = model
            .predict_with_uncertainty(&FeatureVector::from([1.0, 0.0]), 0)
            .unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidInput(_)));
        assert!(model.set_default_prediction_samples(0).is_err());
    }

    #[test]
    fn test_oversized_sample_count_rejected() {
        let model = trained_model();
        let x = FeatureVector::from([1.0, 0.0]);
        for samples in [MAX_PREDICTION_SAMPLES + 1, usize::MAX / 2 + 1] {
            let err = model.predict_with_uncertainty(&x, samples).unwrap_err();
            assert!(matches!(err, ClassifierError::InvalidInput(_)));
        }
        assert!(model
            .set_default_prediction_samples(MAX_PREDICTION_SAMPLES + 1)
            .is_err());
        assert!(model.predict_with_uncertainty(&x, MAX_PREDICTION_SAMPLES).is_ok());
    }

    #[test]
    fn test_huge_features_rejected_by_predict_and_update() {
        let model = trained_model();
        let before = model.snapshot().unwrap();
        let err = model
            .predict_with_uncertainty(&FeatureVector::from([0.0, 1e200]), 1000)
            .unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidInput(_)));
        let err = model
            .update(&FeatureVector::from([0.0, 1e200]), &"A".into())
            .unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidInput(_)));
        assert_eq!(before.means, model.snapshot().unwrap().means);

        let one = SoftmaxClassifier::new("one", 1, ClassifierConfig::default());
        for _ in 0..20 {
            one.update(&FeatureVector::from([1.0]), &"A".into()).unwrap();
            one.update(&FeatureVector::from([-1.0]), &"B".into()).unwrap();
        }
        let err = one
            .predict_with_uncertainty(&FeatureVector::from([-2e154]), 1000)
            .unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidInput(_)));

        let far = one
            .predict_with_uncertainty(&FeatureVector::from([-1e6]), 1000)
            .unwrap();
        assert_eq!(far.label, Label::from("B"));
        assert!((0.0..=1.0).contains(&far.confidence));
    }

    #[test]
    fn test_prediction_before_first_update() {
        let model = SoftmaxClassifier::new("fresh", 3, ClassifierConfig::default());
        assert!(!model.is_active().unwrap());
        let err = model.predict(&FeatureVector::from([1.0, 2.0, 3.0])).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_label_set_grows_monotonically() {
        let model = SoftmaxClassifier::new("grow", 1, ClassifierConfig::default());
        let x = FeatureVector::from([0.5]);
        let mut previous = 0;
        for label in ["x", "y", "x", "z", "y", "z", "w"] {
            let outcome = model.update(&x, &label.into()).unwrap();
            let classes = model.classes().unwrap();
            assert!(classes >= previous);
            assert_eq!(outcome.new_class, classes > previous);
            previous = classes;
        }
        assert_eq!(previous, 4);
        assert_eq!(model.label_of(3).unwrap(), Label::from("w"));
        assert!(matches!(
            model.label_of(4),
            Err(ClassifierError::UnknownClassIndex { index: 4, classes: 4 })
        ));
    }

    #[test]
    fn test_winner_stable_across_resampling() {
        let model = trained_model();
        let x = FeatureVector::from([0.9, 0.2]);
        let first = model.predict_with_uncertainty(&x, 2000).unwrap();
        for _ in 0..5 {
            let again = model.predict_with_uncertainty(&x, 2000).unwrap();
            assert_eq!(again.label, first.label);
        }
    }

    #[test]
    fn test_std_deviation_metric() {
        let config = ClassifierConfig {
            confidence_metric: ConfidenceMetric::StdDeviation,
            ..Default::default()
        };
        let model = SoftmaxClassifier::new("std", 1, config);
        model.update(&FeatureVector::from([1.0]), &"a".into()).unwrap();
        model.update(&FeatureVector::from([-1.0]), &"b".into()).unwrap();
        let single = model
            .predict_with_uncertainty(&FeatureVector::from([1.0]), 1)
            .unwrap();
        assert_eq!(single.confidence, 0.0);
        let many = model
            .predict_with_uncertainty(&FeatureVector::from([1.0]), 500)
            .unwrap();
        assert!(many.confidence > 0.0 && many.confidence < 0.5);
    }

    #[test]
    fn test_variance_shrinks_with_evidence() {
        let model = SoftmaxClassifier::new("shrink", 2, ClassifierConfig::default());
        let a = FeatureVector::from([1.0, 0.0]);
        let b = FeatureVector::from([0.0, 1.0]);
        model.update(&a, &"A".into()).unwrap();
        model.update(&b, &"B".into()).unwrap();
        let early = model.snapshot().unwrap();
        for _ in 0..30 {
            model.update(&a, &"A".into()).unwrap();
        }
        let late = model.snapshot().unwrap();
        // Feature 0 of class A only saw more evidence
        assert!(late.variances[0][0] < early.variances[0][0]);
        // Feature 1 saw none of the new observations
        assert_eq!(late.variances[0][1], early.variances[0][1]);
    }

    #[test]
    fn test_concurrent_updates_are_atomic() {
        // With two classes the softmax gradient is antisymmetric, so every
        // fully applied update keeps the class means negated copies of each
        // other. A torn read would break that.
        let model = Arc::new(SoftmaxClassifier::new("atomic", 2, ClassifierConfig::default()));
        model.update(&FeatureVector::from([1.0, 0.0]), &"A".into()).unwrap();
        model.update(&FeatureVector::from([0.0, 1.0]), &"B".into()).unwrap();

        std::thread::scope(|scope| {
            for w in 0..4 {
                let model = Arc::clone(&model);
                scope.spawn(move || {
                    for i in 0..200 {
                        let (x, label) = if (i + w) % 2 == 0 {
                            ([1.0, 0.2], "A")
                        } else {
                            ([0.1, 1.0], "B")
                        };
                        model.update(&FeatureVector::from(x), &label.into()).unwrap();
                    }
                });
            }
            for _ in 0..4 {
                let model = Arc::clone(&model);
                scope.spawn(move || {
                    for _ in 0..200 {
                        let snap = model.snapshot().unwrap();
                        for j in 0..3 {
                            let sum = snap.means[0][j] + snap.means[1][j];
                            assert!(sum.abs() < 1e-6, "torn posterior: {:?}", snap.means);
                        }
                        model
                            .predict_with_uncertainty(&FeatureVector::from([1.0, 0.0]), 20)
                            .unwrap();
                    }
                });
            }
        });

        assert_eq!(model.snapshot().unwrap().updates, 2 + 4 * 200);
        assert_eq!(model.stats().total_predictions, 4 * 200);
    }
}
