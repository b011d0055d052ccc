//! Stream operator that trains a model from labeled events

use super::event::{Attribute, AttributeType, AttributeValue, QueryArgument, QueryContext, StreamDefinition, StreamEvent};
use super::params::{self, AttributeRef};
use crate::error::{ClassifierError, Result};
use crate::observability::{ClassifierMetrics, StructuredLogger};
use crate::registry::{ModelHandle, ModelRegistry};
use std::time::Instant;

pub const LOSS_ATTRIBUTE: &str = "loss";

const OPERATOR: &str = "updateBayesianClassification";

/// Per-query update operator; creates its model on first use
///
/// Parameters: `model.name` (constant string), `model.target` (string, int,
/// long or bool attribute), then one numeric stream attribute per feature.
pub struct UpdateOperator {
    model_name: String,
    model: ModelHandle,
    target: AttributeRef,
    features: Vec<AttributeRef>,
    output: Vec<Attribute>,
    metrics: ClassifierMetrics,
    logger: StructuredLogger,
}

impl UpdateOperator {
    pub fn init(
        definition: &StreamDefinition,
        args: &[QueryArgument],
        ctx: &QueryContext,
        registry: &ModelRegistry,
    ) -> Result<Self> {
        let max_params = definition.len() + 1;
        if args.len() < 3 || args.len() > max_params {
            return Err(ClassifierError::config(format!(
                "Invalid number of parameters for {}. This operator expects at least 3 \
                 and at most {} parameters, but found {}",
                OPERATOR,
                max_params,
                args.len()
            )));
        }

        let model_name = params::model_name(&args[0], OPERATOR)?;
        let target = params::attribute_ref(definition, &args[1], "model.target")?;
        if !target.attr_type.is_discrete() {
            return Err(ClassifierError::config(format!(
                "model.target attribute [{}] must be string, int, long or bool but is {:?}",
                target.name, target.attr_type
            )));
        }
        let features = params::feature_refs(definition, &args[2..])?;
        if features.iter().any(|f| f.position == target.position) {
            return Err(ClassifierError::config(format!(
                "model.target attribute [{}] cannot also be a feature",
                target.name
            )));
        }

        let key = ctx.model_key(&model_name);
        let model = registry.get_or_create(&key, features.len());
        if model.feature_count() != features.len() {
            return Err(ClassifierError::config(format!(
                "Model [{}] expects {} features, but the {} specifies {} features",
                model_name,
                model.feature_count(),
                OPERATOR,
                features.len()
            )));
        }

        let metrics = ClassifierMetrics::new();
        metrics.set_models_registered(registry.len());
        let logger = StructuredLogger::new(ctx.app_name.clone());
        logger.log_model_attached(&key, features.len(), OPERATOR);

        Ok(Self {
            model_name,
            model,
            target,
            features,
            output: vec![Attribute::new(LOSS_ATTRIBUTE, AttributeType::Double)],
            metrics,
            logger,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn output_attributes(&self) -> &[Attribute] {
        &self.output
    }

    /// Apply one update per event and append its pre-update loss
    ///
    /// A rejected event leaves the model unchanged and ends the chunk.
    pub fn process(&self, chunk: &mut [StreamEvent]) -> Result<()> {
        for event in chunk.iter_mut() {
            let start = Instant::now();
            let outcome = params::read_label(event, &self.target)
                .and_then(|label| {
                    let features = params::read_features(event, &self.features)?;
                    let outcome = self.model.update(&features, &label)?;
                    if outcome.new_class {
                        self.logger.log_class_added(
                            self.model.name(),
                            &label.to_string(),
                            outcome.classes,
                        );
                    }
                    Ok(outcome)
                })
                .map_err(|e| {
                    self.metrics.inc_update_errors(e.kind());
                    self.logger
                        .log_update_rejected(self.model.name(), e.kind(), &e.to_string());
                    e
                })?;
            self.metrics.observe_update(
                self.model.name(),
                start.elapsed().as_secs_f64(),
                outcome.classes,
            );
            event.append([AttributeValue::Double(outcome.loss)]);
        }
        Ok(())
    }
}

impl std::fmt::Debug for UpdateOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateOperator")
            .field("model", &self.model.name())
            .field("target", &self.target.name)
            .field("features", &self.features.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;

    fn definition() -> StreamDefinition {
        StreamDefinition::new("TrainStream")
            .attribute("x0", AttributeType::Double)
            .attribute("x1", AttributeType::Double)
            .attribute("label", AttributeType::String)
    }

    fn args(model: &str) -> Vec<QueryArgument> {
        vec![
            QueryArgument::constant(AttributeValue::String(model.into())),
            QueryArgument::attribute("label"),
            QueryArgument::attribute("x0"),
            QueryArgument::attribute("x1"),
        ]
    }

    fn event(x0: f64, x1: f64, label: &str) -> StreamEvent {
        StreamEvent::new(
            0,
            vec![
                AttributeValue::Double(x0),
                AttributeValue::Double(x1),
                AttributeValue::String(label.into()),
            ],
        )
    }

    #[test]
    fn test_init_creates_model_under_app_key() {
        let registry = ModelRegistry::default();
        let ctx = QueryContext::new("app");
        let op = UpdateOperator::init(&definition(), &args("model1"), &ctx, &registry).unwrap();
        assert_eq!(op.model_name(), "model1");
        assert_eq!(op.model().name(), "model1.app");
        assert_eq!(op.model().feature_count(), 2);
        assert!(registry.get("model1.app").is_some());
    }

    #[test]
    fn test_training_chunk_appends_loss() {
        let registry = ModelRegistry::default();
        let ctx = QueryContext::new("app");
        let op = UpdateOperator::init(&definition(), &args("m"), &ctx, &registry).unwrap();

        let mut chunk: Vec<StreamEvent> = (0..5)
            .flat_map(|_| [event(1.0, 0.0, "A"), event(0.0, 1.0, "B")])
            .collect();
        op.process(&mut chunk).unwrap();

        assert!(chunk.iter().all(|e| e.data.len() == 4));
        // First event of a fresh model has a single class, so its loss is zero
        assert_eq!(chunk[0].data[3], AttributeValue::Double(0.0));
        assert_eq!(op.model().classes().unwrap(), 2);

        let prediction = op
            .model()
            .predict_with_uncertainty(&FeatureVector::from([1.0, 0.0]), 500)
            .unwrap();
        assert_eq!(prediction.label.to_string(), "A");
    }

    #[test]
    fn test_feature_count_conflict_is_configuration_error() {
        let registry = ModelRegistry::default();
        let ctx = QueryContext::new("app");
        UpdateOperator::init(&definition(), &args("m"), &ctx, &registry).unwrap();

        let fewer = vec![
            QueryArgument::constant(AttributeValue::String("m".into())),
            QueryArgument::attribute("label"),
            QueryArgument::attribute("x0"),
        ];
        let err = UpdateOperator::init(&definition(), &fewer, &ctx, &registry).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("expects 2 features"));
    }

    #[test]
    fn test_rejects_non_discrete_target() {
        let registry = ModelRegistry::default();
        let ctx = QueryContext::new("app");
        let def = StreamDefinition::new("S")
            .attribute("x0", AttributeType::Double)
            .attribute("score", AttributeType::Float);
        let args = vec![
            QueryArgument::constant(AttributeValue::String("m".into())),
            QueryArgument::attribute("score"),
            QueryArgument::attribute("x0"),
        ];
        let err = UpdateOperator::init(&def, &args, &ctx, &registry).unwrap_err();
        assert!(err.is_configuration());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_rejected_event_leaves_model_unchanged() {
        let registry = ModelRegistry::default();
        let ctx = QueryContext::new("app");
        let op = UpdateOperator::init(&definition(), &args("m"), &ctx, &registry).unwrap();
        let mut good = vec![event(1.0, 0.0, "A")];
        op.process(&mut good).unwrap();
        let before = op.model().snapshot().unwrap();

        let mut bad = vec![event(f64::INFINITY, 0.0, "B")];
        let err = op.process(&mut bad).unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidInput(_)));
        assert_eq!(bad[0].data.len(), 3);

        let after = op.model().snapshot().unwrap();
        assert_eq!(before.labels, after.labels);
        assert_eq!(before.means, after.means);
        assert_eq!(after.updates, 1);
    }
}
