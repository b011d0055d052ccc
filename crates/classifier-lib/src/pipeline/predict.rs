//! Stream operator that appends a predicted label and its confidence

use super::event::{Attribute, AttributeType, AttributeValue, QueryArgument, QueryContext, StreamDefinition, StreamEvent};
use super::params::{self, AttributeRef};
use crate::error::{ClassifierError, Result};
use crate::observability::{ClassifierMetrics, StructuredLogger};
use crate::registry::{ModelHandle, ModelRegistry};
use std::sync::Mutex;
use std::time::Instant;
use tracing::debug;

pub const PREDICTION_ATTRIBUTE: &str = "prediction";
pub const CONFIDENCE_ATTRIBUTE: &str = "confidence";

const OPERATOR: &str = "predictBayesianClassification";

/// Per-query predict operator bound to one registered model
///
/// Parameters: `model.name` (constant string), optional `prediction.samples`
/// (constant int), then one numeric stream attribute per model feature.
pub struct PredictOperator {
    model_name: String,
    model: ModelHandle,
    features: Vec<AttributeRef>,
    samples: Option<usize>,
    output: Vec<Attribute>,
    metrics: ClassifierMetrics,
    logger: StructuredLogger,
    // Serializes whole chunks through this operator
    chunk_lock: Mutex<()>,
}

impl PredictOperator {
    pub fn init(
        definition: &StreamDefinition,
        args: &[QueryArgument],
        ctx: &QueryContext,
        registry: &ModelRegistry,
    ) -> Result<Self> {
        let max_params = definition.len() + 2;
        if args.len() < 2 || args.len() > max_params {
            return Err(ClassifierError::config(format!(
                "Invalid number of parameters for {}. This operator expects at least 2 \
                 and at most {} parameters, but found {}",
                OPERATOR,
                max_params,
                args.len()
            )));
        }

        let model_name = params::model_name(&args[0], OPERATOR)?;
        let key = ctx.model_key(&model_name);

        let (samples, feature_args) = match &args[1] {
            QueryArgument::Constant(value) => (Some(params::sample_count(value)?), &args[2..]),
            QueryArgument::Attribute(_) => (None, &args[1..]),
        };
        let features = params::feature_refs(definition, feature_args)?;

        let model = registry
            .get(&key)
            .ok_or_else(|| ClassifierError::ModelNotInitialized { name: key.clone() })?;

        if model.feature_count() != features.len() {
            return Err(ClassifierError::config(format!(
                "Model [{}] expects {} features, but the {} specifies {} features",
                model_name,
                model.feature_count(),
                OPERATOR,
                features.len()
            )));
        }
        if let Some(samples) = samples {
            model.set_default_prediction_samples(samples)?;
        }

        let logger = StructuredLogger::new(ctx.app_name.clone());
        logger.log_model_attached(&key, features.len(), OPERATOR);

        Ok(Self {
            model_name,
            model,
            features,
            samples,
            output: vec![
                Attribute::new(PREDICTION_ATTRIBUTE, AttributeType::String),
                Attribute::new(CONFIDENCE_ATTRIBUTE, AttributeType::Double),
            ],
            metrics: ClassifierMetrics::new(),
            logger,
            chunk_lock: Mutex::new(()),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    /// Attributes appended to every processed event
    pub fn output_attributes(&self) -> &[Attribute] {
        &self.output
    }

    /// Sample count used per event, resolved at call time when not pinned
    pub fn sample_count(&self) -> usize {
        self.samples
            .unwrap_or_else(|| self.model.default_prediction_samples())
    }

    /// Append `prediction` and `confidence` to every event of the chunk
    ///
    /// Stops at the first failing event; events before it keep their
    /// appended outputs.
    pub fn process(&self, chunk: &mut [StreamEvent]) -> Result<()> {
        let _guard = self.chunk_lock.lock()?;
        let samples = self.sample_count();
        for event in chunk.iter_mut() {
            let start = Instant::now();
            let prediction = params::read_features(event, &self.features)
                .and_then(|features| self.model.predict_with_uncertainty(&features, samples))
                .map_err(|e| {
                    self.metrics.inc_prediction_errors(e.kind());
                    e
                })?;
            self.metrics
                .observe_prediction(self.model.name(), start.elapsed().as_secs_f64());

            let label = prediction.label.to_string();
            self.logger
                .log_prediction(self.model.name(), &label, prediction.confidence, samples);
            event.append([
                AttributeValue::String(label),
                AttributeValue::Double(prediction.confidence),
            ]);
        }
        debug!(model = %self.model.name(), events = chunk.len(), "Processed predict chunk");
        Ok(())
    }
}

impl std::fmt::Debug for PredictOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictOperator")
            .field("model", &self.model.name())
            .field("features", &self.features.len())
            .field("samples", &self.samples)
            .finish()
    }
}
