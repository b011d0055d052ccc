//! Validation of operator parameters against the input stream schema

use super::event::{AttributeType, AttributeValue, QueryArgument, StreamDefinition, StreamEvent};
use crate::config::MAX_PREDICTION_SAMPLES;
use crate::error::{ClassifierError, Result};
use crate::features::FeatureVector;
use crate::labels::Label;

/// Position of a validated stream attribute
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRef {
    pub name: String,
    pub position: usize,
    pub attr_type: AttributeType,
}

/// Read the `model.name` parameter, which must be a constant string
pub fn model_name(arg: &QueryArgument, operator: &str) -> Result<String> {
    match arg {
        QueryArgument::Constant(AttributeValue::String(name)) if !name.is_empty() => {
            Ok(name.clone())
        }
        QueryArgument::Constant(AttributeValue::String(_)) => Err(ClassifierError::config(
            format!("Parameter model.name of {} must not be empty", operator),
        )),
        QueryArgument::Constant(other) => Err(ClassifierError::config(format!(
            "Invalid parameter type found for the model.name argument of {}, \
             required string but found {:?}",
            operator,
            other.attribute_type()
        ))),
        other => Err(ClassifierError::config(format!(
            "Parameter model.name of {} must be a constant but found a {}",
            operator,
            other.describe()
        ))),
    }
}

/// Read `prediction.samples`; the caller has already seen it is a constant
pub fn sample_count(value: &AttributeValue) -> Result<usize> {
    let count = match value {
        AttributeValue::Int(v) => *v as i64,
        AttributeValue::Long(v) => *v,
        other => {
            return Err(ClassifierError::config(format!(
                "Invalid parameter type found for the prediction.samples argument. \
                 Expected int but found {:?}",
                other.attribute_type()
            )))
        }
    };
    if count <= 0 {
        return Err(ClassifierError::config(format!(
            "Invalid parameter value found for the prediction.samples argument. \
             Expected a value greater than zero, but found: {}",
            count
        )));
    }
    if count as u64 > MAX_PREDICTION_SAMPLES as u64 {
        return Err(ClassifierError::config(format!(
            "Invalid parameter value found for the prediction.samples argument. \
             Expected at most {}, but found: {}",
            MAX_PREDICTION_SAMPLES, count
        )));
    }
    Ok(count as usize)
}

/// Resolve an attribute reference against the stream definition
pub fn attribute_ref(
    definition: &StreamDefinition,
    arg: &QueryArgument,
    parameter: &str,
) -> Result<AttributeRef> {
    let name = match arg {
        QueryArgument::Attribute(name) => name,
        other => {
            return Err(ClassifierError::config(format!(
                "Parameter {} must be an attribute of the stream but found a {}",
                parameter,
                other.describe()
            )))
        }
    };
    let (position, attribute) = definition.get(name).ok_or_else(|| {
        ClassifierError::config(format!(
            "Attribute [{}] given as {} is not defined in stream [{}]",
            name, parameter, definition.id
        ))
    })?;
    Ok(AttributeRef {
        name: name.clone(),
        position,
        attr_type: attribute.attr_type,
    })
}

/// Validate that every argument is a numeric attribute of the stream
pub fn feature_refs(definition: &StreamDefinition, args: &[QueryArgument]) -> Result<Vec<AttributeRef>> {
    if args.is_empty() {
        return Err(ClassifierError::config(
            "At least one model.features attribute is required",
        ));
    }
    args.iter()
        .map(|arg| {
            let feature = attribute_ref(definition, arg, "model.features")?;
            if !feature.attr_type.is_numeric() {
                return Err(ClassifierError::config(format!(
                    "model.features attribute [{}] must be numeric but is {:?}",
                    feature.name, feature.attr_type
                )));
            }
            Ok(feature)
        })
        .collect()
}

/// Build the feature vector for one event
pub fn read_features(event: &StreamEvent, features: &[AttributeRef]) -> Result<FeatureVector> {
    features
        .iter()
        .map(|f| {
            event
                .data
                .get(f.position)
                .and_then(AttributeValue::as_f64)
                .ok_or_else(|| {
                    ClassifierError::InvalidInput(format!(
                        "feature [{}] is missing or not numeric",
                        f.name
                    ))
                })
        })
        .collect::<Result<Vec<f64>>>()
        .map(FeatureVector::new)
}

pub fn read_label(event: &StreamEvent, target: &AttributeRef) -> Result<Label> {
    event
        .data
        .get(target.position)
        .and_then(AttributeValue::as_label)
        .ok_or_else(|| {
            ClassifierError::InvalidInput(format!(
                "target [{}] is missing or not a discrete value",
                target.name
            ))
        })
}
