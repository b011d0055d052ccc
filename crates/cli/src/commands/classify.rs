//! Training and prediction CLI commands

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde_json::Value;

use crate::client::{ApiClient, PredictRequest, Prediction, UpdateOutcome, UpdateRequest};
use crate::output::{color_confidence, format_label, print_info, print_json, print_success, OutputFormat};

/// How the `--label` argument is sent to the agent
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LabelType {
    #[default]
    Text,
    Int,
    Bool,
}

/// Parse a raw label argument into its JSON form
pub fn parse_label(raw: &str, label_type: LabelType) -> Result<Value> {
    Ok(match label_type {
        LabelType::Text => Value::from(raw),
        LabelType::Int => Value::from(
            raw.parse::<i64>()
                .with_context(|| format!("Label '{}' is not an integer", raw))?,
        ),
        LabelType::Bool => Value::from(
            raw.parse::<bool>()
                .with_context(|| format!("Label '{}' is not true or false", raw))?,
        ),
    })
}

/// Send one labeled observation to a model, creating it if needed
pub async fn update(
    client: &ApiClient,
    name: &str,
    label: Value,
    features: Vec<f64>,
    format: OutputFormat,
) -> Result<()> {
    let request = UpdateRequest { features, label };
    let outcome: UpdateOutcome = client
        .post(&format!("api/v1/models/{}/update", name), &request)
        .await?;

    match format {
        OutputFormat::Json => print_json(&outcome)?,
        OutputFormat::Table => {
            print_success(&format!(
                "Model {} updated with label {}",
                name,
                format_label(&request.label)
            ));
            if outcome.new_class {
                print_info(&format!("New class added, model now knows {}", outcome.classes));
            }
            println!("Loss: {:.4}", outcome.loss);
        }
    }

    Ok(())
}

/// Predict a label for one feature vector
pub async fn predict(
    client: &ApiClient,
    name: &str,
    features: Vec<f64>,
    samples: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let request = PredictRequest { features, samples };
    let prediction: Prediction = client
        .post(&format!("api/v1/models/{}/predict", name), &request)
        .await?;

    match format {
        OutputFormat::Json => print_json(&prediction)?,
        OutputFormat::Table => {
            println!("Prediction: {}", format_label(&prediction.label));
            println!("Confidence: {}", color_confidence(prediction.confidence));
            println!(
                "Votes: {:.1}% of {} samples",
                prediction.vote_share * 100.0,
                prediction.samples
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label() {
        assert_eq!(parse_label("spam", LabelType::Text).unwrap(), Value::from("spam"));
        assert_eq!(parse_label("7", LabelType::Text).unwrap(), Value::from("7"));
        assert_eq!(parse_label("7", LabelType::Int).unwrap(), Value::from(7));
        assert_eq!(parse_label("true", LabelType::Bool).unwrap(), Value::from(true));
        assert!(parse_label("seven", LabelType::Int).is_err());
    }
}
