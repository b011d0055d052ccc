//! Model inspection CLI commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, ModelSummary, PosteriorSnapshot};
use crate::output::{
    format_label, format_labels, format_timestamp, print_info, print_json, print_success,
    print_table, print_warning, OutputFormat,
};

/// Row for models table
#[derive(Tabled)]
struct ModelRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Features")]
    features: usize,
    #[tabled(rename = "Classes")]
    classes: String,
    #[tabled(rename = "Updates")]
    updates: u64,
    #[tabled(rename = "Predictions")]
    predictions: u64,
    #[tabled(rename = "Samples")]
    samples: usize,
    #[tabled(rename = "Last Update")]
    last_updated: String,
}

impl From<&ModelSummary> for ModelRow {
    fn from(m: &ModelSummary) -> Self {
        Self {
            name: m.name.clone(),
            features: m.feature_count,
            classes: format_labels(&m.classes),
            updates: m.updates,
            predictions: m.predictions,
            samples: m.default_prediction_samples,
            last_updated: m
                .last_updated_at
                .map(format_timestamp)
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Row for the per-class posterior table
#[derive(Tabled)]
struct ClassRow {
    #[tabled(rename = "Class")]
    label: String,
    #[tabled(rename = "Mean Weights")]
    means: String,
    #[tabled(rename = "Variances")]
    variances: String,
}

fn format_vector(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{:.3}", v)).collect();
    format!("[{}]", parts.join(", "))
}

/// List every registered model
pub async fn list_models(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let models: Vec<ModelSummary> = client.get("api/v1/models").await?;

    match format {
        OutputFormat::Json => print_json(&models)?,
        OutputFormat::Table => {
            if models.is_empty() {
                print_warning("No models found");
                return Ok(());
            }
            print_table(models.iter().map(ModelRow::from).collect::<Vec<_>>());
            println!("\nTotal: {} models", models.len());
        }
    }

    Ok(())
}

/// Show one model, optionally with its learned posterior
pub async fn show_model(
    client: &ApiClient,
    name: &str,
    posterior: bool,
    format: OutputFormat,
) -> Result<()> {
    let summary: ModelSummary = client.get(&format!("api/v1/models/{}", name)).await?;
    let snapshot: Option<PosteriorSnapshot> = if posterior {
        Some(
            client
                .get(&format!("api/v1/models/{}/posterior", name))
                .await?,
        )
    } else {
        None
    };

    match format {
        OutputFormat::Json => {
            let mut value = serde_json::to_value(&summary)?;
            if let Some(snapshot) = &snapshot {
                value["posterior"] = serde_json::to_value(snapshot)?;
            }
            print_json(&value)?;
        }
        OutputFormat::Table => {
            println!("Model: {}", summary.name);
            println!("Features: {}", summary.feature_count);
            println!("Classes: {}", format_labels(&summary.classes));
            println!("Updates: {}", summary.updates);
            println!("Predictions: {}", summary.predictions);
            println!("Default samples: {}", summary.default_prediction_samples);
            println!("Created: {}", format_timestamp(summary.created_at));

            if let Some(snapshot) = snapshot {
                if snapshot.labels.is_empty() {
                    print_info("Model has not learned any class yet");
                    return Ok(());
                }
                println!("\nPosterior (bias weight last):");
                let rows: Vec<ClassRow> = snapshot
                    .labels
                    .iter()
                    .zip(snapshot.means.iter().zip(snapshot.variances.iter()))
                    .map(|(label, (means, variances))| ClassRow {
                        label: format_label(label),
                        means: format_vector(means),
                        variances: format_vector(variances),
                    })
                    .collect();
                print_table(rows);
            }
        }
    }

    Ok(())
}

/// Remove a model from the agent
pub async fn delete_model(client: &ApiClient, name: &str) -> Result<()> {
    client.delete(&format!("api/v1/models/{}", name)).await?;
    print_success(&format!("Model {} deleted", name));
    Ok(())
}
