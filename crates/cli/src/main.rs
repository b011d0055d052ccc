//! Bayesian Streaming Classifier CLI
//!
//! A command-line tool for training, querying and inspecting models hosted
//! by the classifier agent.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::classify::{self, LabelType};
use commands::{health, models};

/// Bayesian Streaming Classifier CLI
#[derive(Parser)]
#[command(name = "bsc")]
#[command(author, version, about = "CLI for the Bayesian Streaming Classifier agent", long_about = None)]
pub struct Cli {
    /// Agent URL (can also be set via BSC_API_URL env var)
    #[arg(long, env = "BSC_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered models
    Models,

    /// Show one model
    Show {
        /// Model name
        name: String,

        /// Also print per-class posterior means and variances
        #[arg(long)]
        posterior: bool,
    },

    /// Train a model with one labeled observation
    Update {
        /// Model name (created on first update)
        name: String,

        /// Class label of the observation
        #[arg(long, short)]
        label: String,

        /// How to interpret the label
        #[arg(long, value_enum, default_value = "text")]
        label_type: LabelType,

        /// Comma-separated feature values, e.g. 1,0
        #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
        features: Vec<f64>,
    },

    /// Predict a label with confidence
    Predict {
        /// Model name
        name: String,

        /// Comma-separated feature values, e.g. 1,0
        #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
        features: Vec<f64>,

        /// Number of posterior samples (model default if omitted)
        #[arg(long, short)]
        samples: Option<usize>,
    },

    /// Delete a model
    Delete {
        /// Model name
        name: String,
    },

    /// Show agent health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize client
    let client = client::ApiClient::new(&cli.api_url)?;

    // Execute command
    match cli.command {
        Commands::Models => models::list_models(&client, cli.format).await?,
        Commands::Show { name, posterior } => {
            models::show_model(&client, &name, posterior, cli.format).await?;
        }
        Commands::Update {
            name,
            label,
            label_type,
            features,
        } => {
            let label = classify::parse_label(&label, label_type)?;
            classify::update(&client, &name, label, features, cli.format).await?;
        }
        Commands::Predict {
            name,
            features,
            samples,
        } => {
            classify::predict(&client, &name, features, samples, cli.format).await?;
        }
        Commands::Delete { name } => models::delete_model(&client, &name).await?,
        Commands::Health => health::show_health(&client, cli.format).await?,
    }

    Ok(())
}
