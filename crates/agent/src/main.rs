//! Classifier Agent - streaming Bayesian softmax classification service
//!
//! Hosts one model registry behind an HTTP API and exposes health and
//! Prometheus metrics endpoints.

use anyhow::{Context, Result};
use classifier_agent::{
    api,
    config::AgentConfig,
    health::{components, HealthRegistry},
};
use classifier_lib::{ClassifierMetrics, ModelRegistry, StructuredLogger};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting classifier-agent");

    let config = AgentConfig::load()?;
    info!(
        instance = %config.instance_name,
        prior_precision = config.classifier.prior_precision,
        newton_steps = config.classifier.newton_steps,
        "Agent configured"
    );

    let registry = Arc::new(
        ModelRegistry::new(config.classifier.clone()).context("invalid classifier settings")?,
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::REGISTRY).await;

    let metrics = ClassifierMetrics::new();
    metrics.set_models_registered(0);

    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(AGENT_VERSION, config.api_port);

    let app_state = Arc::new(api::AppState::new(
        Arc::clone(&registry),
        health_registry.clone(),
        metrics,
        logger.clone(),
    ));

    health_registry.set_ready(true).await;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
    };
    api::serve(config.api_port, app_state, shutdown).await?;

    logger.log_shutdown("SIGINT received", registry.len());
    registry.clear();
    info!("Shutting down");

    Ok(())
}
