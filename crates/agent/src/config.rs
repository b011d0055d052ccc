//! Agent configuration

use anyhow::{Context, Result};
use classifier_lib::ClassifierConfig;
use serde::Deserialize;

/// Optional config file looked up in the working directory
pub const CONFIG_FILE: &str = "classifier-agent";

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Name this agent reports in logs
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// HTTP port for the model API, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Settings for every model the agent creates
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "classifier-agent".to_string())
}

fn default_api_port() -> u16 {
    8080
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Load from `classifier-agent.toml` (if present) and `AGENT_*` variables
    ///
    /// Nested classifier settings use a double underscore, e.g.
    /// `AGENT_CLASSIFIER__PRIOR_PRECISION=2.0`.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(
                config::Environment::with_prefix("AGENT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read agent configuration")?;

        let config: AgentConfig = config
            .try_deserialize()
            .context("invalid agent configuration")?;
        config.classifier.validate()?;
        Ok(config)
    }
}
