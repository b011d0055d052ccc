//! Process-wide registry of named models
//!
//! Maps model name to a shared [`SoftmaxClassifier`]. The map is sharded, so
//! creating one model only locks the shard that will hold it and never
//! blocks lookups or predictions on other models. Handles are reference
//! counted and outlive removal from the registry for as long as an operator
//! holds them.

use crate::classifier::{ModelSummary, SoftmaxClassifier};
use crate::config::ClassifierConfig;
use crate::error::{ClassifierError, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Shared handle to a registered model
pub type ModelHandle = Arc<SoftmaxClassifier>;

/// Registry of active models keyed by name
pub struct ModelRegistry {
    models: DashMap<String, ModelHandle>,
    config: ClassifierConfig,
}

impl ModelRegistry {
    /// Create a registry whose new models use `config`
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            models: DashMap::new(),
            config,
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Return the model for `name`, creating it with `feature_count` if absent
    ///
    /// When two callers race to create the same name the first insert wins
    /// and both receive that model. A caller whose `feature_count` differs
    /// from the returned model's must treat it as a configuration error.
    pub fn get_or_create(&self, name: &str, feature_count: usize) -> ModelHandle {
        if let Some(existing) = self.models.get(name) {
            return Arc::clone(existing.value());
        }
        let entry = self.models.entry(name.to_string()).or_insert_with(|| {
            info!(model = %name, feature_count, "Creating model");
            Arc::new(SoftmaxClassifier::new(
                name,
                feature_count,
                self.config.clone(),
            ))
        });
        Arc::clone(entry.value())
    }

    /// Look up an existing model; never creates one
    pub fn get(&self, name: &str) -> Option<ModelHandle> {
        self.models.get(name).map(|r| Arc::clone(r.value()))
    }

    /// Look up an existing model, failing with `ModelNotInitialized`
    pub fn require(&self, name: &str) -> Result<ModelHandle> {
        self.get(name)
            .ok_or_else(|| ClassifierError::ModelNotInitialized {
                name: name.to_string(),
            })
    }

    /// Drop a model from the registry; existing handles stay usable
    pub fn remove(&self, name: &str) -> Option<ModelHandle> {
        debug!(model = %name, "Removing model");
        self.models.remove(name).map(|(_, v)| v)
    }

    /// Registry-wide teardown
    pub fn clear(&self) {
        info!(models = self.models.len(), "Clearing model registry");
        self.models.clear();
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Sorted model names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    /// Summaries of every model, sorted by name
    pub fn summaries(&self) -> Result<Vec<ModelSummary>> {
        // Collect handles first so no shard guard is held while model locks are taken
        let handles: Vec<ModelHandle> = self.models.iter().map(|r| Arc::clone(r.value())).collect();
        let mut summaries = handles
            .iter()
            .map(|m| m.summary())
            .collect::<Result<Vec<_>>>()?;
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self {
            models: DashMap::new(),
            config: ClassifierConfig::default(),
        }
    }
}
