//! Health and readiness tracking for the classifier agent

use classifier_lib::ModelRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Share of slow predictions above which a model counts as degraded
pub const SLOW_PREDICTION_RATIO: f64 = 0.1;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Still serving, but outside its latency target
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub models: usize,
    pub components: HashMap<String, ComponentHealth>,
}

/// Worst status wins
pub fn overall_status<'a>(statuses: impl IntoIterator<Item = &'a ComponentHealth>) -> ComponentStatus {
    let mut overall = ComponentStatus::Healthy;
    for health in statuses {
        match health.status {
            ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
            ComponentStatus::Degraded => overall = ComponentStatus::Degraded,
            ComponentStatus::Healthy => {}
        }
    }
    overall
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const REGISTRY: &str = "registry";
    pub const PREDICTIONS: &str = "predictions";
}

/// Prediction latency health across every registered model
///
/// Degraded when any model served more than [`SLOW_PREDICTION_RATIO`] of
/// its predictions over the configured slow-prediction threshold.
pub fn prediction_health(registry: &ModelRegistry) -> ComponentHealth {
    let slow: Vec<String> = registry
        .names()
        .into_iter()
        .filter_map(|name| {
            let model = registry.get(&name)?;
            let stats = model.stats();
            if stats.total_predictions == 0 {
                return None;
            }
            let ratio = stats.slow_predictions as f64 / stats.total_predictions as f64;
            (ratio > SLOW_PREDICTION_RATIO).then_some(name)
        })
        .collect();

    if slow.is_empty() {
        ComponentHealth::healthy()
    } else {
        ComponentHealth::degraded(format!("slow predictions on: {}", slow.join(", ")))
    }
}

/// Component health plus the agent's readiness flag
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components
            .write()
            .await
            .insert(name.to_string(), health);
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Registered components merged with live prediction health
    pub async fn health(&self, registry: &ModelRegistry) -> HealthResponse {
        let mut components = self.components.read().await.clone();
        components.insert(
            components::PREDICTIONS.to_string(),
            prediction_health(registry),
        );
        HealthResponse {
            status: overall_status(components.values()),
            models: registry.len(),
            components,
        }
    }

    pub async fn readiness(&self, registry: &ModelRegistry) -> ReadinessResponse {
        if !*self.ready.read().await {
            return ReadinessResponse {
                ready: false,
                reason: Some("Agent not yet initialized".to_string()),
            };
        }
        if self.health(registry).await.status == ComponentStatus::Unhealthy {
            return ReadinessResponse {
                ready: false,
                reason: Some("Critical component unhealthy".to_string()),
            };
        }
        ReadinessResponse {
            ready: true,
            reason: None,
        }
    }
}
