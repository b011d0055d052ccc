//! HTTP API for model training, prediction, health checks and metrics

use crate::health::{ComponentStatus, HealthRegistry};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use classifier_lib::{
    ClassifierError, ClassifierMetrics, ErrorKind, FeatureVector, Label, ModelRegistry,
    ModelSummary, PosteriorSnapshot, Prediction, StructuredLogger, UpdateOutcome,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub health_registry: HealthRegistry,
    pub metrics: ClassifierMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        registry: Arc<ModelRegistry>,
        health_registry: HealthRegistry,
        metrics: ClassifierMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            registry,
            health_registry,
            metrics,
            logger,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub features: Vec<f64>,
    pub label: Label,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub features: Vec<f64>,
    /// Posterior draws; the model default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Request failure rendered as a JSON error response
#[derive(Debug)]
pub enum ApiError {
    Classifier(ClassifierError),
    /// A blocking classifier task panicked or was cancelled
    Task(JoinError),
}

impl From<ClassifierError> for ApiError {
    fn from(e: ClassifierError) -> Self {
        ApiError::Classifier(e)
    }
}

impl From<JoinError> for ApiError {
    fn from(e: JoinError) -> Self {
        ApiError::Task(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        let err = match self {
            ApiError::Classifier(err) => err,
            ApiError::Task(_) => return StatusCode::INTERNAL_SERVER_ERROR,
        };
        match (err, err.kind()) {
            (ClassifierError::ModelNotInitialized { .. }, _) => StatusCode::NOT_FOUND,
            (_, ErrorKind::Configuration) => StatusCode::BAD_REQUEST,
            (_, ErrorKind::DimensionMismatch)
            | (_, ErrorKind::InvalidInput)
            | (_, ErrorKind::UnknownClassIndex) => StatusCode::UNPROCESSABLE_ENTITY,
            (_, ErrorKind::Internal) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Classifier(err) => err.kind(),
            ApiError::Task(_) => ErrorKind::Internal,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Classifier(err) => write!(f, "{}", err),
            ApiError::Task(err) => write!(f, "classifier task failed: {}", err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        let body = ErrorBody {
            error: self.kind().as_str().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health(&state.registry).await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness(&state.registry).await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn list_models(State(state): State<Arc<AppState>>) -> ApiResult<Vec<ModelSummary>> {
    Ok(Json(state.registry.summaries()?))
}

async fn get_model(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<ModelSummary> {
    Ok(Json(state.registry.require(&name)?.summary()?))
}

async fn get_posterior(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<PosteriorSnapshot> {
    Ok(Json(state.registry.require(&name)?.snapshot()?))
}

async fn delete_model(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .registry
        .remove(&name)
        .ok_or(ClassifierError::ModelNotInitialized { name })?;
    state.metrics.set_models_registered(state.registry.len());
    Ok(StatusCode::NO_CONTENT)
}

async fn update_model(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(request): Json<UpdateRequest>,
) -> ApiResult<UpdateOutcome> {
    if request.features.is_empty() {
        state.metrics.inc_update_errors(ErrorKind::InvalidInput);
        return Err(ClassifierError::InvalidInput("features must not be empty".to_string()).into());
    }
    let features = FeatureVector::from(request.features);
    let model = state.registry.get_or_create(&name, features.len());
    state.metrics.set_models_registered(state.registry.len());

    let start = Instant::now();
    let label = request.label.clone();
    // Newton steps run off the async workers
    let result = tokio::task::spawn_blocking(move || model.update(&features, &label)).await?;
    let outcome = result.map_err(|e| {
        state.metrics.inc_update_errors(e.kind());
        state
            .logger
            .log_update_rejected(&name, e.kind(), &e.to_string());
        e
    })?;
    state
        .metrics
        .observe_update(&name, start.elapsed().as_secs_f64(), outcome.classes);
    if outcome.new_class {
        state
            .logger
            .log_class_added(&name, &request.label.to_string(), outcome.classes);
    }
    Ok(Json(outcome))
}

async fn predict_model(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(request): Json<PredictRequest>,
) -> ApiResult<Prediction> {
    let start = Instant::now();
    let result = match state.registry.require(&name) {
        Ok(model) => {
            let features = FeatureVector::from(request.features);
            let samples = request
                .samples
                .unwrap_or_else(|| model.default_prediction_samples());
            tokio::task::spawn_blocking(move || model.predict_with_uncertainty(&features, samples))
                .await?
        }
        Err(e) => Err(e),
    };
    let prediction = result.map_err(|e| {
        state.metrics.inc_prediction_errors(e.kind());
        e
    })?;

    state
        .metrics
        .observe_prediction(&name, start.elapsed().as_secs_f64());
    state.logger.log_prediction(
        &name,
        &prediction.label.to_string(),
        prediction.confidence,
        prediction.samples,
    );
    Ok(Json(prediction))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/models", get(list_models))
        .route("/api/v1/models/:name", get(get_model).delete(delete_model))
        .route("/api/v1/models/:name/posterior", get(get_posterior))
        .route("/api/v1/models/:name/update", post(update_model))
        .route("/api/v1/models/:name/predict", post(predict_model))
        .with_state(state)
}

/// Serve the API until `shutdown` resolves
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
