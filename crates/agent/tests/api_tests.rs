//! Integration tests for the agent API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use classifier_agent::{
    api::{create_router, AppState},
    health::{components, HealthRegistry},
};
use classifier_lib::{ClassifierMetrics, ModelRegistry, StructuredLogger};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn setup_test_app() -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::REGISTRY).await;

    let state = Arc::new(AppState::new(
        Arc::new(ModelRegistry::default()),
        health_registry,
        ClassifierMetrics::new(),
        StructuredLogger::new("test-agent"),
    ));
    let router = create_router(state.clone());

    (router, state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn train(app: &Router, model: &str) {
    for _ in 0..5 {
        let uri = format!("/api/v1/models/{}/update", model);
        let (status, _) = send(app, post(&uri, json!({"features": [1.0, 0.0], "label": "A"}))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(app, post(&uri, json!({"features": [0.0, 1.0], "label": "B"}))).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app().await;

    let (status, health) = send(&app, get("/healthz")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["models"], 0);
}

#[tokio::test]
async fn test_healthz_returns_unavailable_when_unhealthy() {
    let (app, state) = setup_test_app().await;
    state
        .health_registry
        .set_unhealthy(components::REGISTRY, "lock poisoned")
        .await;

    let (status, health) = send(&app, get("/healthz")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_follows_ready_flag() {
    let (app, state) = setup_test_app().await;

    let (status, readiness) = send(&app, get("/readyz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);

    state.health_registry.set_ready(true).await;
    let (status, readiness) = send(&app, get("/readyz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, _state) = setup_test_app().await;
    train(&app, "metrics-model").await;

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/plain; charset=utf-8"
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("bayes_classifier_updates_total"));
}

#[tokio::test]
async fn test_predict_before_update_is_not_found() {
    let (app, state) = setup_test_app().await;

    let (status, body) = send(
        &app,
        post("/api/v1/models/unknown/predict", json!({"features": [1.0, 0.0]})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "configuration");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("needs to be initialized"));
    assert!(state.registry.is_empty());
}

#[tokio::test]
async fn test_update_then_predict() {
    let (app, _state) = setup_test_app().await;
    train(&app, "m").await;

    let (status, prediction) = send(
        &app,
        post(
            "/api/v1/models/m/predict",
            json!({"features": [1.0, 0.0], "samples": 1000}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(prediction["label"], "A");
    assert_eq!(prediction["samples"], 1000);
    let confidence = prediction["confidence"].as_f64().unwrap();
    assert!(confidence > 0.5 && confidence <= 1.0);
}

#[tokio::test]
async fn test_update_reports_new_class_and_loss() {
    let (app, _state) = setup_test_app().await;

    let (status, first) = send(
        &app,
        post("/api/v1/models/m/update", json!({"features": [1.0], "label": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["new_class"], true);
    assert_eq!(first["classes"], 1);

    let (_, second) = send(
        &app,
        post("/api/v1/models/m/update", json!({"features": [-1.0], "label": 2})),
    )
    .await;
    assert_eq!(second["class_index"], 1);
    let loss = second["loss"].as_f64().unwrap();
    assert!((loss - std::f64::consts::LN_2).abs() < 1e-9);
}

#[tokio::test]
async fn test_dimension_mismatch_is_unprocessable() {
    let (app, _state) = setup_test_app().await;
    train(&app, "m").await;

    let (status, body) = send(
        &app,
        post("/api/v1/models/m/update", json!({"features": [1.0, 0.0, 3.0], "label": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "dimension_mismatch");

    let (status, _) = send(
        &app,
        post("/api/v1/models/m/predict", json!({"features": [1.0]})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, summary) = send(&app, get("/api/v1/models/m")).await;
    assert_eq!(summary["updates"], 10);
}

#[tokio::test]
async fn test_zero_samples_and_empty_features_rejected() {
    let (app, state) = setup_test_app().await;

    let (status, _) = send(
        &app,
        post("/api/v1/models/m/update", json!({"features": [], "label": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(state.registry.is_empty());

    train(&app, "m").await;
    let (status, body) = send(
        &app,
        post("/api/v1/models/m/predict", json!({"features": [1.0, 0.0], "samples": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_input");
}

#[tokio::test]
async fn test_list_show_posterior_and_delete() {
    let (app, _state) = setup_test_app().await;
    train(&app, "beta").await;
    train(&app, "alpha").await;

    let (status, models) = send(&app, get("/api/v1/models")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = models
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alpha", "beta"]);

    let (status, summary) = send(&app, get("/api/v1/models/alpha")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["feature_count"], 2);
    assert_eq!(summary["classes"], json!(["A", "B"]));

    let (status, posterior) = send(&app, get("/api/v1/models/alpha/posterior")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(posterior["means"].as_array().unwrap().len(), 2);
    assert_eq!(posterior["means"][0].as_array().unwrap().len(), 3);

    let delete = Request::builder()
        .method("DELETE")
        .uri("/api/v1/models/alpha")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, get("/api/v1/models/alpha")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oversized_samples_and_features_rejected() {
    let (app, state) = setup_test_app().await;
    train(&app, "m").await;
    let before = state.registry.require("m").unwrap().snapshot().unwrap();

    let (status, body) = send(
        &app,
        post(
            "/api/v1/models/m/predict",
            json!({"features": [1.0, 0.0], "samples": 1_000_000_000u64}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_input");

    let (status, body) = send(
        &app,
        post("/api/v1/models/m/predict", json!({"features": [0.0, 1e200]})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_input");

    let (status, _) = send(
        &app,
        post("/api/v1/models/m/update", json!({"features": [0.0, 1e200], "label": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let after = state.registry.require("m").unwrap().snapshot().unwrap();
    assert_eq!(before.means, after.means);
}
