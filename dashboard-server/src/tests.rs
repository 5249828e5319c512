//! Route tests against the fixture model

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use birth_trauma_core::logic::model::load_model;
use birth_trauma_core::{Pipeline, PipelineConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::{config::Config, create_router, AppState};

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../core-service/tests/fixtures/lgbm_regressor.json");

fn test_config() -> Config {
    Config {
        port: 0,
        model_path: FIXTURE.to_string(),
        model_sha256: None,
        raster_command: None,
        raster_media_type: None,
        environment: "test".to_string(),
    }
}

fn app_with(pipeline: Pipeline) -> Router {
    create_router(AppState {
        pipeline: Arc::new(pipeline),
        config: test_config(),
    })
}

fn app() -> Router {
    let model = load_model(FIXTURE, None).unwrap();
    app_with(Pipeline::new(model, PipelineConfig::default()))
}

fn linear_app() -> Router {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("linear.json");
    let weights: Vec<f64> = (0..32).map(|i| 0.01 * (i % 3) as f64).collect();
    std::fs::write(&path, json!({ "model_type": "linear", "weights": weights, "bias": 0.2 }).to_string()).unwrap();
    let model = load_model(&path, None).unwrap();
    app_with(Pipeline::new(model, PipelineConfig::default()))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec())
}

async fn post(app: Router, uri: &str, content_type: &str, body: String) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let media = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    (status, media, to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec())
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let (status, _, bytes) = post(app, uri, "application/json", body.to_string()).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn form_encode(pairs: &[(&str, &str)]) -> String {
    let encode = |s: &str| {
        s.bytes()
            .map(|b| {
                if b.is_ascii_alphanumeric() || b == b'.' || b == b'-' {
                    (b as char).to_string()
                } else {
                    format!("%{:02X}", b)
                }
            })
            .collect::<String>()
    };
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

// ============================================================================
// JSON API
// ============================================================================

#[tokio::test]
async fn test_health() {
    let (status, body) = get(app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_type"], "lightgbm");
    assert_eq!(body["explain"], true);
    assert_eq!(body["render"], "image/svg+xml");
}

#[tokio::test]
async fn test_schema_and_glossary() {
    let (status, body) = get(app(), "/api/v1/schema").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    let features = body["features"].as_array().unwrap();
    assert_eq!(features.len(), 32);
    assert_eq!(features[0]["name"], "年龄");
    assert_eq!(features[2]["type"], "categorical");

    let (status, body) = get(app(), "/api/v1/glossary").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body.as_array().unwrap().len(), 32);
    assert_eq!(body[31]["code"], "X32");
}

#[tokio::test]
async fn test_assess_returns_additive_explanation() {
    let (status, body) = post_json(app(), "/api/v1/assess", json!({ "抑郁": 3, "年龄": "35" })).await;
    assert_eq!(status, StatusCode::OK);

    assert!(body["score_text"].as_str().unwrap().starts_with("Predicted 分娩心理创伤 score: "));
    let baseline = body["baseline"].as_f64().unwrap();
    let total: f64 = body["contributions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["attribution"].as_f64().unwrap())
        .sum();
    let raw = body["raw_score"].as_f64().unwrap();
    assert!((baseline + total - raw).abs() < 1e-6);

    assert!(body["svg"].as_str().unwrap().starts_with("<svg"));
    assert!(body["degraded"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_assess_rejects_invalid_category() {
    let (status, body) = post_json(app(), "/api/v1/assess", json!({ "居住地": 99 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["feature"], "居住地");
    assert_eq!(body["errors"][0]["kind"], "invalid_category");
}

#[tokio::test]
async fn test_assess_reports_every_bad_feature() {
    let (status, body) = post_json(app(), "/api/v1/assess", json!({ "年龄": 99, "体重": "heavy", "身高": 160 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["feature"], "年龄");
    let kinds: Vec<&str> = body["errors"].as_array().unwrap().iter().map(|e| e["kind"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["out_of_range", "invalid_number", "unknown_feature"]);
}

#[tokio::test]
async fn test_assess_null_is_default_and_bool_is_rejected() {
    let (status, body) = post_json(app(), "/api/v1/assess", json!({ "居住地": null, "年龄": null })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["score"].as_f64().unwrap().is_finite());

    let (status, body) = post_json(app(), "/api/v1/assess", json!({ "居住地": true })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["feature"], "居住地");
    assert_eq!(body["errors"][0]["kind"], "invalid_category");
}

#[tokio::test]
async fn test_assess_malformed_body() {
    let (status, _, _) = post(app(), "/api/v1/assess", "application/json", "{not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_plot_returns_image() {
    let (status, media, bytes) = post(app(), "/api/v1/assess/plot", "application/json", "{}".to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(media.as_deref(), Some("image/svg+xml"));
    assert!(String::from_utf8(bytes).unwrap().contains("base value"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_raster_plot_uses_configured_media_type() {
    let config = Config {
        raster_command: Some("cp {input} {output}".to_string()),
        raster_media_type: Some("image/jpeg".to_string()),
        ..test_config()
    };
    let model = load_model(FIXTURE, None).unwrap();
    let pipeline = Pipeline::new(model, config.pipeline_config());
    let app = create_router(AppState { pipeline: Arc::new(pipeline), config });

    let (status, media, bytes) = post(app, "/api/v1/assess/plot", "application/json", "{}".to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(media.as_deref(), Some("image/jpeg"));
    assert!(!bytes.is_empty());
}

#[tokio::test]
async fn test_linear_model_scores_without_plot() {
    let (status, body) = post_json(linear_app(), "/api/v1/assess", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["score"].as_f64().unwrap().is_finite());
    assert!(body["svg"].is_null());
    assert_eq!(body["degraded"][0]["stage"], "explain");

    let (status, _, _) = post(linear_app(), "/api/v1/assess/plot", "application/json", "{}".to_string()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

// ============================================================================
// HTML PAGES
// ============================================================================

#[tokio::test]
async fn test_index_page() {
    let (status, body) = get(app(), "/").await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("<form method=\"post\" action=\"/assess\">"));
    assert!(html.contains("class=\"three-line\""));
}

#[tokio::test]
async fn test_form_submit_shows_score_and_plot() {
    let body = form_encode(&[("年龄", "30"), ("居住地", "2"), ("焦虑", "")]);
    let (status, _, bytes) = post(app(), "/assess", "application/x-www-form-urlencoded", body).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(bytes).unwrap();
    assert!(html.contains("Predicted 分娩心理创伤 score: "));
    assert!(html.contains("<svg"));
}

#[tokio::test]
async fn test_form_submit_with_bad_value_redisplays_form() {
    let body = form_encode(&[("年龄", "99")]);
    let (status, _, bytes) = post(app(), "/assess", "application/x-www-form-urlencoded", body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let html = String::from_utf8(bytes).unwrap();
    assert!(html.contains("class=\"errors\""));
    assert!(html.contains("value=\"99\""));
}
