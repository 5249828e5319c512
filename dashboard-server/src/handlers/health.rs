//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    environment: String,
    model_type: String,
    tree_count: usize,
    explain: bool,
    render: Option<String>,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let pipeline = &state.pipeline;
    let status = pipeline.predictor().status();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        environment: state.config.environment.clone(),
        model_type: status.model_type,
        tree_count: status.tree_count,
        explain: pipeline.can_explain(),
        render: pipeline.render_media_type().map(str::to_string),
    })
}
