//! Assessment handlers (JSON API)

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use birth_trauma_core::logic::explain::FeatureContribution;
use birth_trauma_core::logic::features::RawInputs;
use birth_trauma_core::logic::render::ForcePlot;
use birth_trauma_core::{Assessment, DegradedStage, Stage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::run_assessment;
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct AssessResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub score: f64,
    pub raw_score: f64,
    /// "Predicted 分娩心理创伤 score: 0.42"
    pub score_text: String,
    pub model_type: String,
    pub baseline: Option<f64>,
    pub contributions: Vec<FeatureContribution>,
    pub plot: Option<ForcePlot>,
    /// Inline image when the backend produces SVG
    pub svg: Option<String>,
    pub degraded: Vec<DegradedStage>,
}

impl From<Assessment> for AssessResponse {
    fn from(a: Assessment) -> Self {
        let score_text = a.score_text();
        let svg = a.visual.as_ref().and_then(|v| v.as_svg()).map(str::to_string);
        Self {
            id: a.id,
            created_at: a.created_at,
            score: a.prediction.score,
            raw_score: a.prediction.raw_score,
            score_text,
            model_type: a.prediction.model_type,
            baseline: a.explanation.as_ref().map(|e| e.baseline),
            contributions: a.contributions,
            plot: a.visual.map(|v| v.plot),
            svg,
            degraded: a.degraded,
        }
    }
}

fn parse_body(body: Result<Json<RawInputs>, JsonRejection>) -> AppResult<RawInputs> {
    body.map(|Json(raw)| raw)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Score + explanation for one set of inputs
pub async fn assess(
    State(state): State<AppState>,
    body: Result<Json<RawInputs>, JsonRejection>,
) -> AppResult<Json<AssessResponse>> {
    let raw = parse_body(body)?;
    let assessment = run_assessment(&state, raw).await?;
    Ok(Json(assessment.into()))
}

/// Force plot image only, with the backend's media type
pub async fn plot(
    State(state): State<AppState>,
    body: Result<Json<RawInputs>, JsonRejection>,
) -> AppResult<Response> {
    let raw = parse_body(body)?;
    let assessment = run_assessment(&state, raw).await?;

    match assessment.visual {
        Some(visual) => Ok(([(header::CONTENT_TYPE, visual.media_type)], visual.bytes).into_response()),
        None => {
            let reason = assessment
                .degraded
                .iter()
                .find(|d| d.stage == Stage::Render)
                .or_else(|| assessment.degraded.first())
                .map(|d| d.reason.clone())
                .unwrap_or_else(|| "plot unavailable".to_string());
            Err(AppError::Unavailable(reason))
        }
    }
}
