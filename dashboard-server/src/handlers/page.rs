//! Browser page handlers

use std::collections::HashMap;

use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form,
};
use birth_trauma_core::logic::features::{RawInputs, RawValue};
use birth_trauma_core::logic::render::svg::to_svg;
use birth_trauma_core::Assessment;

use super::run_assessment;
use crate::{views, AppError, AppState};

/// Empty form with schema defaults
pub async fn index() -> Html<String> {
    Html(views::index_page(&HashMap::new(), &[]))
}

/// Form submit → result page, or the form again with errors marked
pub async fn submit(
    State(state): State<AppState>,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> Response {
    let submitted = match form {
        Ok(Form(fields)) => fields,
        Err(rejection) => return AppError::BadRequest(rejection.body_text()).into_response(),
    };

    let raw: RawInputs = submitted
        .iter()
        .map(|(k, v)| (k.clone(), RawValue::Text(v.clone())))
        .collect();

    match run_assessment(&state, raw).await {
        Ok(assessment) => {
            let svg = inline_svg(&state, &assessment);
            Html(views::result_page(&assessment, svg.as_deref(), &submitted)).into_response()
        }
        Err(AppError::Input(errors)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(views::index_page(&submitted, &errors)),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// The page always embeds SVG, even when the configured backend is raster
fn inline_svg(state: &AppState, assessment: &Assessment) -> Option<String> {
    let visual = assessment.visual.as_ref()?;
    match visual.as_svg() {
        Some(svg) => Some(svg.to_string()),
        None => to_svg(&visual.plot, &state.pipeline.config().plot)
            .map_err(|e| tracing::warn!("Failed to redraw plot as SVG: {}", e))
            .ok(),
    }
}
