//! HTTP handlers

pub mod assess;
pub mod health;
pub mod page;
pub mod schema;

use birth_trauma_core::logic::features::{normalize_report, RawInputs};
use birth_trauma_core::Assessment;

use crate::{AppError, AppResult, AppState};

/// Validate, then run the pipeline off the async runtime
/// (the raster backend spawns a converter process)
pub(crate) async fn run_assessment(state: &AppState, raw: RawInputs) -> AppResult<Assessment> {
    let vector = normalize_report(&raw).map_err(AppError::Input)?;
    let pipeline = state.pipeline.clone();
    let assessment = tokio::task::spawn_blocking(move || pipeline.assess_vector(vector)).await?;

    tracing::info!(
        id = %assessment.id,
        score = assessment.prediction.score,
        degraded = assessment.degraded.len(),
        "Assessment completed"
    );
    Ok(assessment)
}
