//! Assessment Pipeline
//!
//! validate → predict → explain → render. Input errors abort the request;
//! explain/render failures only degrade it (the score is always returned).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::constants::OUTCOME_NAME;
use crate::logic::config::{PipelineConfig, RenderMode};
use crate::logic::explain::{Explanation, FeatureContribution, TreeExplainer};
use crate::logic::features::{normalize, FeatureVector, InputError, RawInputs};
use crate::logic::model::{LoadedModel, PredictionResult, Predictor};
use crate::logic::render::{self, RasterBackend, RenderBackend, SvgBackend, VisualArtifact};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Explain,
    Render,
}

/// A stage that was skipped or failed, with the reason shown to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegradedStage {
    pub stage: Stage,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Assessment {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub inputs: FeatureVector,
    pub prediction: PredictionResult,
    pub explanation: Option<Explanation>,
    /// Non-zero contributions, strongest first
    pub contributions: Vec<FeatureContribution>,
    pub visual: Option<VisualArtifact>,
    pub degraded: Vec<DegradedStage>,
}

impl Assessment {
    /// "Predicted 分娩心理创伤 score: 0.42"
    pub fn score_text(&self) -> String {
        format!("Predicted {} score: {}", OUTCOME_NAME, self.prediction.display())
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Shared read-only after construction
pub struct Pipeline {
    predictor: Predictor,
    explainer: Result<TreeExplainer, String>,
    backend: Option<Box<dyn RenderBackend>>,
    config: PipelineConfig,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("model", &self.predictor.model().metadata.model_path)
            .field("explainer", &self.explainer.is_ok())
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("config", &self.config)
            .finish()
    }
}

impl Pipeline {
    pub fn new(model: Arc<LoadedModel>, config: PipelineConfig) -> Self {
        let explainer = if config.explain {
            TreeExplainer::new(model.clone()).map_err(|e| {
                log::warn!("Explanations unavailable: {}", e);
                e.to_string()
            })
        } else {
            Err("explanation disabled".to_string())
        };

        let backend: Option<Box<dyn RenderBackend>> = match &config.render {
            RenderMode::Off => None,
            RenderMode::Svg => Some(Box::new(SvgBackend::new())),
            RenderMode::Raster { command, media_type } => match RasterBackend::from_command_line(command) {
                Some(raster) => Some(Box::new(match media_type {
                    Some(media_type) => raster.with_media_type(media_type.as_str()),
                    None => raster,
                })),
                None => {
                    log::warn!("Empty raster command, falling back to SVG");
                    Some(Box::new(SvgBackend::new()))
                }
            },
        };

        log::info!(
            "Pipeline ready: model={} explain={} render={}",
            model.metadata.model_type,
            explainer.is_ok(),
            backend.as_ref().map(|b| b.name()).unwrap_or("off")
        );

        Self {
            predictor: Predictor::new(model),
            explainer,
            backend,
            config,
        }
    }

    /// Replace the render backend
    pub fn with_backend(mut self, backend: Box<dyn RenderBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn can_explain(&self) -> bool {
        self.explainer.is_ok()
    }

    pub fn render_media_type(&self) -> Option<&str> {
        self.backend.as_ref().map(|b| b.media_type())
    }

    pub fn assess(&self, raw: &RawInputs) -> Result<Assessment, InputError> {
        let vector = normalize(raw)?;
        Ok(self.assess_vector(vector))
    }

    /// Run every stage after validation
    pub fn assess_vector(&self, vector: FeatureVector) -> Assessment {
        let id = Uuid::new_v4();
        let prediction = self.predictor.predict(&vector);
        let mut degraded = Vec::new();

        let explanation = match &self.explainer {
            Ok(explainer) => match explainer.explain(&vector) {
                Ok(e) => Some(e),
                Err(e) => {
                    degraded.push(DegradedStage { stage: Stage::Explain, reason: e.to_string() });
                    None
                }
            },
            Err(reason) => {
                degraded.push(DegradedStage { stage: Stage::Explain, reason: reason.clone() });
                None
            }
        };

        let contributions = explanation
            .as_ref()
            .map(|e| e.contributions(&vector))
            .unwrap_or_default();

        let visual = match (&explanation, &self.backend) {
            (Some(e), Some(backend)) => {
                match render::render(e, &vector.labels(), backend.as_ref(), &self.config.plot) {
                    Ok(artifact) => Some(artifact),
                    Err(err) => {
                        degraded.push(DegradedStage { stage: Stage::Render, reason: err.to_string() });
                        None
                    }
                }
            }
            (Some(_), None) => {
                degraded.push(DegradedStage { stage: Stage::Render, reason: "rendering disabled".to_string() });
                None
            }
            // nothing to draw without an explanation; already recorded
            (None, _) => None,
        };

        for d in &degraded {
            log::warn!("Assessment {} degraded at {:?}: {}", id, d.stage, d.reason);
        }
        log::debug!("Assessment {} score={:.4} inputs={}", id, prediction.score, vector.to_log_entry());

        Assessment {
            id,
            created_at: Utc::now(),
            inputs: vector,
            prediction,
            explanation,
            contributions,
            visual,
            degraded,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
