//! Inference Engine - Prediction Service
//!
//! Chạy model trên một FeatureVector đã validate.
//! Deterministic: same model + same vector → same score.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::artifact::LoadedModel;
use super::Regressor;
use crate::logic::features::FeatureVector;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Prediction output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionResult {
    /// Reported risk score (after the objective's output transform)
    pub score: f64,
    /// Raw margin; the explanation decomposes this value
    pub raw_score: f64,
    pub inference_time_us: u64,
    pub model_type: String,
}

impl PredictionResult {
    /// Score as shown to the clinician, two decimals
    pub fn display(&self) -> String {
        format!("{:.2}", self.score)
    }
}

/// Engine Status for UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub model_loaded: bool,
    pub model_name: String,
    pub model_type: String,
    pub objective: String,
    pub tree_count: usize,
    pub feature_count: usize,
    pub sha256: String,
    pub loaded_at: chrono::DateTime<chrono::Utc>,
}

// ============================================================================
// PREDICTOR
// ============================================================================

/// Scores validated vectors against the shared model
#[derive(Debug, Clone)]
pub struct Predictor {
    model: Arc<LoadedModel>,
}

impl Predictor {
    pub fn new(model: Arc<LoadedModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Arc<LoadedModel> {
        &self.model
    }

    pub fn predict(&self, vector: &FeatureVector) -> PredictionResult {
        let start_time = Instant::now();

        let model = &self.model.model;
        let raw_score = model.predict_raw(vector.as_slice());
        let score = model.output(raw_score);

        let inference_time = start_time.elapsed().as_micros() as u64;
        log::debug!("Predicted score={:.4} raw={:.4} in {}us", score, raw_score, inference_time);

        PredictionResult {
            score,
            raw_score,
            inference_time_us: inference_time,
            model_type: model.model_type().to_string(),
        }
    }

    pub fn status(&self) -> EngineStatus {
        let meta = &self.model.metadata;
        EngineStatus {
            model_loaded: true,
            model_name: meta.model_path.clone(),
            model_type: meta.model_type.clone(),
            objective: meta.objective.clone(),
            tree_count: meta.tree_count,
            feature_count: meta.features,
            sha256: meta.sha256.clone(),
            loaded_at: meta.loaded_at,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
