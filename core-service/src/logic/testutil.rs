//! Shared test fixtures

use std::sync::Arc;

use crate::logic::features::FEATURE_COUNT;
use crate::logic::model::{load_model_from_bytes, LoadedModel};

pub const FIXTURE_JSON: &str = include_str!("../../tests/fixtures/lgbm_regressor.json");

/// Seven-tree LightGBM regressor over the 32-feature schema
pub fn fixture_model() -> Arc<LoadedModel> {
    load_model_from_bytes(FIXTURE_JSON.as_bytes(), "fixture", None).unwrap()
}

/// Linear model: loads and predicts, but has no tree structure to explain
pub fn linear_model() -> Arc<LoadedModel> {
    let weights: Vec<f64> = (0..FEATURE_COUNT).map(|i| 0.01 * (i % 5) as f64).collect();
    let doc = serde_json::json!({ "model_type": "linear", "weights": weights, "bias": 0.1 });
    load_model_from_bytes(&serde_json::to_vec(&doc).unwrap(), "linear", None).unwrap()
}
