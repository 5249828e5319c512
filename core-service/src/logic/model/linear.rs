//! Linear Model
//!
//! `y = bias + Σ w[i] * x[i]`. Predictable, but the tree explainer cannot
//! attribute it.

use serde::{Deserialize, Serialize};

use super::artifact::ModelError;
use super::Regressor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<f64>,
    #[serde(default)]
    pub bias: f64,
    #[serde(default)]
    pub feature_names: Vec<String>,
}

impl LinearModel {
    pub fn from_json(doc: serde_json::Value) -> Result<Self, ModelError> {
        let model: LinearModel =
            serde_json::from_value(doc).map_err(|e| ModelError::Parse(e.to_string()))?;
        if model.weights.iter().any(|w| !w.is_finite()) || !model.bias.is_finite() {
            return Err(ModelError::Parse("linear model has non-finite coefficients".to_string()));
        }
        Ok(model)
    }

    pub fn n_features(&self) -> usize {
        self.weights.len()
    }
}

impl Regressor for LinearModel {
    fn predict_raw(&self, x: &[f64]) -> f64 {
        self.bias + self.weights.iter().zip(x).map(|(w, v)| w * v).sum::<f64>()
    }
}
