use serde::{Deserialize, Serialize};

use crate::logic::features::{feature_spec, vector::format_value, FeatureVector};

/// One feature's share of the prediction, ready for display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureContribution {
    pub index: usize,
    pub code: String,
    pub name: String,
    pub value: f64,
    /// `X{i}=value`
    pub label: String,
    pub attribution: f64,
    pub description: Option<String>,
}

/// Additive decomposition of one prediction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Explanation {
    /// Expected model output over the training data (raw margin)
    pub baseline: f64,
    /// One value per feature, schema order
    pub attributions: Vec<f64>,
    /// Raw margin being explained
    pub prediction: f64,
}

impl Explanation {
    /// |baseline + Σ attributions − prediction|
    pub fn additivity_gap(&self) -> f64 {
        (self.baseline + self.attributions.iter().sum::<f64>() - self.prediction).abs()
    }

    /// Gap within `rel_tol` relative to max(1, |prediction|)
    pub fn verify(&self, rel_tol: f64) -> bool {
        self.additivity_gap() <= rel_tol * self.prediction.abs().max(1.0)
    }

    /// Feature indices by |attribution| descending; ties keep schema order
    pub fn ranked(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.attributions.len()).collect();
        order.sort_by(|&a, &b| {
            self.attributions[b]
                .abs()
                .partial_cmp(&self.attributions[a].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        order
    }

    /// Non-zero contributions, strongest first
    pub fn contributions(&self, vector: &FeatureVector) -> Vec<FeatureContribution> {
        self.ranked()
            .into_iter()
            .filter(|&i| self.attributions[i] != 0.0)
            .filter_map(|i| {
                let spec = feature_spec(i)?;
                let value = vector.get(i)?;
                Some(FeatureContribution {
                    index: i,
                    code: spec.code.to_string(),
                    name: spec.name.to_string(),
                    value,
                    label: format!("{}={}", spec.code, format_value(value)),
                    attribution: self.attributions[i],
                    description: Some(spec.english.to_string()),
                })
            })
            .collect()
    }
}
