//! Explanation Engine - TreeSHAP over the loaded ensemble
//!
//! Baseline chỉ phụ thuộc vào model nên tính một lần; attributions phải tính
//! lại cho từng vector (không cache giữa các input khác nhau).

use std::sync::Arc;

use thiserror::Error;

use super::tree_shap;
use super::types::Explanation;
use crate::logic::features::{FeatureVector, LayoutMismatchError, FEATURE_COUNT};
use crate::logic::model::{Forest, LoadedModel, Model, Regressor};

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Error)]
pub enum ExplainError {
    /// The attribution method cannot handle this model type
    #[error("explanation unavailable: '{0}' models are not supported by the tree explainer")]
    Unsupported(String),

    #[error(transparent)]
    Layout(#[from] LayoutMismatchError),
}

// ============================================================================
// TREE EXPLAINER
// ============================================================================

/// Explainer bound to one tree-ensemble model
#[derive(Debug, Clone)]
pub struct TreeExplainer {
    model: Arc<LoadedModel>,
    expected_value: f64,
}

impl TreeExplainer {
    pub fn new(model: Arc<LoadedModel>) -> Result<Self, ExplainError> {
        let expected_value = forest_of(&model.model)?.expected_value();
        log::debug!("TreeExplainer ready, expected value {:.6}", expected_value);
        Ok(Self { model, expected_value })
    }

    /// Baseline shared by every explanation of this model
    pub fn expected_value(&self) -> f64 {
        self.expected_value
    }

    pub fn explain(&self, vector: &FeatureVector) -> Result<Explanation, ExplainError> {
        vector.validate()?;
        let forest = forest_of(&self.model.model)?;
        Ok(shap_values(forest, vector, self.expected_value))
    }
}

/// One-shot explanation without keeping an explainer around
pub fn explain(model: &Model, vector: &FeatureVector) -> Result<Explanation, ExplainError> {
    vector.validate()?;
    let forest = forest_of(model)?;
    Ok(shap_values(forest, vector, forest.expected_value()))
}

fn forest_of(model: &Model) -> Result<&Forest, ExplainError> {
    model
        .as_forest()
        .ok_or_else(|| ExplainError::Unsupported(model.model_type().to_string()))
}

fn shap_values(forest: &Forest, vector: &FeatureVector, baseline: f64) -> Explanation {
    let x = vector.as_slice();
    let scale = forest.tree_weight();
    let mut attributions = vec![0.0; FEATURE_COUNT];

    for tree in forest.trees() {
        tree_shap::accumulate(tree, x, scale, &mut attributions);
    }

    let explanation = Explanation {
        baseline,
        attributions,
        prediction: forest.predict_raw(x),
    };

    if !explanation.verify(1e-6) {
        log::warn!(
            "SHAP additivity gap {:.3e} exceeds tolerance (baseline {:.6}, prediction {:.6})",
            explanation.additivity_gap(),
            explanation.baseline,
            explanation.prediction
        );
    }

    explanation
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::{normalize, schema, FeatureKind, RawInputs, RawValue};
    use crate::logic::model::Predictor;
    use crate::logic::testutil::{fixture_model, linear_model};

    fn sample_inputs() -> Vec<RawInputs> {
        let mut samples = vec![RawInputs::new()];

        // every field at its maximum / last option
        samples.push(
            schema()
                .iter()
                .map(|spec| {
                    let v = match spec.kind {
                        FeatureKind::Numerical { max, .. } => max,
                        FeatureKind::Categorical { options } => *options.last().unwrap() as f64,
                    };
                    (spec.name.to_string(), RawValue::Number(v))
                })
                .collect(),
        );

        // mid-range mix touching every split in the fixture
        let mut mix = RawInputs::new();
        for (name, v) in [
            ("年龄", 22.0),
            ("体重", 75.0),
            ("居住地", 2.0),
            ("学历", 3.0),
            ("产时疼痛", 8.0),
            ("抑郁", 2.0),
            ("焦虑", 3.5),
            ("侵入性反刍性沉思", 15.0),
            ("心理弹性", 12.0),
            ("家庭支持", 6.0),
        ] {
            mix.insert(name.to_string(), RawValue::Number(v));
        }
        samples.push(mix);
        samples
    }

    #[test]
    fn test_additive_decomposition() {
        let model = fixture_model();
        let explainer = TreeExplainer::new(model.clone()).unwrap();
        let predictor = Predictor::new(model);

        for raw in sample_inputs() {
            let vector = normalize(&raw).unwrap();
            let explanation = explainer.explain(&vector).unwrap();
            let prediction = predictor.predict(&vector);

            let total = explanation.baseline + explanation.attributions.iter().sum::<f64>();
            assert!(
                (total - prediction.raw_score).abs() <= 1e-6 * prediction.raw_score.abs().max(1.0),
                "baseline+Σφ={} prediction={}",
                total,
                prediction.raw_score
            );
        }
    }

    #[test]
    fn test_attribution_order_matches_schema() {
        let explainer = TreeExplainer::new(fixture_model()).unwrap();
        let mut raw = RawInputs::new();
        raw.insert("体重".into(), RawValue::Number(80.0));
        let explanation = explainer.explain(&normalize(&raw).unwrap()).unwrap();

        assert_eq!(explanation.attributions.len(), FEATURE_COUNT);
        // only tree 6 splits on 体重 (index 1): 80 > 70.5 → 0.025 vs E = -0.65*0.01 + 0.35*0.025
        let expected = 0.025 - (0.65 * -0.01 + 0.35 * 0.025);
        assert!((explanation.attributions[1] - expected).abs() < 1e-12);
        // features no tree splits on get nothing
        assert_eq!(explanation.attributions[3], 0.0);
        assert_eq!(explanation.attributions[29], 0.0);
    }

    #[test]
    fn test_baseline_independent_of_input() {
        let explainer = TreeExplainer::new(fixture_model()).unwrap();
        let baselines: Vec<f64> = sample_inputs()
            .iter()
            .map(|raw| explainer.explain(&normalize(raw).unwrap()).unwrap().baseline)
            .collect();
        assert!(baselines.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(baselines[0], explainer.expected_value());
    }

    #[test]
    fn test_attributions_differ_per_input() {
        let explainer = TreeExplainer::new(fixture_model()).unwrap();
        let samples = sample_inputs();
        let a = explainer.explain(&normalize(&samples[0]).unwrap()).unwrap();
        let b = explainer.explain(&normalize(&samples[2]).unwrap()).unwrap();
        assert_ne!(a.attributions, b.attributions);
    }

    #[test]
    fn test_free_function_matches_explainer() {
        let model = fixture_model();
        let vector = normalize(&sample_inputs()[2]).unwrap();
        let a = explain(&model.model, &vector).unwrap();
        let b = TreeExplainer::new(model).unwrap().explain(&vector).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_linear_model_is_unsupported() {
        let model = linear_model();
        let err = TreeExplainer::new(model.clone()).unwrap_err();
        assert!(matches!(err, ExplainError::Unsupported(ref t) if t == "linear"));

        let err = explain(&model.model, &FeatureVector::defaults()).unwrap_err();
        assert!(matches!(err, ExplainError::Unsupported(_)));

        // the score is still available
        let result = Predictor::new(model).predict(&FeatureVector::defaults());
        assert!(result.score.is_finite());
    }

    #[test]
    fn test_stale_vector_rejected() {
        let explainer = TreeExplainer::new(fixture_model()).unwrap();
        let mut vector = FeatureVector::defaults();
        vector.layout_hash ^= 1;
        assert!(matches!(explainer.explain(&vector).unwrap_err(), ExplainError::Layout(_)));
    }
}
