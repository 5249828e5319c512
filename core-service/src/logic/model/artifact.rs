//! Model Artifact - load once at startup, share read-only
//!
//! Load model JSON từ file, verify checksum, kiểm tra feature layout.
//! Any failure here means the model is unavailable; callers treat that as
//! fatal and refuse to serve.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::linear::LinearModel;
use super::tree::Forest;
use super::Regressor;
use crate::logic::features::{FEATURE_COUNT, FEATURE_LAYOUT};

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Model could not be made available
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read model {}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },

    #[error("failed to parse model: {0}")]
    Parse(String),

    #[error("model checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("model feature layout mismatch: {0}")]
    Layout(String),

    #[error("invalid tree {tree}: {reason}")]
    InvalidTree { tree: usize, reason: String },

    #[error("unsupported model: {0}")]
    Unsupported(String),
}

// ============================================================================
// MODEL
// ============================================================================

/// Pre-trained regressor, immutable after load
#[derive(Debug, Clone, PartialEq)]
pub enum Model {
    TreeEnsemble(Forest),
    Linear(LinearModel),
}

impl Model {
    /// Detect the artifact kind and parse it
    pub fn from_json(doc: serde_json::Value) -> Result<Self, ModelError> {
        if doc.get("tree_info").is_some() {
            return Forest::from_lightgbm_json(doc).map(Model::TreeEnsemble);
        }
        match doc.get("model_type").and_then(|t| t.as_str()) {
            Some("linear") => LinearModel::from_json(doc).map(Model::Linear),
            Some(other) => Err(ModelError::Unsupported(format!("model_type '{}'", other))),
            None => Err(ModelError::Parse(
                "expected a LightGBM dump (tree_info) or a model_type field".to_string(),
            )),
        }
    }

    pub fn model_type(&self) -> &'static str {
        match self {
            Model::TreeEnsemble(_) => "lightgbm",
            Model::Linear(_) => "linear",
        }
    }

    pub fn as_forest(&self) -> Option<&Forest> {
        match self {
            Model::TreeEnsemble(forest) => Some(forest),
            Model::Linear(_) => None,
        }
    }

    pub fn tree_count(&self) -> usize {
        self.as_forest().map(|f| f.trees().len()).unwrap_or(0)
    }

    pub fn objective(&self) -> String {
        match self {
            Model::TreeEnsemble(forest) => forest.objective().to_string(),
            Model::Linear(_) => "regression".to_string(),
        }
    }

    fn feature_names(&self) -> &[String] {
        match self {
            Model::TreeEnsemble(forest) => forest.feature_names(),
            Model::Linear(linear) => &linear.feature_names,
        }
    }

    fn n_features(&self) -> Option<usize> {
        match self {
            Model::TreeEnsemble(forest) => forest.n_features_hint(),
            Model::Linear(linear) => Some(linear.n_features()),
        }
    }

    /// Reject models trained on a different column layout
    fn check_layout(&self) -> Result<(), ModelError> {
        if let Some(n) = self.n_features() {
            if n > FEATURE_COUNT {
                return Err(ModelError::Layout(format!(
                    "model expects {} features, schema has {}",
                    n, FEATURE_COUNT
                )));
            }
        }
        if let Model::Linear(linear) = self {
            if linear.n_features() != FEATURE_COUNT {
                return Err(ModelError::Layout(format!(
                    "linear model has {} weights, schema has {}",
                    linear.n_features(),
                    FEATURE_COUNT
                )));
            }
        }

        let names = self.feature_names();
        if names.is_empty() || names.iter().all(|n| is_generic_name(n)) {
            return Ok(());
        }
        if names.len() != FEATURE_COUNT {
            return Err(ModelError::Layout(format!(
                "model names {} features, schema has {}",
                names.len(),
                FEATURE_COUNT
            )));
        }
        for (i, (name, spec)) in names.iter().zip(FEATURE_LAYOUT.iter()).enumerate() {
            if name != spec.name {
                return Err(ModelError::Layout(format!(
                    "column {} is '{}' in the model but '{}' in the schema",
                    i, name, spec.name
                )));
            }
        }
        Ok(())
    }
}

impl Regressor for Model {
    fn predict_raw(&self, x: &[f64]) -> f64 {
        match self {
            Model::TreeEnsemble(forest) => forest.predict_raw(x),
            Model::Linear(linear) => linear.predict_raw(x),
        }
    }

    fn output(&self, raw: f64) -> f64 {
        match self {
            Model::TreeEnsemble(forest) => forest.output(raw),
            Model::Linear(linear) => linear.output(raw),
        }
    }
}

/// LightGBM names unnamed columns `Column_0`, `Column_1`, ...
fn is_generic_name(name: &str) -> bool {
    name.strip_prefix("Column_")
        .map(|n| n.parse::<usize>().is_ok())
        .unwrap_or(false)
}

// ============================================================================
// METADATA
// ============================================================================

/// Model metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_path: String,
    pub model_type: String,
    pub objective: String,
    pub tree_count: usize,
    pub features: usize,
    pub sha256: String,
    pub loaded_at: chrono::DateTime<chrono::Utc>,
}

/// The immutable handle shared by predictor and explainer
#[derive(Debug)]
pub struct LoadedModel {
    pub model: Model,
    pub metadata: ModelMetadata,
}

// ============================================================================
// LOADING
// ============================================================================

/// Hex SHA-256 of the artifact bytes
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Load model từ file
pub fn load_model(path: impl AsRef<Path>, expected_sha256: Option<&str>) -> Result<Arc<LoadedModel>, ModelError> {
    let path = path.as_ref();
    log::info!("Loading model from: {}", path.display());

    if !path.exists() {
        return Err(ModelError::NotFound(path.to_path_buf()));
    }

    let bytes = std::fs::read(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    load_model_from_bytes(&bytes, &path.display().to_string(), expected_sha256)
}

/// Load model từ bytes; `origin` is only recorded in the metadata
pub fn load_model_from_bytes(
    bytes: &[u8],
    origin: &str,
    expected_sha256: Option<&str>,
) -> Result<Arc<LoadedModel>, ModelError> {
    let sha256 = checksum(bytes);
    if let Some(expected) = expected_sha256 {
        if !expected.trim().eq_ignore_ascii_case(&sha256) {
            return Err(ModelError::ChecksumMismatch {
                expected: expected.trim().to_lowercase(),
                actual: sha256,
            });
        }
    }

    let doc: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| ModelError::Parse(e.to_string()))?;
    let model = Model::from_json(doc)?;
    model.check_layout()?;

    let metadata = ModelMetadata {
        model_path: origin.to_string(),
        model_type: model.model_type().to_string(),
        objective: model.objective(),
        tree_count: model.tree_count(),
        features: FEATURE_COUNT,
        sha256,
        loaded_at: chrono::Utc::now(),
    };

    log::info!(
        "Model loaded: type={}, trees={}, objective={}, sha256={}",
        metadata.model_type,
        metadata.tree_count,
        metadata.objective,
        &metadata.sha256[..12]
    );

    Ok(Arc::new(LoadedModel { model, metadata }))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn stump_bytes(feature_names: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "objective": "regression",
            "max_feature_idx": 31,
            "feature_names": feature_names,
            "tree_info": [{
                "tree_structure": {
                    "split_feature": 26,
                    "threshold": 1.5,
                    "decision_type": "<=",
                    "internal_count": 10,
                    "left_child": {"leaf_value": 0.1, "leaf_count": 5},
                    "right_child": {"leaf_value": 0.3, "leaf_count": 5}
                }
            }]
        }))
        .unwrap()
    }

    fn schema_names() -> serde_json::Value {
        json!(FEATURE_LAYOUT.iter().map(|s| s.name).collect::<Vec<_>>())
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, stump_bytes(schema_names())).unwrap();

        let loaded = load_model(&path, None).unwrap();
        assert_eq!(loaded.metadata.model_type, "lightgbm");
        assert_eq!(loaded.metadata.tree_count, 1);
        assert_eq!(loaded.metadata.features, FEATURE_COUNT);
        assert_eq!(loaded.metadata.sha256.len(), 64);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_model(dir.path().join("absent.json"), None).unwrap_err();
        assert!(matches!(err, ModelError::NotFound(_)));
    }

    #[test]
    fn test_checksum_verification() {
        let bytes = stump_bytes(json!([]));
        let good = checksum(&bytes);
        assert!(load_model_from_bytes(&bytes, "<memory>", Some(&good.to_uppercase())).is_ok());

        let err = load_model_from_bytes(&bytes, "<memory>", Some("deadbeef")).unwrap_err();
        assert!(matches!(err, ModelError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_generic_column_names_accepted() {
        let names: Vec<String> = (0..FEATURE_COUNT).map(|i| format!("Column_{}", i)).collect();
        assert!(load_model_from_bytes(&stump_bytes(json!(names)), "<memory>", None).is_ok());
    }

    #[test]
    fn test_reordered_columns_rejected() {
        let mut names: Vec<&str> = FEATURE_LAYOUT.iter().map(|s| s.name).collect();
        names.swap(0, 1);
        let err = load_model_from_bytes(&stump_bytes(json!(names)), "<memory>", None).unwrap_err();
        assert!(matches!(err, ModelError::Layout(_)));
        assert!(err.to_string().contains("体重"));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            load_model_from_bytes(b"not json", "<memory>", None).unwrap_err(),
            ModelError::Parse(_)
        ));
        assert!(matches!(
            load_model_from_bytes(br#"{"model_type": "svm"}"#, "<memory>", None).unwrap_err(),
            ModelError::Unsupported(_)
        ));
    }

    #[test]
    fn test_linear_weight_count_must_match_schema() {
        let doc = json!({"model_type": "linear", "weights": [1.0, 2.0]});
        let err = load_model_from_bytes(&serde_json::to_vec(&doc).unwrap(), "<memory>", None).unwrap_err();
        assert!(matches!(err, ModelError::Layout(_)));
    }
}
