//! Model Module - Prediction Service
//!
//! Tách logic inference khỏi explanation/rendering.
//! Model được load một lần lúc startup và chia sẻ read-only.

pub mod artifact;
pub mod inference;
pub mod linear;
pub mod tree;

// Re-export common types
pub use artifact::{checksum, load_model, load_model_from_bytes, LoadedModel, Model, ModelError, ModelMetadata};
pub use inference::{EngineStatus, PredictionResult, Predictor};
pub use linear::LinearModel;
pub use tree::{Forest, MissingType, Node, OutputTransform, SplitRule, Tree};

/// Anything that maps one feature row to a scalar
pub trait Regressor {
    /// Raw margin (sum of leaf values, or linear combination)
    fn predict_raw(&self, x: &[f64]) -> f64;

    /// Reported score for a raw margin
    fn output(&self, raw: f64) -> f64 {
        raw
    }
}
