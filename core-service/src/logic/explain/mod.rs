//! Explain Module - Shapley attribution of a single prediction
//!
//! `baseline + Σ attributions == raw prediction` is the invariant every
//! consumer relies on.

pub mod engine;
pub mod tree_shap;
pub mod types;

pub use engine::{explain, ExplainError, TreeExplainer};
pub use types::{Explanation, FeatureContribution};
