//! Features Module - Schema & Input Normalization
//!
//! Định nghĩa 32 biến đầu vào và chuyển raw input thành FeatureVector.
//! Thứ tự trong `layout.rs` là hợp đồng với model, không được đổi.

pub mod layout;
pub mod normalize;
pub mod vector;

#[cfg(test)]
mod tests;

// Re-export common types
pub use layout::{
    feature_code, feature_index, feature_name, feature_spec, glossary, layout_hash, schema,
    FeatureKind, FeatureSpec, GlossaryEntry, LayoutInfo, LayoutMismatchError, FEATURE_COUNT,
    FEATURE_LAYOUT, SCHEMA_VERSION,
};
pub use normalize::{normalize, normalize_report, InputError, RawInputs, RawValue};
pub use vector::FeatureVector;
