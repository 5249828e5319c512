//! Feature Vector - Core data structure for model input
//!
//! **Versioned feature vector with layout validation**
//!
//! Uses centralized layout from `layout.rs` for:
//! - Consistent feature ordering
//! - Version tracking
//! - Layout hash for compatibility checks

use serde::{Deserialize, Serialize};

use super::layout::{
    layout_hash, validate_layout, LayoutMismatchError, FEATURE_COUNT, FEATURE_LAYOUT,
    SCHEMA_VERSION,
};

// ============================================================================
// VERSIONED FEATURE VECTOR
// ============================================================================

/// Versioned Feature Vector with layout metadata
///
/// Only `normalize` builds one from user input, so every value already
/// satisfies its spec. Values are `f64` because the model thresholds are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Feature layout version
    pub version: u8,
    /// CRC32 hash of the feature layout (for mismatch detection)
    pub layout_hash: u32,
    /// Feature values in order defined by FEATURE_LAYOUT
    values: Vec<f64>,
}

impl FeatureVector {
    /// Vector of schema defaults (numerical defaults, first categorical option)
    pub fn defaults() -> Self {
        Self::from_values(std::array::from_fn(|i| FEATURE_LAYOUT[i].default_value()))
    }

    pub(crate) fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self {
            version: SCHEMA_VERSION,
            layout_hash: layout_hash(),
            values: values.to_vec(),
        }
    }

    /// Get values as slice
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get feature by index
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Get feature by name
    pub fn get_by_name(&self, name: &str) -> Option<f64> {
        super::layout::feature_index(name).and_then(|i| self.get(i))
    }

    /// Validate that this vector is compatible with current layout
    pub fn validate(&self) -> Result<(), LayoutMismatchError> {
        validate_layout(self.version, self.layout_hash)?;
        if self.values.len() != FEATURE_COUNT {
            return Err(LayoutMismatchError {
                expected_version: SCHEMA_VERSION,
                expected_hash: layout_hash(),
                actual_version: self.version,
                actual_hash: self.layout_hash,
            });
        }
        Ok(())
    }

    /// Check if this vector is compatible with current layout
    pub fn is_compatible(&self) -> bool {
        self.validate().is_ok()
    }

    /// `X{i}=value` labels in feature order, as drawn on the force plot
    pub fn labels(&self) -> Vec<String> {
        FEATURE_LAYOUT
            .iter()
            .zip(self.values.iter())
            .map(|(spec, value)| format!("{}={}", spec.code, format_value(*value)))
            .collect()
    }

    /// Convert to JSON-serializable format for logging
    pub fn to_log_entry(&self) -> serde_json::Value {
        serde_json::json!({
            "feature_version": self.version,
            "layout_hash": self.layout_hash,
            "values": self.values,
            "named_values": FEATURE_LAYOUT.iter()
                .zip(self.values.iter())
                .map(|(spec, value)| (spec.name.to_string(), *value))
                .collect::<std::collections::BTreeMap<_, _>>(),
        })
    }
}

/// Integers print without a fractional part, everything else as-is
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

// ============================================================================
// TESTS
// ============================================================================
