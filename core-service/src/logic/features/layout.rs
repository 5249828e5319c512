//! Feature Layout - Centralized Feature Schema
//!
//! **CRITICAL: This file controls the column order the model was trained on**
//!
//! ## Rules (NEVER break these):
//! 1. Add feature → increment SCHEMA_VERSION
//! 2. Change order → increment SCHEMA_VERSION
//! 3. Remove feature → increment SCHEMA_VERSION
//!
//! Thứ tự features ở đây phải khớp tuyệt đối với thứ tự cột lúc train model.

use std::collections::HashMap;

use crc32fast::Hasher;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// SCHEMA VERSION
// ============================================================================

/// Current feature layout version
/// MUST be incremented when layout changes
pub const SCHEMA_VERSION: u8 = 1;

/// Total number of features
/// IMPORTANT: Must match FEATURE_LAYOUT.len()!
pub const FEATURE_COUNT: usize = 32;

// ============================================================================
// FEATURE SPEC
// ============================================================================

/// Constraint attached to one input variable
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureKind {
    /// Real number in `[min, max]`; `default` substitutes a missing value
    Numerical { min: f64, max: f64, default: f64 },
    /// Discrete code; the first option substitutes a missing value
    Categorical { options: &'static [i64] },
}

/// One input variable of the model
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureSpec {
    /// Column name, exactly as used when the model was trained
    pub name: &'static str,
    /// Glossary code shown on the force plot (`X1`..`X32`)
    pub code: &'static str,
    pub english: &'static str,
    #[serde(flatten)]
    pub kind: FeatureKind,
}

impl FeatureSpec {
    const fn numerical(
        code: &'static str,
        name: &'static str,
        english: &'static str,
        min: f64,
        max: f64,
        default: f64,
    ) -> Self {
        Self { name, code, english, kind: FeatureKind::Numerical { min, max, default } }
    }

    const fn categorical(
        code: &'static str,
        name: &'static str,
        english: &'static str,
        options: &'static [i64],
    ) -> Self {
        Self { name, code, english, kind: FeatureKind::Categorical { options } }
    }

    pub fn is_numerical(&self) -> bool {
        matches!(self.kind, FeatureKind::Numerical { .. })
    }

    /// Value substituted when the submitter leaves this feature out
    pub fn default_value(&self) -> f64 {
        match self.kind {
            FeatureKind::Numerical { default, .. } => default,
            FeatureKind::Categorical { options } => options.first().copied().unwrap_or(0) as f64,
        }
    }

    /// Check a coerced value against the constraint (bounds are inclusive)
    pub fn accepts(&self, value: f64) -> bool {
        match self.kind {
            FeatureKind::Numerical { min, max, .. } => value >= min && value <= max,
            FeatureKind::Categorical { options } => {
                value.fract() == 0.0 && options.iter().any(|&o| o as f64 == value)
            }
        }
    }
}

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

const BINARY: &[i64] = &[1, 2];
const TERNARY: &[i64] = &[1, 2, 3];
const QUATERNARY: &[i64] = &[1, 2, 3, 4];

/// Feature specs in exact order they appear in the vector
/// This is the SINGLE SOURCE OF TRUTH for feature layout
pub const FEATURE_LAYOUT: [FeatureSpec; FEATURE_COUNT] = [
    // === Demographics (0-6) ===
    FeatureSpec::numerical("X1", "年龄", "Age", 18.0, 42.0, 18.0),
    FeatureSpec::numerical("X2", "体重", "Weight (kg)", 52.0, 91.0, 52.0),
    FeatureSpec::categorical("X3", "居住地", "Place of residence", BINARY),
    FeatureSpec::categorical("X4", "婚姻状况", "Marital status", BINARY),
    FeatureSpec::categorical("X5", "就业情况", "Employment status", BINARY),
    FeatureSpec::categorical("X6", "学历", "Education level", QUATERNARY),
    FeatureSpec::categorical("X7", "医疗费用支付方式", "Medical payment method", TERNARY),

    // === Obstetric history (7-18) ===
    FeatureSpec::numerical("X8", "怀孕次数", "Gravidity", 1.0, 8.0, 1.0),
    FeatureSpec::numerical("X9", "分娩次数", "Parity", 1.0, 4.0, 1.0),
    FeatureSpec::categorical("X10", "分娩方式", "Mode of delivery", TERNARY),
    FeatureSpec::categorical("X11", "不良孕产史", "Adverse obstetric history", BINARY),
    FeatureSpec::categorical("X12", "终止妊娠经历", "History of pregnancy termination", BINARY),
    FeatureSpec::numerical("X13", "妊娠周数", "Gestational age (weeks)", 29.0, 44.0, 29.0),
    FeatureSpec::categorical("X14", "妊娠合并症", "Pregnancy comorbidities", BINARY),
    FeatureSpec::categorical("X15", "妊娠并发症", "Pregnancy complications", BINARY),
    FeatureSpec::categorical("X16", "喂养方式", "Infant feeding method", TERNARY),
    FeatureSpec::categorical("X17", "新生儿是否有出生缺陷或疾病", "Neonatal birth defect or illness", BINARY),
    FeatureSpec::categorical("X18", "家庭人均月收入", "Monthly household income per capita", BINARY),
    FeatureSpec::categorical("X19", "使用无痛分娩技术", "Labour analgesia used", BINARY),

    // === Pain & postpartum care (19-21) ===
    FeatureSpec::numerical("X20", "产时疼痛", "Intrapartum pain", 0.0, 10.0, 0.0),
    FeatureSpec::numerical("X21", "产后疼痛", "Postpartum pain", 1.0, 9.0, 1.0),
    FeatureSpec::categorical("X22", "产后照顾婴儿方式", "Postpartum infant care arrangement", &[1, 2, 3, 4, 5]),

    // === Sleep & activity (22-25) ===
    FeatureSpec::categorical("X23", "近1月睡眠质量", "Sleep quality (past month)", QUATERNARY),
    FeatureSpec::numerical("X24", "近1月夜间睡眠时长", "Nightly sleep hours (past month)", 3.0, 11.0, 3.0),
    FeatureSpec::categorical("X25", "近1月困倦程度", "Daytime sleepiness (past month)", QUATERNARY),
    FeatureSpec::categorical("X26", "孕期体育活动等级", "Physical activity level in pregnancy", QUATERNARY),

    // === Psychological scales (26-31) ===
    FeatureSpec::numerical("X27", "抑郁", "Depression", 0.0, 4.0, 0.0),
    FeatureSpec::numerical("X28", "焦虑", "Anxiety", 0.0, 4.0, 0.0),
    FeatureSpec::numerical("X29", "侵入性反刍性沉思", "Intrusive rumination", 0.0, 30.0, 0.0),
    FeatureSpec::numerical("X30", "目的性反刍性沉思", "Deliberate rumination", 0.0, 28.0, 0.0),
    FeatureSpec::numerical("X31", "心理弹性", "Resilience", 6.0, 30.0, 6.0),
    FeatureSpec::numerical("X32", "家庭支持", "Family support", 0.0, 10.0, 0.0),
];

/// Ordered schema as a slice
pub fn schema() -> &'static [FeatureSpec] {
    &FEATURE_LAYOUT
}

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// Compute CRC32 hash of the feature layout
/// Used to detect layout mismatches at runtime
pub fn compute_layout_hash() -> u32 {
    let mut hasher = Hasher::new();

    // Include version in hash
    hasher.update(&[SCHEMA_VERSION]);

    // Hash all feature names in order
    for spec in FEATURE_LAYOUT.iter() {
        hasher.update(spec.name.as_bytes());
        hasher.update(&[0]); // Separator
    }

    hasher.finalize()
}

static LAYOUT_HASH: Lazy<u32> = Lazy::new(compute_layout_hash);

/// Get layout hash (cached)
pub fn layout_hash() -> u32 {
    *LAYOUT_HASH
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Complete layout information for serialization/logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: SCHEMA_VERSION,
            hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            feature_names: FEATURE_LAYOUT.iter().map(|s| s.name.to_string()).collect(),
        }
    }
}

impl Default for LayoutInfo {
    fn default() -> Self {
        Self::current()
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Error when feature layout doesn't match expected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Feature layout mismatch: expected v{expected_version} (hash: {expected_hash:08x}), got v{actual_version} (hash: {actual_hash:08x})"
)]
pub struct LayoutMismatchError {
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

/// Validate that incoming data matches current layout
pub fn validate_layout(incoming_version: u8, incoming_hash: u32) -> Result<(), LayoutMismatchError> {
    let current_hash = layout_hash();

    if incoming_version != SCHEMA_VERSION || incoming_hash != current_hash {
        return Err(LayoutMismatchError {
            expected_version: SCHEMA_VERSION,
            expected_hash: current_hash,
            actual_version: incoming_version,
            actual_hash: incoming_hash,
        });
    }

    Ok(())
}

// ============================================================================
// FEATURE INDEX LOOKUP
// ============================================================================

static NAME_INDEX: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    FEATURE_LAYOUT.iter().enumerate().map(|(i, spec)| (spec.name, i)).collect()
});

/// Get feature index by name
pub fn feature_index(name: &str) -> Option<usize> {
    NAME_INDEX.get(name).copied()
}

/// Get feature spec by index
pub fn feature_spec(index: usize) -> Option<&'static FeatureSpec> {
    FEATURE_LAYOUT.get(index)
}

/// Get feature name by index
pub fn feature_name(index: usize) -> Option<&'static str> {
    feature_spec(index).map(|s| s.name)
}

/// Get glossary code (`X{index+1}`) by index
pub fn feature_code(index: usize) -> Option<&'static str> {
    feature_spec(index).map(|s| s.code)
}

// ============================================================================
// GLOSSARY
// ============================================================================

/// One row of the variable glossary table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlossaryEntry {
    pub code: String,
    pub name: String,
    pub english: String,
}

/// Ordered code → name table shown next to the force plot
pub fn glossary() -> Vec<GlossaryEntry> {
    FEATURE_LAYOUT
        .iter()
        .map(|s| GlossaryEntry {
            code: s.code.to_string(),
            name: s.name.to_string(),
            english: s.english.to_string(),
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
