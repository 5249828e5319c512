//! Input Normalizer
//!
//! Chuyển raw input (form/JSON) thành FeatureVector đúng thứ tự schema.
//! Missing values fall back to the schema default; nothing else is guessed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::layout::{feature_index, FeatureKind, FeatureSpec, FEATURE_COUNT, FEATURE_LAYOUT};
use super::vector::{format_value, FeatureVector};

// ============================================================================
// RAW INPUT
// ============================================================================

/// A value as submitted: JSON number or form text.
/// `null` counts as absent; any other JSON shape reaches validation as `Other`
/// so the error can name the feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RawValue {
    /// Coerce to a finite real number
    pub fn coerce(&self) -> Option<f64> {
        let value = match self {
            RawValue::Number(n) => *n,
            RawValue::Text(s) => s.trim().parse::<f64>().ok()?,
            RawValue::Null | RawValue::Other(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Blank form fields and JSON null count as absent
    fn is_blank(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    fn display(&self) -> String {
        match self {
            RawValue::Number(n) => format_value(*n),
            RawValue::Text(s) => s.trim().to_string(),
            RawValue::Null => "null".to_string(),
            RawValue::Other(v) => v.to_string(),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Number(value as f64)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

/// Feature name → raw value, one entry per submitted field
pub type RawInputs = HashMap<String, RawValue>;

// ============================================================================
// ERRORS
// ============================================================================

/// Recoverable input problem, always tied to one feature
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputError {
    #[error("{feature}: value {value} is outside [{min}, {max}]")]
    OutOfRange { feature: String, value: f64, min: f64, max: f64 },

    #[error("{feature}: value '{value}' is not one of {options:?}")]
    InvalidCategory { feature: String, value: String, options: Vec<i64> },

    #[error("{feature}: '{raw}' is not a finite number")]
    InvalidNumber { feature: String, raw: String },

    #[error("unknown feature '{feature}'")]
    UnknownFeature { feature: String },
}

impl InputError {
    /// Name of the feature that failed
    pub fn feature(&self) -> &str {
        match self {
            InputError::OutOfRange { feature, .. }
            | InputError::InvalidCategory { feature, .. }
            | InputError::InvalidNumber { feature, .. }
            | InputError::UnknownFeature { feature } => feature,
        }
    }
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Convert raw inputs into a validated vector; stops at the first bad feature
pub fn normalize(raw: &RawInputs) -> Result<FeatureVector, InputError> {
    normalize_report(raw).map_err(|mut errors| errors.swap_remove(0))
}

/// Like [`normalize`] but reports every bad feature, in schema order
/// (unknown names last, sorted)
pub fn normalize_report(raw: &RawInputs) -> Result<FeatureVector, Vec<InputError>> {
    let mut errors = Vec::new();
    let mut values = [0.0f64; FEATURE_COUNT];

    for (i, spec) in FEATURE_LAYOUT.iter().enumerate() {
        match normalize_one(spec, raw.get(spec.name)) {
            Ok(v) => values[i] = v,
            Err(e) => errors.push(e),
        }
    }

    let mut unknown: Vec<&String> = raw.keys().filter(|k| feature_index(k).is_none()).collect();
    unknown.sort();
    errors.extend(unknown.into_iter().map(|k| InputError::UnknownFeature { feature: k.clone() }));

    if errors.is_empty() {
        Ok(FeatureVector::from_values(values))
    } else {
        Err(errors)
    }
}

fn normalize_one(spec: &FeatureSpec, raw: Option<&RawValue>) -> Result<f64, InputError> {
    let raw = match raw {
        Some(r) if !r.is_blank() => r,
        _ => return Ok(spec.default_value()),
    };

    match spec.kind {
        FeatureKind::Numerical { min, max, .. } => {
            let value = raw.coerce().ok_or_else(|| InputError::InvalidNumber {
                feature: spec.name.to_string(),
                raw: raw.display(),
            })?;
            if !spec.accepts(value) {
                return Err(InputError::OutOfRange {
                    feature: spec.name.to_string(),
                    value,
                    min,
                    max,
                });
            }
            Ok(value)
        }
        FeatureKind::Categorical { options } => match raw.coerce() {
            Some(value) if spec.accepts(value) => Ok(value),
            _ => Err(InputError::InvalidCategory {
                feature: spec.name.to_string(),
                value: raw.display(),
                options: options.to_vec(),
            }),
        },
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::layout::schema;

    fn inputs(pairs: &[(&str, RawValue)]) -> RawInputs {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_empty_input_uses_defaults() {
        let vector = normalize(&RawInputs::new()).unwrap();
        assert_eq!(vector, FeatureVector::defaults());
    }

    #[test]
    fn test_numerical_bounds_are_inclusive() {
        for spec in schema() {
            if let FeatureKind::Numerical { min, max, .. } = spec.kind {
                assert!(normalize(&inputs(&[(spec.name, min.into())])).is_ok(), "{} min", spec.name);
                assert!(normalize(&inputs(&[(spec.name, max.into())])).is_ok(), "{} max", spec.name);

                for bad in [min - 0.5, max + 0.5] {
                    let err = normalize(&inputs(&[(spec.name, bad.into())])).unwrap_err();
                    assert!(matches!(err, InputError::OutOfRange { .. }), "{}", spec.name);
                    assert_eq!(err.feature(), spec.name);
                }
            }
        }
    }

    #[test]
    fn test_categorical_rejects_non_members() {
        for spec in schema() {
            if let FeatureKind::Categorical { options } = spec.kind {
                for &o in options {
                    assert!(normalize(&inputs(&[(spec.name, o.into())])).is_ok());
                }
                for bad in [0i64, 99, -1] {
                    let err = normalize(&inputs(&[(spec.name, bad.into())])).unwrap_err();
                    assert!(matches!(err, InputError::InvalidCategory { .. }), "{}", spec.name);
                    assert_eq!(err.feature(), spec.name);
                }
            }
        }
    }

    #[test]
    fn test_residence_99_names_the_feature() {
        let err = normalize(&inputs(&[("居住地", 99i64.into())])).unwrap_err();
        assert_eq!(
            err,
            InputError::InvalidCategory {
                feature: "居住地".to_string(),
                value: "99".to_string(),
                options: vec![1, 2],
            }
        );
        assert!(err.to_string().contains("居住地"));
    }

    #[test]
    fn test_fractional_category_rejected() {
        let err = normalize(&inputs(&[("学历", 2.5.into())])).unwrap_err();
        assert!(matches!(err, InputError::InvalidCategory { .. }));
    }

    #[test]
    fn test_text_values_are_coerced() {
        let vector = normalize(&inputs(&[
            ("年龄", " 30 ".into()),
            ("学历", "3".into()),
            ("体重", "".into()),
        ]))
        .unwrap();
        assert_eq!(vector.get_by_name("年龄"), Some(30.0));
        assert_eq!(vector.get_by_name("学历"), Some(3.0));
        assert_eq!(vector.get_by_name("体重"), Some(52.0));
    }

    #[test]
    fn test_non_numeric_text() {
        let err = normalize(&inputs(&[("年龄", "thirty".into())])).unwrap_err();
        assert_eq!(
            err,
            InputError::InvalidNumber { feature: "年龄".to_string(), raw: "thirty".to_string() }
        );

        let err = normalize(&inputs(&[("年龄", f64::NAN.into())])).unwrap_err();
        assert!(matches!(err, InputError::InvalidNumber { .. }));
    }

    #[test]
    fn test_unknown_feature_rejected() {
        let err = normalize(&inputs(&[("年齡", 20i64.into())])).unwrap_err();
        assert_eq!(err, InputError::UnknownFeature { feature: "年齡".to_string() });
    }

    #[test]
    fn test_report_collects_all_errors_in_schema_order() {
        let errors = normalize_report(&inputs(&[
            ("家庭支持", 11i64.into()),
            ("年龄", 10i64.into()),
            ("居住地", 3i64.into()),
            ("zzz", 1i64.into()),
        ]))
        .unwrap_err();

        let names: Vec<&str> = errors.iter().map(|e| e.feature()).collect();
        assert_eq!(names, vec!["年龄", "居住地", "家庭支持", "zzz"]);
    }

    #[test]
    fn test_error_serializes_with_kind() {
        let err = InputError::OutOfRange { feature: "焦虑".into(), value: 5.0, min: 0.0, max: 4.0 };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "out_of_range");
        assert_eq!(json["feature"], "焦虑");
    }

    #[test]
    fn test_raw_value_deserializes_number_or_text() {
        let raw: RawInputs = serde_json::from_str(r#"{"年龄": 25, "学历": "2"}"#).unwrap();
        assert_eq!(raw["年龄"], RawValue::Number(25.0));
        assert_eq!(raw["学历"], RawValue::Text("2".to_string()));
    }

    #[test]
    fn test_json_null_is_absent() {
        let raw: RawInputs = serde_json::from_str(r#"{"年龄": null, "居住地": null}"#).unwrap();
        assert_eq!(raw["年龄"], RawValue::Null);
        assert_eq!(normalize(&raw).unwrap(), FeatureVector::defaults());
    }

    #[test]
    fn test_json_bool_and_array_name_the_feature() {
        let raw: RawInputs = serde_json::from_str(r#"{"居住地": true}"#).unwrap();
        let err = normalize(&raw).unwrap_err();
        assert_eq!(
            err,
            InputError::InvalidCategory {
                feature: "居住地".to_string(),
                value: "true".to_string(),
                options: vec![1, 2],
            }
        );

        let raw: RawInputs = serde_json::from_str(r#"{"年龄": [30]}"#).unwrap();
        let err = normalize(&raw).unwrap_err();
        assert_eq!(
            err,
            InputError::InvalidNumber { feature: "年龄".to_string(), raw: "[30]".to_string() }
        );
    }
}
