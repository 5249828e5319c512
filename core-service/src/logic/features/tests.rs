//! Integration Tests for the Features Module
//!
//! Tests schema + normalizer + vector hoạt động đúng khi kết hợp với nhau.

#[cfg(test)]
mod integration_tests {
    use crate::logic::features::{
        normalize, schema, FeatureKind, FeatureVector, InputError, RawInputs, RawValue,
        FEATURE_COUNT,
    };

    /// Every field at its minimum (numerical) or first option (categorical)
    fn minimum_inputs() -> RawInputs {
        schema()
            .iter()
            .map(|spec| {
                let value = match spec.kind {
                    FeatureKind::Numerical { min, .. } => min,
                    FeatureKind::Categorical { options } => options[0] as f64,
                };
                (spec.name.to_string(), RawValue::Number(value))
            })
            .collect()
    }

    #[test]
    fn test_minimum_inputs_match_defaults() {
        let vector = normalize(&minimum_inputs()).unwrap();
        assert_eq!(vector, FeatureVector::defaults());
        assert_eq!(vector.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_vector_follows_schema_order() {
        let mut raw = minimum_inputs();
        raw.insert("年龄".into(), RawValue::Number(35.0));
        raw.insert("家庭支持".into(), RawValue::Number(7.0));
        raw.insert("学历".into(), RawValue::Number(4.0));

        let vector = normalize(&raw).unwrap();
        assert_eq!(vector.get(0), Some(35.0));
        assert_eq!(vector.get(5), Some(4.0));
        assert_eq!(vector.get(31), Some(7.0));

        let labels = vector.labels();
        assert_eq!(labels[0], "X1=35");
        assert_eq!(labels[5], "X6=4");
        assert_eq!(labels[31], "X32=7");
    }

    #[test]
    fn test_first_failure_in_schema_order_wins() {
        let mut raw = minimum_inputs();
        raw.insert("心理弹性".into(), RawValue::Number(31.0));
        raw.insert("婚姻状况".into(), RawValue::Number(3.0));

        let err = normalize(&raw).unwrap_err();
        assert_eq!(err.feature(), "婚姻状况");
        assert!(matches!(err, InputError::InvalidCategory { .. }));
    }

    #[test]
    fn test_normalized_vector_is_layout_compatible() {
        let vector = normalize(&minimum_inputs()).unwrap();
        assert!(vector.is_compatible());
    }
}
