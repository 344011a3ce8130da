//! Integration tests for validation and the feature pipeline

use propval::preprocessing::{FeaturePipeline, PreprocessingConfig, ScalerType};
use propval::property::{FieldValue, PropertyRecord, PropertySchema};
use propval::synthetic::SyntheticHousingGenerator;
use propval::PropvalError;

fn house() -> PropertyRecord {
    PropertyRecord::new()
        .with_number("area_sqft", 2500.0)
        .with_number("bedrooms", 4.0)
        .with_number("bathrooms", 3.0)
        .with_number("age_years", 10.0)
        .with_category("property_type", "single_family")
}

// ============================================================================
// Schema validation
// ============================================================================

#[test]
fn test_valid_record_passes() {
    let schema = PropertySchema::housing();
    assert!(schema.validate(&house()).is_ok());
}

#[test]
fn test_missing_required_field_names_the_field() {
    let schema = PropertySchema::housing();
    let mut record = house();
    record.remove("bedrooms");

    let err = schema.validate(&record).unwrap_err();
    assert_eq!(err.field(), Some("bedrooms"));
}

#[test]
fn test_out_of_range_and_non_finite_rejected() {
    let schema = PropertySchema::housing();

    let too_small = house().with_number("area_sqft", 100.0);
    assert_eq!(schema.validate(&too_small).unwrap_err().field(), Some("area_sqft"));

    let nan = house().with_number("age_years", f64::NAN);
    assert_eq!(schema.validate(&nan).unwrap_err().field(), Some("age_years"));

    let inf = house().with_number("crime_index", f64::INFINITY);
    assert_eq!(schema.validate(&inf).unwrap_err().field(), Some("crime_index"));
}

#[test]
fn test_bathrooms_half_steps_only() {
    let schema = PropertySchema::housing();
    assert!(schema.validate(&house().with_number("bathrooms", 2.5)).is_ok());

    let err = schema.validate(&house().with_number("bathrooms", 2.25)).unwrap_err();
    assert_eq!(err.field(), Some("bathrooms"));
}

#[test]
fn test_wrong_type_rejected() {
    let schema = PropertySchema::housing();
    let mut record = house();
    record.set("bedrooms", FieldValue::Text("four".to_string()));
    assert!(matches!(schema.validate(&record), Err(PropvalError::Validation { .. })));
}

#[test]
fn test_undeclared_fields_ignored() {
    let schema = PropertySchema::housing();
    let record = house().with_category("city", "Austin").with_number("latitude", 30.2);
    assert!(schema.validate(&record).is_ok());
}

#[test]
fn test_record_json_shape() {
    let record: PropertyRecord =
        serde_json::from_str(r#"{"area_sqft": 2500, "property_type": "condo"}"#).unwrap();
    assert_eq!(record.number("area_sqft"), Some(2500.0));
    assert_eq!(record.text("property_type"), Some("condo"));
}

// ============================================================================
// Feature pipeline
// ============================================================================

#[test]
fn test_fitted_feature_layout() {
    let data = SyntheticHousingGenerator::new(300).generate().unwrap();
    let schema = PropertySchema::housing();
    let fitted = FeaturePipeline::new().fit(&schema, &data.records()).unwrap();

    let names = fitted.feature_names();
    assert_eq!(names.len(), 13);
    assert_eq!(names[0], "area_sqft");
    assert!(names.contains(&"property_type_single_family".to_string()));
    assert!(names.contains(&"property_type_townhouse".to_string()));
    // Lexicographically first category is the dropped reference
    assert!(!names.contains(&"property_type_condo".to_string()));
}

#[test]
fn test_transform_is_deterministic_and_fixed_length() {
    let data = SyntheticHousingGenerator::new(200).generate().unwrap();
    let fitted = FeaturePipeline::new()
        .fit(&PropertySchema::housing(), &data.records())
        .unwrap();

    let a = fitted.transform(&house()).unwrap();
    let b = fitted.transform(&house()).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), fitted.n_features());
    assert!(a.values.iter().all(|v| v.is_finite()));
}

#[test]
fn test_missing_optional_field_imputed_with_median() {
    let data = SyntheticHousingGenerator::new(200).generate().unwrap();
    let config = PreprocessingConfig::default().with_scaler(ScalerType::None);
    let fitted = FeaturePipeline::with_config(config)
        .fit(&PropertySchema::housing(), &data.records())
        .unwrap();

    let stats = fitted.numeric_stats();
    let school = stats.iter().find(|s| s.name == "school_rating").unwrap();
    let vector = fitted.transform(&house()).unwrap();
    assert_eq!(vector.get("school_rating"), Some(school.median));
}

#[test]
fn test_unseen_category_encodes_as_zeros() {
    let data = SyntheticHousingGenerator::new(200).generate().unwrap();
    let fitted = FeaturePipeline::new()
        .fit(&PropertySchema::housing(), &data.records())
        .unwrap();

    let record = house().with_category("property_type", "castle");
    let vector = fitted.transform(&record).unwrap();
    for name in fitted.feature_names().iter().filter(|n| n.starts_with("property_type_")) {
        assert_eq!(vector.get(name), Some(0.0));
    }
}

#[test]
fn test_transform_validates_record() {
    let data = SyntheticHousingGenerator::new(100).generate().unwrap();
    let fitted = FeaturePipeline::new()
        .fit(&PropertySchema::housing(), &data.records())
        .unwrap();

    let bad = house().with_number("bedrooms", 50.0);
    assert_eq!(fitted.transform(&bad).unwrap_err().field(), Some("bedrooms"));
}

#[test]
fn test_fit_rejects_empty_input() {
    let result = FeaturePipeline::new().fit(&PropertySchema::housing(), &[]);
    assert!(matches!(result, Err(PropvalError::TrainingFailure(_))));
}
