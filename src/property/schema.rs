//! Declared attribute ranges and record validation

use super::record::{FieldValue, PropertyRecord};
use crate::error::{PropvalError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maximum accepted length of a categorical value
const MAX_CATEGORY_LEN: usize = 64;

/// A numeric attribute with its admissible range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericField {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub required: bool,
    /// Only whole or half values are accepted (e.g. bathrooms)
    pub half_step: bool,
}

impl NumericField {
    pub fn required(name: &str, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            min,
            max,
            required: true,
            half_step: false,
        }
    }

    pub fn optional(name: &str, min: f64, max: f64) -> Self {
        Self {
            required: false,
            ..Self::required(name, min, max)
        }
    }

    pub fn with_half_step(mut self) -> Self {
        self.half_step = true;
        self
    }

    fn expected(&self) -> String {
        if self.half_step {
            format!("[{}, {}] in steps of 0.5", self.min, self.max)
        } else {
            format!("[{}, {}]", self.min, self.max)
        }
    }

    fn check(&self, value: f64) -> Result<()> {
        if !value.is_finite() || value < self.min || value > self.max {
            return Err(PropvalError::validation(&self.name, value, self.expected()));
        }
        if self.half_step && (value * 2.0).fract() != 0.0 {
            return Err(PropvalError::validation(&self.name, value, self.expected()));
        }
        Ok(())
    }
}

/// A categorical attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalField {
    pub name: String,
    pub required: bool,
    /// Values the business domain knows about. Informational: the encoder
    /// vocabulary is learned at fit time and anything else maps to zeros.
    pub known_values: Vec<String>,
}

/// The declared shape of a property record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    pub numeric: Vec<NumericField>,
    pub categorical: Vec<CategoricalField>,
}

impl Default for PropertySchema {
    fn default() -> Self {
        Self::housing()
    }
}

impl PropertySchema {
    /// Residential housing schema
    pub fn housing() -> Self {
        Self {
            numeric: vec![
                NumericField::required("area_sqft", 500.0, 20_000.0),
                NumericField::required("bedrooms", 0.0, 10.0),
                NumericField::required("bathrooms", 0.0, 10.0).with_half_step(),
                NumericField::required("age_years", 0.0, 200.0),
                NumericField::optional("amenities_score", 0.0, 10.0),
                NumericField::optional("distance_to_center", 0.0, 100.0),
                NumericField::optional("school_rating", 0.0, 10.0),
                NumericField::optional("crime_index", 0.0, 100.0),
                NumericField::optional("market_trend", 0.0, 5.0),
                NumericField::optional("environmental_score", 0.0, 10.0),
            ],
            categorical: vec![CategoricalField {
                name: "property_type".to_string(),
                required: true,
                known_values: ["single_family", "condo", "townhouse", "multi_family"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }],
        }
    }

    pub fn numeric_field(&self, name: &str) -> Option<&NumericField> {
        self.numeric.iter().find(|f| f.name == name)
    }

    pub fn categorical_field(&self, name: &str) -> Option<&CategoricalField> {
        self.categorical.iter().find(|f| f.name == name)
    }

    /// Whether `name` is a declared attribute
    pub fn declares(&self, name: &str) -> bool {
        self.numeric_field(name).is_some() || self.categorical_field(name).is_some()
    }

    /// Validate a complete record.
    ///
    /// Checks presence of required fields, value types, and numeric ranges.
    /// Undeclared fields are ignored.
    pub fn validate(&self, record: &PropertyRecord) -> Result<()> {
        for field in &self.numeric {
            match record.get(&field.name) {
                None if field.required => {
                    return Err(PropvalError::validation(
                        &field.name,
                        "<missing>",
                        format!("required number in {}", field.expected()),
                    ));
                }
                None => {}
                Some(FieldValue::Number(v)) => field.check(*v)?,
                Some(other) => {
                    return Err(PropvalError::validation(
                        &field.name,
                        other,
                        format!("number in {}", field.expected()),
                    ));
                }
            }
        }

        for field in &self.categorical {
            match record.get(&field.name) {
                None if field.required => {
                    return Err(PropvalError::validation(
                        &field.name,
                        "<missing>",
                        "required category",
                    ));
                }
                None => {}
                Some(FieldValue::Text(s)) => {
                    let trimmed = s.trim();
                    if trimmed.is_empty() || trimmed.len() > MAX_CATEGORY_LEN {
                        return Err(PropvalError::validation(
                            &field.name,
                            format!("{:?}", s),
                            format!("non-empty category of at most {} characters", MAX_CATEGORY_LEN),
                        ));
                    }
                }
                Some(other) => {
                    return Err(PropvalError::validation(&field.name, other, "category text"));
                }
            }
        }

        for (name, _) in record.iter() {
            if !self.declares(name) {
                debug!(field = %name, "Ignoring undeclared field");
            }
        }

        Ok(())
    }

    /// Validate a sparse override map: every key must be declared and every
    /// value must satisfy its field's constraints.
    pub fn validate_overrides(&self, overrides: &PropertyRecord) -> Result<()> {
        for (name, value) in overrides.iter() {
            if let Some(field) = self.numeric_field(name) {
                match value {
                    FieldValue::Number(v) => field.check(*v)?,
                    other => {
                        return Err(PropvalError::validation(
                            name,
                            other,
                            format!("number in {}", field.expected()),
                        ))
                    }
                }
            } else if self.categorical_field(name).is_some() {
                if value.as_text().map_or(true, |s| s.trim().is_empty()) {
                    return Err(PropvalError::validation(name, value, "category text"));
                }
            } else {
                return Err(PropvalError::validation(name, value, "a declared field"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_record() -> PropertyRecord {
        PropertyRecord::new()
            .with_number("area_sqft", 2500.0)
            .with_number("bedrooms", 4.0)
            .with_number("bathrooms", 3.5)
            .with_number("age_years", 15.0)
            .with_category("property_type", "single_family")
    }

    #[test]
    fn test_valid_record_passes() {
        let schema = PropertySchema::housing();
        assert!(schema.validate(&valid_record()).is_ok());
    }

    #[test]
    fn test_area_below_minimum_rejected() {
        let schema = PropertySchema::housing();
        let record = valid_record().with_number("area_sqft", 100.0);
        let err = schema.validate(&record).unwrap_err();
        assert_eq!(err.field(), Some("area_sqft"));
        match err {
            PropvalError::Validation { value, expected, .. } => {
                assert_eq!(value, "100");
                assert!(expected.contains("500"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_quarter_bathroom_rejected() {
        let schema = PropertySchema::housing();
        let record = valid_record().with_number("bathrooms", 2.25);
        assert_eq!(schema.validate(&record).unwrap_err().field(), Some("bathrooms"));
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let schema = PropertySchema::housing();
        let mut record = valid_record();
        record.remove("bedrooms");
        assert_eq!(schema.validate(&record).unwrap_err().field(), Some("bedrooms"));
    }

    #[test]
    fn test_nan_rejected() {
        let schema = PropertySchema::housing();
        let record = valid_record().with_number("school_rating", f64::NAN);
        assert_eq!(schema.validate(&record).unwrap_err().field(), Some("school_rating"));
    }

    #[test]
    fn test_text_for_numeric_rejected() {
        let schema = PropertySchema::housing();
        let record = valid_record().with_category("bedrooms", "four");
        assert_eq!(schema.validate(&record).unwrap_err().field(), Some("bedrooms"));
    }

    #[test]
    fn test_unknown_override_key_rejected() {
        let schema = PropertySchema::housing();
        let overrides = PropertyRecord::new().with_number("pool_count", 1.0);
        assert_eq!(
            schema.validate_overrides(&overrides).unwrap_err().field(),
            Some("pool_count")
        );
    }

    #[test]
    fn test_undeclared_field_ignored() {
        let schema = PropertySchema::housing();
        let record = valid_record().with_category("zip_code", "94102");
        assert!(schema.validate(&record).is_ok());
    }
}
