//! One-hot encoding of categorical attributes

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

/// Category substituted for a missing categorical value
pub const MISSING_CATEGORY: &str = "missing";

/// Frozen vocabulary for one categorical attribute.
///
/// The lexicographically first observed category is the dropped reference
/// level; every other category gets its own dummy column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    attribute: String,
    categories: Vec<String>,
}

impl OneHotEncoder {
    /// Learn the vocabulary from observed values
    pub fn fit<'a>(attribute: &str, values: impl IntoIterator<Item = &'a str>) -> Self {
        let categories: BTreeSet<&str> = values.into_iter().collect();
        Self {
            attribute: attribute.to_string(),
            categories: categories.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Sorted observed vocabulary, dropped category included
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Reference category encoded as all zeros
    pub fn dropped(&self) -> Option<&str> {
        self.categories.first().map(String::as_str)
    }

    /// Categories that own a dummy column
    pub fn dummy_categories(&self) -> &[String] {
        self.categories.get(1..).unwrap_or(&[])
    }

    pub fn n_outputs(&self) -> usize {
        self.dummy_categories().len()
    }

    /// Output column names, `<attribute>_<category>`
    pub fn feature_names(&self) -> impl Iterator<Item = String> + '_ {
        self.dummy_categories()
            .iter()
            .map(move |c| format!("{}_{}", self.attribute, c))
    }

    /// Append the encoding of `value` to `out`.
    /// Unseen categories encode to all zeros.
    pub fn encode_into(&self, value: &str, out: &mut Vec<f64>) {
        let start = out.len();
        out.extend(std::iter::repeat(0.0).take(self.n_outputs()));

        match self.categories.binary_search_by(|c| c.as_str().cmp(value)) {
            Ok(0) => {}
            Ok(pos) => out[start + pos - 1] = 1.0,
            Err(_) => {
                warn!(
                    attribute = %self.attribute,
                    category = %value,
                    "Unseen category at transform time, encoding as all zeros"
                );
            }
        }
    }

    pub fn encode(&self, value: &str) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.n_outputs());
        self.encode_into(value, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn property_type_encoder() -> OneHotEncoder {
        OneHotEncoder::fit(
            "property_type",
            ["single_family", "condo", "townhouse", "condo", "multi_family"],
        )
    }

    #[test]
    fn test_vocabulary_sorted_and_first_dropped() {
        let enc = property_type_encoder();
        assert_eq!(enc.categories(), &["condo", "multi_family", "single_family", "townhouse"]);
        assert_eq!(enc.dropped(), Some("condo"));
        let names: Vec<String> = enc.feature_names().collect();
        assert_eq!(
            names,
            vec![
                "property_type_multi_family",
                "property_type_single_family",
                "property_type_townhouse"
            ]
        );
    }

    #[test]
    fn test_encode_known_and_reference() {
        let enc = property_type_encoder();
        assert_eq!(enc.encode("single_family"), vec![0.0, 1.0, 0.0]);
        assert_eq!(enc.encode("condo"), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unseen_category_all_zeros() {
        let enc = property_type_encoder();
        assert_eq!(enc.encode("castle"), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_single_category_has_no_outputs() {
        let enc = OneHotEncoder::fit("property_type", ["condo", "condo"]);
        assert_eq!(enc.n_outputs(), 0);
        assert!(enc.encode("condo").is_empty());
    }
}
