//! Natural-language rationale for a prediction

use super::confidence::{ConfidenceLabel, ImpactStrength};
use super::importance::FeatureImportance;
use crate::property::{FieldValue, PropertyRecord};

/// Builds the predicate of a phrase from the impact strength
type PhraseBuilder = fn(strength: &str) -> String;

/// Subject, unit appended to a provided value, and predicate for one feature
struct Phrase {
    feature: &'static str,
    subject: &'static str,
    unit: &'static str,
    predicate: PhraseBuilder,
}

impl Phrase {
    /// The unit is omitted when the value was not provided
    fn render(&self, value: Option<&FieldValue>, strength: &str) -> String {
        let shown = match value {
            Some(v) => format!("{}{}", render_value(v), self.unit),
            None => NOT_PROVIDED.to_string(),
        };
        format!("{} ({}) {}", self.subject, shown, (self.predicate)(strength))
    }
}

/// Phrase table keyed by canonical feature name
const PHRASES: &[Phrase] = &[
    Phrase {
        feature: "area_sqft",
        subject: "Property size",
        unit: " sq ft",
        predicate: |s| format!("has {} impact on value", s),
    },
    Phrase {
        feature: "distance_to_center",
        subject: "Distance to the city center",
        unit: " miles",
        predicate: |s| format!("has {} impact as a location factor", s),
    },
    Phrase {
        feature: "bedrooms",
        subject: "Number of bedrooms",
        unit: "",
        predicate: |s| format!("has {} influence on price", s),
    },
    Phrase {
        feature: "school_rating",
        subject: "School district quality",
        unit: "/10",
        predicate: |s| format!("provides {} premium value", s),
    },
    Phrase {
        feature: "age_years",
        subject: "Property age",
        unit: " years",
        predicate: |s| format!("has {} effect on depreciation", s),
    },
    Phrase {
        feature: "bathrooms",
        subject: "Number of bathrooms",
        unit: "",
        predicate: |s| format!("has {} impact on valuation", s),
    },
    Phrase {
        feature: "amenities_score",
        subject: "Local amenities score",
        unit: "/10",
        predicate: |s| format!("creates {} buyer appeal", s),
    },
    Phrase {
        feature: "crime_index",
        subject: "Crime levels",
        unit: "",
        predicate: |s| format!("have {} effect on desirability", s),
    },
    Phrase {
        feature: "market_trend",
        subject: "Market trend",
        unit: "",
        predicate: |s| format!("has {} influence on price momentum", s),
    },
    Phrase {
        feature: "environmental_score",
        subject: "Environmental quality",
        unit: "/10",
        predicate: |s| format!("has {} effect on value", s),
    },
];

const PROPERTY_TYPE_PREFIX: &str = "property_type_";

const NOT_PROVIDED: &str = "not provided";

fn property_type_phrase(value: &str, strength: &str) -> String {
    format!("Property type ({}) has {} market impact", value, strength)
}

fn generic_phrase(feature: &str, value: &str, strength: &str) -> String {
    format!("{} ({}) contributes {} to the valuation", humanize(feature), value, strength)
}

/// One phrase for `feature`, looking up its raw value in `record`
pub fn feature_phrase(feature: &str, weight: f64, record: &PropertyRecord) -> String {
    let strength = ImpactStrength::from_weight(weight).as_str();

    if let Some(phrase) = PHRASES.iter().find(|p| p.feature == feature) {
        return phrase.render(record.get(feature), strength);
    }
    if feature.starts_with(PROPERTY_TYPE_PREFIX) {
        let value = record
            .text("property_type")
            .map(|s| humanize(s.trim()))
            .unwrap_or_else(|| NOT_PROVIDED.to_string());
        return property_type_phrase(&value, strength);
    }
    let value = record
        .get(feature)
        .map(render_value)
        .unwrap_or_else(|| NOT_PROVIDED.to_string());
    generic_phrase(feature, &value, strength)
}

/// Full narrative: headline, top features by importance, confidence
pub fn build_narrative(
    predicted_price: f64,
    record: &PropertyRecord,
    importance: &FeatureImportance,
    top_k: usize,
    confidence: f64,
) -> String {
    let mut parts = vec![format!(
        "This property is predicted to be worth {}.",
        format_currency(predicted_price)
    )];

    let top = importance.top_k(top_k);
    if !top.is_empty() {
        let phrases: Vec<String> = top
            .iter()
            .map(|entry| feature_phrase(&entry.feature, entry.weight, record))
            .collect();
        parts.push(format!("Key factors influencing this valuation: {}.", phrases.join("; ")));
    }

    parts.push(format!(
        "Model confidence: {} ({:.0}%).",
        ConfidenceLabel::from_score(confidence),
        confidence * 100.0
    ));
    parts.join(" ")
}

fn render_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => humanize(s),
        FieldValue::Number(v) => format_number(*v),
    }
}

/// `single_family` -> `Single family`
fn humanize(raw: &str) -> String {
    let spaced = raw.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => spaced,
    }
}

/// Whole numbers get thousands separators; fractions keep up to two decimals
fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        group_thousands(v as i64)
    } else {
        let s = format!("{:.2}", v);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// `$650,000`
pub fn format_currency(v: f64) -> String {
    let rounded = v.round();
    if rounded < 0.0 {
        format!("-${}", group_thousands(-rounded as i64))
    } else {
        format!("${}", group_thousands(rounded as i64))
    }
}

fn group_thousands(v: i64) -> String {
    let digits = v.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if v < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
