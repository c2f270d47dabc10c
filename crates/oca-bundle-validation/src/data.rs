//! Data validation: checking a JSON record against a bundle.
//!
//! Each capture-base attribute is checked in declaration order for
//! presence, type, array length, entry codes, format, character encoding
//! and unit. Fields the capture base does not declare are ignored.

use std::collections::{HashMap, HashSet};

use oca_bundle_core::{AttributeType, Bundle, Cardinality, NestedAttrType, OverlayBody};
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::condition::Condition;
use crate::format::{is_iso8601, text_pattern, CharacterEncoding, DateTimeFormat};
use crate::report::ValidationReport;

/// Data validation settings.
#[derive(Debug, Clone)]
pub struct DataValidationConfig {
    /// Whether an attribute with neither a cardinality nor a conformance
    /// must be present.
    pub required_by_default: bool,
}

impl Default for DataValidationConfig {
    fn default() -> Self {
        Self {
            required_by_default: true,
        }
    }
}

/// A data record finding. Every variant names the offending attribute;
/// array elements are named `attribute[index]`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataValidationError {
    #[error("data record must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("missing required attribute {attribute:?}")]
    MissingAttribute { attribute: String },

    #[error("attribute {attribute:?} must be {expected}, got {found}")]
    TypeMismatch {
        attribute: String,
        expected: String,
        found: &'static str,
    },

    #[error("attribute {attribute:?} has {count} elements, allowed {range}")]
    CardinalityViolation {
        attribute: String,
        count: usize,
        range: String,
    },

    #[error("attribute {attribute:?} value {value:?} is not an allowed entry code")]
    InvalidEntryCode { attribute: String, value: String },

    #[error("attribute {attribute:?} value {value:?} does not match format {format:?}")]
    FormatMismatch {
        attribute: String,
        value: String,
        format: String,
    },

    #[error("attribute {attribute:?} value is not valid {encoding}")]
    EncodingMismatch { attribute: String, encoding: String },

    #[error("attribute {attribute:?} with unit {unit:?} must be numeric")]
    NonNumericUnit { attribute: String, unit: String },
}

/// Validate a JSON record against a bundle.
pub fn validate_data(
    bundle: &Bundle,
    data: &Value,
    config: &DataValidationConfig,
) -> ValidationReport<DataValidationError> {
    let mut report = ValidationReport::new();
    let Value::Object(record) = data else {
        report.push(DataValidationError::NotAnObject(json_type(data)));
        return report;
    };

    let rules = Rules::collect(bundle);
    for (name, ty) in bundle.capture_base().attributes() {
        match record.get(name).filter(|v| !v.is_null()) {
            None => {
                if rules.is_required(name, record, config) {
                    report.push(DataValidationError::MissingAttribute {
                        attribute: name.clone(),
                    });
                }
            }
            Some(value) => {
                let checker = Checker {
                    rules: &rules,
                    attribute: name,
                };
                checker.check_top(ty, value, &mut report);
            }
        }
    }

    debug!(
        bundle = %bundle.digest(),
        errors = report.len(),
        "data validation finished"
    );
    report
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Per-attribute constraints gathered from the overlays. When several
/// overlays constrain the same attribute the first one wins, except for
/// entry codes, which are merged.
#[derive(Default)]
struct Rules<'a> {
    cardinalities: HashMap<&'a str, Cardinality>,
    conformances: HashMap<&'a str, &'a str>,
    conditions: HashMap<&'a str, Condition>,
    entry_codes: HashMap<&'a str, HashSet<&'a str>>,
    formats: HashMap<&'a str, &'a str>,
    text_formats: HashMap<&'a str, Regex>,
    encodings: HashMap<&'a str, &'a str>,
    default_encoding: Option<&'a str>,
    units: HashMap<&'a str, &'a str>,
}

impl<'a> Rules<'a> {
    fn collect(bundle: &'a Bundle) -> Self {
        let mut rules = Rules::default();
        let capture_base = bundle.capture_base();

        for overlay in bundle.overlays() {
            match overlay.body() {
                OverlayBody::Cardinality { attribute_cardinalities } => {
                    for (attr, value) in attribute_cardinalities {
                        // Malformed ranges are a semantic finding; ignore them here.
                        if let Ok(range) = value.parse() {
                            rules.cardinalities.entry(attr.as_str()).or_insert(range);
                        }
                    }
                }
                OverlayBody::Conformance { attribute_conformances } => {
                    for (attr, value) in attribute_conformances {
                        rules.conformances.entry(attr.as_str()).or_insert(value.as_str());
                    }
                }
                OverlayBody::Conditional { attribute_conditions, .. } => {
                    for (attr, text) in attribute_conditions {
                        if let Ok(condition) = Condition::parse(text) {
                            rules.conditions.entry(attr.as_str()).or_insert(condition);
                        }
                    }
                }
                OverlayBody::EntryCode { attribute_entry_codes } => {
                    for (attr, codes) in attribute_entry_codes {
                        rules
                            .entry_codes
                            .entry(attr.as_str())
                            .or_default()
                            .extend(codes.iter().map(String::as_str));
                    }
                }
                OverlayBody::Format { attribute_formats } => {
                    for (attr, format) in attribute_formats {
                        rules.formats.entry(attr.as_str()).or_insert(format.as_str());
                    }
                }
                OverlayBody::CharacterEncoding {
                    default_character_encoding,
                    attribute_character_encodings,
                } => {
                    if rules.default_encoding.is_none() {
                        rules.default_encoding = default_character_encoding.as_deref();
                    }
                    for (attr, encoding) in attribute_character_encodings {
                        rules.encodings.entry(attr.as_str()).or_insert(encoding.as_str());
                    }
                }
                OverlayBody::Unit { attribute_units, .. } => {
                    for (attr, unit) in attribute_units {
                        rules.units.entry(attr.as_str()).or_insert(unit.as_str());
                    }
                }
                _ => {}
            }
        }

        for (attr, pattern) in &rules.formats {
            let is_text = capture_base
                .attribute(attr)
                .is_some_and(|ty| ty.is_of(AttributeType::Text));
            if is_text {
                if let Ok(re) = text_pattern(pattern) {
                    rules.text_formats.insert(*attr, re);
                }
            }
        }
        rules
    }

    /// Cardinality first, then conformance, then the configured default.
    /// A condition that does not hold lifts the requirement.
    fn is_required(&self, attr: &str, record: &Map<String, Value>, config: &DataValidationConfig) -> bool {
        if let Some(condition) = self.conditions.get(attr) {
            if !condition.evaluate(record) {
                return false;
            }
        }
        if let Some(range) = self.cardinalities.get(attr) {
            return range.is_required();
        }
        match self.conformances.get(attr) {
            Some(&"M") => true,
            Some(&"O") => false,
            _ => config.required_by_default,
        }
    }
}

/// Checks for one attribute's value.
struct Checker<'r, 'a> {
    rules: &'r Rules<'a>,
    attribute: &'r str,
}

impl Checker<'_, '_> {
    fn check_top(&self, ty: &NestedAttrType, value: &Value, report: &mut ValidationReport<DataValidationError>) {
        if let (NestedAttrType::Array(_), Value::Array(items)) = (ty, value) {
            if let Some(range) = self.rules.cardinalities.get(self.attribute) {
                if !range.contains(items.len() as u64) {
                    report.push(DataValidationError::CardinalityViolation {
                        attribute: self.attribute.to_string(),
                        count: items.len(),
                        range: range.to_string(),
                    });
                }
            }
        }
        self.check(ty, value, self.attribute.to_string(), report);
    }

    fn check(
        &self,
        ty: &NestedAttrType,
        value: &Value,
        path: String,
        report: &mut ValidationReport<DataValidationError>,
    ) {
        let mismatch = |expected: String| DataValidationError::TypeMismatch {
            attribute: path.clone(),
            expected,
            found: json_type(value),
        };

        match ty {
            NestedAttrType::Array(inner) => match value {
                Value::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        self.check(inner, item, format!("{path}[{i}]"), report);
                    }
                }
                _ => report.push(mismatch(ty.to_string())),
            },
            NestedAttrType::Reference(_) => {
                if !value.is_object() {
                    report.push(mismatch(format!("an object ({ty})")));
                }
            }
            NestedAttrType::Value(primitive) => {
                let type_ok = match primitive {
                    AttributeType::Numeric => value.is_number(),
                    AttributeType::Boolean => value.is_boolean(),
                    AttributeType::Text | AttributeType::DateTime | AttributeType::Binary => {
                        value.is_string()
                    }
                };
                if !type_ok {
                    report.push(mismatch(primitive.to_string()));
                    return;
                }
                self.check_leaf(*primitive, value, &path, report);
            }
        }
    }

    fn check_leaf(
        &self,
        primitive: AttributeType,
        value: &Value,
        path: &str,
        report: &mut ValidationReport<DataValidationError>,
    ) {
        let rules = self.rules;
        let attr = self.attribute;

        if let Some(codes) = rules.entry_codes.get(attr) {
            let code = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if !codes.contains(code.as_str()) {
                report.push(DataValidationError::InvalidEntryCode {
                    attribute: path.to_string(),
                    value: code,
                });
            }
        }

        if let Some(unit) = rules.units.get(attr) {
            if !value.is_number() {
                report.push(DataValidationError::NonNumericUnit {
                    attribute: path.to_string(),
                    unit: unit.to_string(),
                });
            }
        }

        let Some(text) = value.as_str() else {
            return;
        };

        match primitive {
            AttributeType::DateTime => {
                let format = rules.formats.get(attr);
                let ok = match format {
                    Some(pattern) => DateTimeFormat::from_pattern(pattern).matches(text),
                    None => is_iso8601(text),
                };
                if !ok {
                    report.push(DataValidationError::FormatMismatch {
                        attribute: path.to_string(),
                        value: text.to_string(),
                        format: format.copied().unwrap_or("ISO 8601").to_string(),
                    });
                }
            }
            AttributeType::Text => {
                if let Some(re) = rules.text_formats.get(attr) {
                    if !re.is_match(text) {
                        report.push(DataValidationError::FormatMismatch {
                            attribute: path.to_string(),
                            value: text.to_string(),
                            format: rules.formats.get(attr).copied().unwrap_or_default().to_string(),
                        });
                    }
                }
            }
            _ => {}
        }

        let label = rules.encodings.get(attr).copied().or(rules.default_encoding);
        if let Some(label) = label {
            if let Some(encoding) = CharacterEncoding::from_label(label) {
                if !encoding.accepts(text) {
                    report.push(DataValidationError::EncodingMismatch {
                        attribute: path.to_string(),
                        encoding: label.to_string(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oca_bundle_core::{CaptureBaseBuilder, Overlay};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn bundle(attrs: &[(&str, &str)], bodies: Vec<OverlayBody>) -> Bundle {
        let mut builder = CaptureBaseBuilder::new();
        for (name, ty) in attrs {
            builder = builder.attribute(*name, ty.parse::<NestedAttrType>().unwrap());
        }
        let overlays = bodies
            .into_iter()
            .map(|body| Overlay::new(None, body).unwrap())
            .collect();
        Bundle::new(None, builder.build().unwrap(), overlays).unwrap()
    }

    fn validate(bundle: &Bundle, data: Value) -> ValidationReport<DataValidationError> {
        validate_data(bundle, &data, &DataValidationConfig::default())
    }

    #[test]
    fn test_not_an_object() {
        let b = bundle(&[("name", "Text")], vec![]);
        let report = validate(&b, json!([1, 2]));
        assert_eq!(report.errors(), &[DataValidationError::NotAnObject("array")]);
    }

    #[test]
    fn test_required_by_default_and_extra_fields() {
        let b = bundle(&[("name", "Text"), ("age", "Numeric")], vec![]);
        assert!(validate(&b, json!({"name": "Alice", "age": 42, "extra": true})).is_valid());

        let report = validate(&b, json!({"age": 42}));
        assert_eq!(report.len(), 1);
        assert!(report.messages()[0].contains("name"));

        let lenient = DataValidationConfig { required_by_default: false };
        assert!(validate_data(&b, &json!({}), &lenient).is_valid());
    }

    #[test]
    fn test_cardinality_presence() {
        let b = bundle(
            &[("id", "Text"), ("note", "Text")],
            vec![OverlayBody::Cardinality {
                attribute_cardinalities: map(&[("id", "1..1"), ("note", "0..1")]),
            }],
        );
        let report = validate(&b, json!({"note": null}));
        assert_eq!(
            report.errors(),
            &[DataValidationError::MissingAttribute { attribute: "id".into() }]
        );
    }

    #[test]
    fn test_conformance_presence() {
        let b = bundle(
            &[("id", "Text"), ("note", "Text")],
            vec![OverlayBody::Conformance {
                attribute_conformances: map(&[("id", "M"), ("note", "O")]),
            }],
        );
        let report = validate(&b, json!({}));
        assert_eq!(report.len(), 1);
        assert!(report.messages()[0].contains("\"id\""));
    }

    #[test]
    fn test_condition_waives_requirement() {
        let b = bundle(
            &[("age", "Numeric"), ("guardian", "Text")],
            vec![OverlayBody::Conditional {
                attribute_conditions: map(&[("guardian", "${age} < 18")]),
                attribute_dependencies: BTreeMap::new(),
            }],
        );
        assert!(validate(&b, json!({"age": 30})).is_valid());
        assert_eq!(validate(&b, json!({"age": 12})).len(), 1);
    }

    #[test]
    fn test_type_checks() {
        let b = bundle(
            &[("n", "Numeric"), ("b", "Boolean"), ("t", "Text"), ("r", "refn:address"), ("m", "Array[Array[Numeric]]")],
            vec![],
        );
        assert!(validate(
            &b,
            json!({"n": 1.5, "b": false, "t": "x", "r": {"street": "Main"}, "m": [[1, 2], []]})
        )
        .is_valid());

        let report = validate(
            &b,
            json!({"n": "1", "b": 0, "t": 1, "r": "addr", "m": [[1, "two"]]}),
        );
        let attributes: Vec<_> = report
            .errors()
            .iter()
            .map(|e| match e {
                DataValidationError::TypeMismatch { attribute, .. } => attribute.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(attributes, vec!["n", "b", "t", "r", "m[0][1]"]);
    }

    #[test]
    fn test_array_cardinality() {
        let b = bundle(
            &[("tags", "Array[Text]")],
            vec![OverlayBody::Cardinality {
                attribute_cardinalities: map(&[("tags", "1..2")]),
            }],
        );
        assert!(validate(&b, json!({"tags": ["a"]})).is_valid());
        let report = validate(&b, json!({"tags": ["a", "b", "c"]}));
        assert!(matches!(
            report.errors(),
            [DataValidationError::CardinalityViolation { count: 3, .. }]
        ));
    }

    #[test]
    fn test_entry_codes() {
        let mut codes = BTreeMap::new();
        codes.insert("gender".to_string(), vec!["M".to_string(), "F".to_string(), "X".to_string()]);
        let b = bundle(
            &[("gender", "Text")],
            vec![OverlayBody::EntryCode { attribute_entry_codes: codes }],
        );
        assert!(validate(&b, json!({"gender": "M"})).is_valid());

        let report = validate(&b, json!({"gender": "INVALID"}));
        assert_eq!(
            report.errors(),
            &[DataValidationError::InvalidEntryCode {
                attribute: "gender".into(),
                value: "INVALID".into()
            }]
        );
    }

    #[test]
    fn test_formats() {
        let b = bundle(
            &[("issued", "DateTime"), ("seen", "DateTime"), ("code", "Text"), ("photo", "Binary")],
            vec![OverlayBody::Format {
                attribute_formats: map(&[
                    ("issued", "YYYY-MM-DD"),
                    ("code", "[A-Z]{3}"),
                    ("photo", "image/jpeg"),
                ]),
            }],
        );
        assert!(validate(
            &b,
            json!({"issued": "2024-05-01", "seen": "2024-05-01T10:00:00Z", "code": "NLD", "photo": "..."})
        )
        .is_valid());

        let report = validate(
            &b,
            json!({"issued": "01/05/2024", "seen": "soon", "code": "nld", "photo": "..."}),
        );
        assert_eq!(report.len(), 3);
        assert!(report
            .errors()
            .iter()
            .all(|e| matches!(e, DataValidationError::FormatMismatch { .. })));
    }

    #[test]
    fn test_character_encoding() {
        let b = bundle(
            &[("country", "Text"), ("blob", "Text"), ("free", "Text")],
            vec![OverlayBody::CharacterEncoding {
                default_character_encoding: Some("utf-8".into()),
                attribute_character_encodings: map(&[("country", "iso-8859-1"), ("blob", "base64")]),
            }],
        );
        assert!(validate(&b, json!({"country": "España", "blob": "aGk=", "free": "日本"})).is_valid());

        let report = validate(&b, json!({"country": "日本", "blob": "%%", "free": "x"}));
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn test_unit_requires_number() {
        let b = bundle(
            &[("height", "Text")],
            vec![OverlayBody::Unit {
                metric_system: None,
                attribute_units: map(&[("height", "cm")]),
            }],
        );
        let report = validate(&b, json!({"height": "180"}));
        assert_eq!(
            report.errors(),
            &[DataValidationError::NonNumericUnit {
                attribute: "height".into(),
                unit: "cm".into()
            }]
        );
    }
}
