//! Semantic validation: internal consistency of a bundle.
//!
//! Checks run per overlay in bundle order, then on the capture base and the
//! bundle as a whole. Every finding is reported; nothing short-circuits.
//!
//! [`SemanticRules`] carries what the bundle itself cannot say: which custom
//! overlay kinds are language-scoped, and which languages must be covered.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use oca_bundle_core::{
    AttributeType, Bundle, Cardinality, CaptureBase, Overlay, OverlayBody, OverlayKind, Said,
};
use thiserror::Error;
use tracing::debug;

use crate::condition::Condition;
use crate::format::text_pattern;
use crate::report::ValidationReport;

/// A semantic inconsistency in a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("{overlay} overlay references unknown attribute {attribute:?}")]
    UnknownAttribute { overlay: String, attribute: String },

    #[error("duplicate {overlay} overlay for language {language:?}")]
    DuplicateOverlay { overlay: String, language: String },

    #[error("{overlay} overlay has no language")]
    MissingLanguage { overlay: String },

    #[error("entry code list for attribute {attribute:?} is empty")]
    EmptyEntryCodes { attribute: String },

    #[error("entry {code:?} of attribute {attribute:?} is not a declared entry code")]
    UndeclaredEntryCode { attribute: String, code: String },

    #[error("cardinality {value:?} of attribute {attribute:?} is malformed")]
    MalformedCardinality { attribute: String, value: String },

    #[error("conformance {value:?} of attribute {attribute:?} must be \"O\" or \"M\"")]
    InvalidConformance { attribute: String, value: String },

    #[error("condition of attribute {attribute:?} is invalid: {reason}")]
    InvalidCondition { attribute: String, reason: String },

    #[error("attribute {attribute:?} depends on unknown attribute {dependency:?}")]
    UnknownDependency { attribute: String, dependency: String },

    #[error("format of attribute {attribute:?} is not a valid pattern: {reason}")]
    InvalidFormat { attribute: String, reason: String },

    #[error("unit {unit:?} on attribute {attribute:?} of non-numeric type {attribute_type}")]
    UnitOnNonNumeric {
        attribute: String,
        unit: String,
        attribute_type: String,
    },

    #[error("{overlay} overlay belongs to capture base {found:?}, expected {expected}")]
    CaptureBaseMismatch {
        overlay: String,
        expected: Said,
        found: Option<Said>,
    },

    #[error("{target} digest {stored} does not match content digest {computed}")]
    DigestMismatch {
        target: String,
        stored: Said,
        computed: Said,
    },

    #[error("{target} digest could not be computed: {reason}")]
    DigestUnavailable { target: String, reason: String },

    #[error("Link overlay target {value:?} is not a bundle digest")]
    InvalidLinkTarget { value: Option<String> },

    #[error("entry code mapping {value:?} of attribute {attribute:?} must be \"code:target\"")]
    MalformedEntryCodeMapping { attribute: String, value: String },

    #[error("{overlay} overlay is missing a translation for language {language:?}")]
    MissingTranslation { overlay: String, language: String },
}

/// Context for semantic validation beyond the bundle itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SemanticRules {
    /// Type tags of custom overlay kinds that require a language.
    pub language_scoped_tags: BTreeSet<String>,
    /// Every language-scoped overlay kind present in the bundle must have
    /// an overlay in each of these languages.
    pub enforce_translations: Vec<String>,
}

impl SemanticRules {
    fn language_scoped(&self, overlay: &Overlay) -> bool {
        overlay.kind().language_scoped() || self.language_scoped_tags.contains(&overlay.type_tag())
    }
}

/// Validate the internal consistency of a bundle.
pub fn validate_semantics(bundle: &Bundle) -> ValidationReport<SemanticError> {
    validate_semantics_with(bundle, &SemanticRules::default())
}

/// [`validate_semantics`] under extra rules.
pub fn validate_semantics_with(
    bundle: &Bundle,
    rules: &SemanticRules,
) -> ValidationReport<SemanticError> {
    let mut report = ValidationReport::new();
    let capture_base = bundle.capture_base();
    let declared_codes = declared_entry_codes(bundle);
    let mut seen_languages: HashSet<(String, String)> = HashSet::new();

    for overlay in bundle.overlays() {
        let name = overlay_name(overlay);

        for attribute in overlay.body().attribute_references() {
            if !capture_base.has_attribute(attribute) {
                report.push(SemanticError::UnknownAttribute {
                    overlay: name.clone(),
                    attribute: attribute.to_string(),
                });
            }
        }

        check_language(overlay, &name, rules.language_scoped(overlay), &mut seen_languages, &mut report);
        check_body(overlay.body(), capture_base, &declared_codes, &mut report);
        check_overlay_integrity(overlay, &name, capture_base.digest(), &mut report);
    }

    check_translations(bundle, rules, &mut report);

    check_digest(
        "capture base",
        capture_base.digest(),
        capture_base.compute_digest(),
        &mut report,
    );
    check_digest("bundle", bundle.digest(), bundle.compute_digest(), &mut report);

    debug!(
        bundle = %bundle.digest(),
        errors = report.len(),
        "semantic validation finished"
    );
    report
}

fn overlay_name(overlay: &Overlay) -> String {
    match overlay.kind() {
        OverlayKind::Custom => overlay.type_tag(),
        kind => kind.name().to_string(),
    }
}

/// Union of EntryCode codes per attribute, across all EntryCode overlays.
fn declared_entry_codes(bundle: &Bundle) -> HashMap<&str, HashSet<&str>> {
    let mut codes: HashMap<&str, HashSet<&str>> = HashMap::new();
    for overlay in bundle.overlays_of(OverlayKind::EntryCode) {
        if let OverlayBody::EntryCode { attribute_entry_codes } = overlay.body() {
            for (attribute, list) in attribute_entry_codes {
                codes
                    .entry(attribute.as_str())
                    .or_default()
                    .extend(list.iter().map(String::as_str));
            }
        }
    }
    codes
}

fn check_language(
    overlay: &Overlay,
    name: &str,
    scoped: bool,
    seen: &mut HashSet<(String, String)>,
    report: &mut ValidationReport<SemanticError>,
) {
    match overlay.language() {
        None if scoped => report.push(SemanticError::MissingLanguage {
            overlay: name.to_string(),
        }),
        None => {}
        Some(language) => {
            // Custom overlays carrying a language are scoped by it too.
            if (scoped || overlay.kind() == OverlayKind::Custom)
                && !seen.insert((overlay.type_tag(), language.to_string()))
            {
                report.push(SemanticError::DuplicateOverlay {
                    overlay: name.to_string(),
                    language: language.to_string(),
                });
            }
        }
    }
}

/// Language-scoped kinds in first-appearance order, each checked against
/// every enforced language.
fn check_translations(
    bundle: &Bundle,
    rules: &SemanticRules,
    report: &mut ValidationReport<SemanticError>,
) {
    if rules.enforce_translations.is_empty() {
        return;
    }

    let mut kinds: Vec<(String, String)> = Vec::new();
    let mut present: HashSet<(String, &str)> = HashSet::new();
    for overlay in bundle.overlays().iter().filter(|o| rules.language_scoped(o)) {
        let tag = overlay.type_tag();
        if !kinds.iter().any(|(t, _)| *t == tag) {
            kinds.push((tag.clone(), overlay_name(overlay)));
        }
        if let Some(language) = overlay.language() {
            present.insert((tag, language));
        }
    }

    for (tag, name) in &kinds {
        for language in &rules.enforce_translations {
            if !present.contains(&(tag.clone(), language.as_str())) {
                report.push(SemanticError::MissingTranslation {
                    overlay: name.clone(),
                    language: language.clone(),
                });
            }
        }
    }
}

fn check_body(
    body: &OverlayBody,
    capture_base: &CaptureBase,
    declared_codes: &HashMap<&str, HashSet<&str>>,
    report: &mut ValidationReport<SemanticError>,
) {
    match body {
        OverlayBody::EntryCode { attribute_entry_codes } => {
            for (attribute, codes) in attribute_entry_codes {
                if codes.is_empty() {
                    report.push(SemanticError::EmptyEntryCodes {
                        attribute: attribute.clone(),
                    });
                }
            }
        }
        OverlayBody::Entry { attribute_entries } => {
            for (attribute, entries) in attribute_entries {
                let declared = declared_codes.get(attribute.as_str());
                for code in entries.keys() {
                    if !declared.is_some_and(|set| set.contains(code.as_str())) {
                        report.push(SemanticError::UndeclaredEntryCode {
                            attribute: attribute.clone(),
                            code: code.clone(),
                        });
                    }
                }
            }
        }
        OverlayBody::Cardinality { attribute_cardinalities } => {
            for (attribute, value) in attribute_cardinalities {
                if value.parse::<Cardinality>().is_err() {
                    report.push(SemanticError::MalformedCardinality {
                        attribute: attribute.clone(),
                        value: value.clone(),
                    });
                }
            }
        }
        OverlayBody::Conformance { attribute_conformances } => {
            for (attribute, value) in attribute_conformances {
                if value != "O" && value != "M" {
                    report.push(SemanticError::InvalidConformance {
                        attribute: attribute.clone(),
                        value: value.clone(),
                    });
                }
            }
        }
        OverlayBody::Conditional {
            attribute_conditions,
            attribute_dependencies,
        } => check_conditional(capture_base, attribute_conditions, attribute_dependencies, report),
        OverlayBody::Format { attribute_formats } => {
            for (attribute, pattern) in attribute_formats {
                let is_text = capture_base
                    .attribute(attribute)
                    .is_some_and(|ty| ty.is_of(AttributeType::Text));
                if !is_text {
                    continue;
                }
                if let Err(e) = text_pattern(pattern) {
                    report.push(SemanticError::InvalidFormat {
                        attribute: attribute.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        OverlayBody::Unit { attribute_units, .. } => {
            for (attribute, unit) in attribute_units {
                let Some(ty) = capture_base.attribute(attribute) else {
                    continue;
                };
                if !ty.is_of(AttributeType::Numeric) {
                    report.push(SemanticError::UnitOnNonNumeric {
                        attribute: attribute.clone(),
                        unit: unit.clone(),
                        attribute_type: ty.to_string(),
                    });
                }
            }
        }
        OverlayBody::Link { target_bundle, .. } => {
            if !target_bundle.as_deref().is_some_and(|t| t.parse::<Said>().is_ok()) {
                report.push(SemanticError::InvalidLinkTarget {
                    value: target_bundle.clone(),
                });
            }
        }
        OverlayBody::EntryCodeMapping { attribute_entry_codes_mapping } => {
            for (attribute, pairs) in attribute_entry_codes_mapping {
                for pair in pairs {
                    let well_formed = pair
                        .split_once(':')
                        .is_some_and(|(from, to)| !from.is_empty() && !to.is_empty());
                    if !well_formed {
                        report.push(SemanticError::MalformedEntryCodeMapping {
                            attribute: attribute.clone(),
                            value: pair.clone(),
                        });
                    }
                }
            }
        }
        _ => {}
    }
}

fn check_conditional(
    capture_base: &CaptureBase,
    conditions: &BTreeMap<String, String>,
    dependencies: &BTreeMap<String, Vec<String>>,
    report: &mut ValidationReport<SemanticError>,
) {
    for (attribute, text) in conditions {
        match Condition::parse(text) {
            Ok(condition) => {
                for variable in condition.variables() {
                    if !capture_base.has_attribute(variable) {
                        report.push(SemanticError::InvalidCondition {
                            attribute: attribute.clone(),
                            reason: format!("unknown attribute {variable:?}"),
                        });
                    }
                }
            }
            Err(e) => report.push(SemanticError::InvalidCondition {
                attribute: attribute.clone(),
                reason: e.to_string(),
            }),
        }
    }

    for (attribute, deps) in dependencies {
        for dependency in deps {
            if !capture_base.has_attribute(dependency) {
                report.push(SemanticError::UnknownDependency {
                    attribute: attribute.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
    }
}

fn check_overlay_integrity(
    overlay: &Overlay,
    name: &str,
    capture_base: &Said,
    report: &mut ValidationReport<SemanticError>,
) {
    if overlay.capture_base() != Some(capture_base) {
        report.push(SemanticError::CaptureBaseMismatch {
            overlay: name.to_string(),
            expected: *capture_base,
            found: overlay.capture_base().copied(),
        });
    }
    check_digest(
        &format!("{name} overlay"),
        overlay.digest(),
        overlay.compute_digest(),
        report,
    );
}

fn check_digest(
    target: &str,
    stored: &Said,
    computed: oca_bundle_core::Result<Said>,
    report: &mut ValidationReport<SemanticError>,
) {
    match computed {
        Ok(computed) if computed == *stored => {}
        Ok(computed) => report.push(SemanticError::DigestMismatch {
            target: target.to_string(),
            stored: *stored,
            computed,
        }),
        Err(e) => report.push(SemanticError::DigestUnavailable {
            target: target.to_string(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oca_bundle_core::CaptureBaseBuilder;
    use serde_json::json;

    fn capture_base() -> CaptureBase {
        CaptureBaseBuilder::new()
            .attribute("name", AttributeType::Text)
            .attribute("age", AttributeType::Numeric)
            .attribute("gender", AttributeType::Text)
            .build()
            .unwrap()
    }

    fn overlay(language: Option<&str>, body: OverlayBody) -> Overlay {
        Overlay::new(language.map(String::from), body).unwrap()
    }

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn bundle(overlays: Vec<Overlay>) -> Bundle {
        Bundle::new(None, capture_base(), overlays).unwrap()
    }

    #[test]
    fn test_valid_bundle() {
        let labels = overlay(
            Some("en"),
            OverlayBody::Label { attribute_labels: map(&[("name", "Name")]) },
        );
        let units = overlay(
            None,
            OverlayBody::Unit { metric_system: None, attribute_units: map(&[("age", "year")]) },
        );
        let report = validate_semantics(&bundle(vec![labels, units]));
        assert!(report.is_valid(), "{:?}", report.messages());
    }

    #[test]
    fn test_unknown_attribute() {
        let labels = overlay(
            Some("en"),
            OverlayBody::Label { attribute_labels: map(&[("nickname", "Nick")]) },
        );
        let report = validate_semantics(&bundle(vec![labels]));
        assert_eq!(
            report.errors(),
            &[SemanticError::UnknownAttribute {
                overlay: "Label".into(),
                attribute: "nickname".into()
            }]
        );
    }

    #[test]
    fn test_duplicate_and_missing_language() {
        let a = overlay(Some("en"), OverlayBody::Meta(map(&[("name", "A")])));
        let b = overlay(Some("en"), OverlayBody::Meta(map(&[("name", "B")])));
        let c = overlay(Some("fr"), OverlayBody::Meta(map(&[("name", "C")])));
        let d = overlay(None, OverlayBody::Label { attribute_labels: BTreeMap::new() });

        let report = validate_semantics(&bundle(vec![a, b, c, d]));
        assert_eq!(report.len(), 2);
        assert!(matches!(&report.errors()[0], SemanticError::DuplicateOverlay { language, .. } if language == "en"));
        assert!(matches!(&report.errors()[1], SemanticError::MissingLanguage { overlay } if overlay == "Label"));
    }

    #[test]
    fn test_entry_codes() {
        let mut codes = BTreeMap::new();
        codes.insert("gender".to_string(), vec!["M".to_string(), "F".to_string()]);
        codes.insert("name".to_string(), vec![]);
        let entry_codes = overlay(None, OverlayBody::EntryCode { attribute_entry_codes: codes });

        let mut entries = BTreeMap::new();
        entries.insert("gender".to_string(), map(&[("M", "Male"), ("X", "Other")]));
        let entry = overlay(Some("en"), OverlayBody::Entry { attribute_entries: entries });

        let report = validate_semantics(&bundle(vec![entry, entry_codes]));
        assert_eq!(
            report.errors(),
            &[
                SemanticError::UndeclaredEntryCode { attribute: "gender".into(), code: "X".into() },
                SemanticError::EmptyEntryCodes { attribute: "name".into() },
            ]
        );
    }

    #[test]
    fn test_value_checks() {
        let cardinality = overlay(
            None,
            OverlayBody::Cardinality {
                attribute_cardinalities: map(&[("name", "1..1"), ("age", "2..1")]),
            },
        );
        let conformance = overlay(
            None,
            OverlayBody::Conformance { attribute_conformances: map(&[("name", "M"), ("age", "ICAO 9303")]) },
        );
        let format = overlay(
            None,
            OverlayBody::Format { attribute_formats: map(&[("name", "[a-z"), ("age", "[not checked")]) },
        );
        let unit = overlay(
            None,
            OverlayBody::Unit { metric_system: None, attribute_units: map(&[("name", "cm")]) },
        );

        let report = validate_semantics(&bundle(vec![cardinality, conformance, format, unit]));
        let errors = report.errors();
        assert_eq!(errors.len(), 4, "{:?}", report.messages());
        assert!(matches!(&errors[0], SemanticError::MalformedCardinality { attribute, .. } if attribute == "age"));
        assert!(matches!(&errors[1], SemanticError::InvalidConformance { attribute, .. } if attribute == "age"));
        assert!(matches!(&errors[2], SemanticError::InvalidFormat { attribute, .. } if attribute == "name"));
        assert!(matches!(&errors[3], SemanticError::UnitOnNonNumeric { attribute, .. } if attribute == "name"));
    }

    #[test]
    fn test_conditional() {
        let mut deps = BTreeMap::new();
        deps.insert("gender".to_string(), vec!["age".to_string(), "height".to_string()]);
        let conditional = overlay(
            None,
            OverlayBody::Conditional {
                attribute_conditions: map(&[("gender", "${age} > 18"), ("name", "${weight} > 1"), ("age", "${name} >")]),
                attribute_dependencies: deps,
            },
        );

        let report = validate_semantics(&bundle(vec![conditional]));
        let messages = report.messages();
        assert_eq!(report.len(), 3, "{messages:?}");
        assert!(messages[0].contains("age"));
        assert!(messages[1].contains("weight"));
        assert!(messages[2].contains("height"));
    }

    #[test]
    fn test_link_and_entry_code_mapping() {
        let target = Said::compute(b"test", b"target").to_string();
        let good = overlay(
            None,
            OverlayBody::Link {
                target_bundle: Some(target),
                attribute_mapping: map(&[("name", "full_name")]),
            },
        );
        let bad = overlay(
            None,
            OverlayBody::Link {
                target_bundle: Some("not-a-digest".into()),
                attribute_mapping: BTreeMap::new(),
            },
        );
        let missing = overlay(
            None,
            OverlayBody::Link { target_bundle: None, attribute_mapping: BTreeMap::new() },
        );
        let mut pairs = BTreeMap::new();
        pairs.insert("gender".to_string(), vec!["M:male".to_string(), "F".to_string(), ":x".to_string()]);
        let mapping = overlay(None, OverlayBody::EntryCodeMapping { attribute_entry_codes_mapping: pairs });

        let report = validate_semantics(&bundle(vec![good, bad, missing, mapping]));
        assert_eq!(
            report.errors(),
            &[
                SemanticError::InvalidLinkTarget { value: Some("not-a-digest".into()) },
                SemanticError::InvalidLinkTarget { value: None },
                SemanticError::MalformedEntryCodeMapping { attribute: "gender".into(), value: "F".into() },
                SemanticError::MalformedEntryCodeMapping { attribute: "gender".into(), value: ":x".into() },
            ]
        );
    }

    #[test]
    fn test_language_scoped_custom_kind() {
        let body = || OverlayBody::Custom {
            type_tag: "overlay/layout/1.0.0".into(),
            properties: serde_json::Map::new(),
        };
        let unscoped = bundle(vec![overlay(None, body())]);
        assert!(validate_semantics(&unscoped).is_valid());

        let rules = SemanticRules {
            language_scoped_tags: ["overlay/layout/1.0.0".to_string()].into_iter().collect(),
            ..SemanticRules::default()
        };
        let report = validate_semantics_with(&unscoped, &rules);
        assert_eq!(
            report.errors(),
            &[SemanticError::MissingLanguage { overlay: "overlay/layout/1.0.0".into() }]
        );

        let scoped = bundle(vec![overlay(Some("en"), body())]);
        assert!(validate_semantics_with(&scoped, &rules).is_valid());
    }

    #[test]
    fn test_enforced_translations() {
        let label = |lang: &str| {
            overlay(Some(lang), OverlayBody::Label { attribute_labels: map(&[("name", "Name")]) })
        };
        let meta = overlay(Some("en"), OverlayBody::Meta(map(&[("name", "Person")])));
        let rules = SemanticRules {
            enforce_translations: vec!["en".into(), "fr".into()],
            ..SemanticRules::default()
        };

        let partial = bundle(vec![meta, label("en"), label("fr")]);
        assert!(validate_semantics(&partial).is_valid());
        assert_eq!(
            validate_semantics_with(&partial, &rules).errors(),
            &[SemanticError::MissingTranslation { overlay: "Meta".into(), language: "fr".into() }]
        );

        // Kinds absent from the bundle are not required.
        let labels_only = bundle(vec![label("fr"), label("en")]);
        assert!(validate_semantics_with(&labels_only, &rules).is_valid());
    }

    #[test]
    fn test_integrity_detects_tampering() {
        let labels = overlay(
            Some("en"),
            OverlayBody::Label { attribute_labels: map(&[("name", "Name")]) },
        );
        let original = bundle(vec![labels]);

        let mut json = serde_json::to_value(&original).unwrap();
        json["overlays"][0]["attribute_labels"]["name"] = json!("Changed");
        json["capture_base"]["attributes"]["extra"] = json!("Text");
        let tampered: Bundle = serde_json::from_value(json).unwrap();

        let report = validate_semantics(&tampered);
        let targets: Vec<_> = report
            .errors()
            .iter()
            .filter_map(|e| match e {
                SemanticError::DigestMismatch { target, .. } => Some(target.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(targets, vec!["Label overlay", "capture base"]);
    }

    #[test]
    fn test_foreign_capture_base_reference() {
        let labels = overlay(
            Some("en"),
            OverlayBody::Label { attribute_labels: map(&[("name", "Name")]) },
        );
        let original = bundle(vec![labels]);
        let mut json = serde_json::to_value(&original).unwrap();
        json["overlays"][0]["capture_base"] = json!(Said::compute(b"other", b"cb").to_string());
        let moved: Bundle = serde_json::from_value(json).unwrap();

        let report = validate_semantics(&moved);
        assert_eq!(report.len(), 1);
        assert!(matches!(report.errors()[0], SemanticError::CaptureBaseMismatch { .. }));
    }
}
