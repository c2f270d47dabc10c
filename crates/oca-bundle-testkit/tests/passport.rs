//! The passport fixture end to end.

use oca_bundle::registry::{FileRegistry, MemoryRegistry};
use oca_bundle::{DataValidationError, Engine, EngineConfig, OverlayKind};
use oca_bundle_testkit::fixtures::{
    build, invalid_passport, valid_passport, write_registry, GENDER, PASSPORT, PASSPORT_EXTRA,
    PERSON,
};
use serde_json::json;

#[test]
fn passport_builds_with_every_overlay_kind() {
    let bundle = build(PASSPORT);
    assert_eq!(bundle.name(), Some("passport-schema"));
    assert_eq!(bundle.capture_base().attributes().len(), 9);
    assert_eq!(bundle.overlays().len(), 19);
    for kind in OverlayKind::BUILTIN {
        assert!(bundle.overlays_of(kind).count() > 0, "no {kind} overlay");
    }
    assert_eq!(bundle.overlays_of(OverlayKind::Label).count(), 2);
}

#[test]
fn passport_is_semantically_valid() {
    let engine = Engine::builtin();
    let report = engine.validate_semantics(&build(PASSPORT));
    assert!(report.is_valid(), "{:?}", report.messages());
}

#[test]
fn passport_data() {
    let engine = Engine::builtin();
    let bundle = build(PASSPORT);

    let report = engine.validate_data(&bundle, &valid_passport());
    assert!(report.is_valid(), "{:?}", report.messages());

    let report = engine.validate_data(&bundle, &invalid_passport());
    let attributes: Vec<&str> = report
        .errors()
        .iter()
        .map(|e| match e {
            DataValidationError::MissingAttribute { attribute }
            | DataValidationError::TypeMismatch { attribute, .. }
            | DataValidationError::InvalidEntryCode { attribute, .. }
            | DataValidationError::FormatMismatch { attribute, .. } => attribute.as_str(),
            other => panic!("unexpected error {other}"),
        })
        .collect();
    assert_eq!(
        attributes,
        vec!["passport_number", "issue_date", "gender", "height", "guardian"]
    );
}

#[test]
fn passport_round_trips() {
    let engine = Engine::builtin();
    let bundle = build(PASSPORT);
    let text = engine.to_ocafile(&bundle);
    assert_eq!(engine.build(&text).unwrap(), bundle);
}

#[test]
fn small_fixtures() {
    let engine = Engine::builtin();
    let person = build(PERSON);
    assert!(engine
        .validate_data(&person, &json!({"name": "Alice", "age": 42}))
        .is_valid());

    let gender = build(GENDER);
    assert!(!engine.validate_data(&gender, &json!({"gender": "INVALID"})).is_valid());
    assert!(engine.validate_data(&gender, &json!({"gender": "X"})).is_valid());
}

#[test]
fn custom_overlay_from_registry_file() {
    let dir = tempfile::tempdir().unwrap();
    write_registry(dir.path()).unwrap();
    let registry = FileRegistry::from_dir(dir.path()).unwrap();
    let engine = Engine::new(registry, EngineConfig::default());

    let bundle = engine.build(PASSPORT_EXTRA).unwrap();
    assert_eq!(bundle.overlays()[0].type_tag(), "overlay/passport_extra/1.0.0");
    assert!(engine.validate_semantics(&bundle).is_valid());

    let rebuilt = engine.build(&engine.to_ocafile(&bundle)).unwrap();
    assert_eq!(rebuilt.digest(), bundle.digest());

    // The built-in registry cannot resolve the custom name.
    assert!(Engine::new(MemoryRegistry::default(), EngineConfig::default())
        .build(PASSPORT_EXTRA)
        .is_err());
}
