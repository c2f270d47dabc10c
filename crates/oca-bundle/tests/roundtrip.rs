//! OCAfile -> bundle -> OCAfile round trips and digest determinism.

use oca_bundle::{Engine, OverlayKind};
use proptest::prelude::*;

const SCHEMA: &str = r#"--name=membership
ADD CLASSIFICATION "org:membership"
ADD ATTRIBUTE member_id=Text joined=DateTime \
    fee=Numeric tags=Array[Text] card=refn:membership_card

ADD OVERLAY META
  language="en"
  name="Membership"
  description="Club membership record"

ADD OVERLAY LABEL
  language="en"
  attribute_labels
    member_id="Member ID"
    "fee"="Annual fee"

ADD OVERLAY UNIT
  metric_system="SI"
  attribute_units
    fee="EUR"

ADD OVERLAY FORMAT
  attribute_formats
    member_id="M-[0-9]{4}"
    joined="DD.MM.YYYY"

ADD OVERLAY CARDINALITY
  attribute_cardinalities
    tags="0..3"
"#;

const SCHEMA_RELAXED: &str = r#"
# same schema, different layout
--name=membership
add classification org:membership

Add Attribute member_id=TEXT \
        joined=datetime fee=numeric \
        tags=array[text] \
        card=REFN:membership_card
add overlay meta
    language=en
    description = "Club membership record"
    name="Membership"
add overlay Label
    language="en"
    attribute_labels
        fee="Annual fee"
        member_id="Member ID"
add overlay unit
    attribute_units
        fee="EUR"
    metric_system="SI"
ADD OVERLAY format
    attribute_formats
        joined="DD.MM.YYYY"
        member_id="M-[0-9]{4}"
add overlay CARDINALITY
    attribute_cardinalities
        tags=0..3
"#;

#[test]
fn round_trip_preserves_digest() {
    let engine = Engine::builtin();
    let bundle = engine.build(SCHEMA).unwrap();
    assert!(engine.validate_semantics(&bundle).is_valid());

    let text = engine.to_ocafile(&bundle);
    let rebuilt = engine.build(&text).unwrap();
    assert_eq!(rebuilt.digest(), bundle.digest());
    assert_eq!(rebuilt.name(), Some("membership"));
    assert_eq!(engine.to_ocafile(&rebuilt), text);
}

#[test]
fn layout_and_casing_do_not_change_digest() {
    let engine = Engine::builtin();
    let a = engine.build(SCHEMA).unwrap();
    let b = engine.build(SCHEMA_RELAXED).unwrap();
    assert_eq!(a.digest(), b.digest());
    assert_eq!(a.overlays().len(), 5);
    assert_eq!(a.overlays_of(OverlayKind::Unit).count(), 1);
}

#[test]
fn overlay_order_is_significant() {
    let engine = Engine::builtin();
    let first = engine
        .build("ADD ATTRIBUTE a=Text\nADD OVERLAY FORMAT\n  attribute_formats\n    a=\"x\"\nADD OVERLAY STANDARD\n  attribute_standards\n    a=\"y\"\n")
        .unwrap();
    let second = engine
        .build("ADD ATTRIBUTE a=Text\nADD OVERLAY STANDARD\n  attribute_standards\n    a=\"y\"\nADD OVERLAY FORMAT\n  attribute_formats\n    a=\"x\"\n")
        .unwrap();
    assert_eq!(first.capture_base().digest(), second.capture_base().digest());
    assert_ne!(first.digest(), second.digest());
}

#[test]
fn attribute_order_is_preserved_but_not_digested() {
    let engine = Engine::builtin();
    let a = engine.build("ADD ATTRIBUTE b=Text a=Numeric\n").unwrap();
    let b = engine.build("ADD ATTRIBUTE a=Numeric b=Text\n").unwrap();
    assert_eq!(a.digest(), b.digest());
    assert!(engine.to_ocafile(&a).starts_with("ADD ATTRIBUTE b=Text"));
}

#[test]
fn name_is_not_digested() {
    let engine = Engine::builtin();
    let named = engine.build("--name=one\nADD ATTRIBUTE a=Text\n").unwrap();
    let other = engine.build("--name=two\nADD ATTRIBUTE a=Text\n").unwrap();
    assert_eq!(named.digest(), other.digest());
}

proptest! {
    #[test]
    fn prop_label_text_survives_round_trip(label in "[ -~]{0,24}") {
        let engine = Engine::builtin();
        let bundle = engine
            .build(&format!(
                "ADD ATTRIBUTE a=Text\nADD OVERLAY LABEL\n  language=\"en\"\n  attribute_labels\n    a={}\n",
                serde_json::to_string(&label).unwrap()
            ))
            .unwrap();
        let rebuilt = engine.build(&engine.to_ocafile(&bundle)).unwrap();
        prop_assert_eq!(rebuilt.digest(), bundle.digest());
    }
}
