//! Proptest generators for property-based testing.
//!
//! [`ocafile`] produces syntax trees that always assemble with the built-in
//! registry: attribute names are unique and overlays only use keys their
//! kind defines. Overlays may reference any declared attribute, so the
//! resulting bundles are not necessarily semantically valid.

use proptest::prelude::*;

use oca_bundle_core::{AttributeType, NestedAttrType};
use oca_bundle_file::{Command, CommandKind, OcaFile, Property, PropertyValue};

/// Generate a primitive attribute type.
pub fn attribute_type() -> impl Strategy<Value = AttributeType> {
    prop::sample::select(AttributeType::ALL.to_vec())
}

/// Generate an attribute type, nested up to two arrays deep.
pub fn nested_type() -> impl Strategy<Value = NestedAttrType> {
    let leaf = attribute_type().prop_map(NestedAttrType::Value);
    leaf.prop_recursive(2, 4, 1, |inner| {
        inner.prop_map(|t| NestedAttrType::Array(Box::new(t)))
    })
}

/// Generate an attribute name.
pub fn attribute_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}".prop_map(String::from)
}

/// Generate a schema name usable in a `--name=` header.
pub fn schema_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}".prop_map(String::from)
}

/// Generate a text value, quotes and backslashes included.
pub fn text_value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,:/()\"\\\\-]{0,20}".prop_map(String::from)
}

/// Generate a language code.
pub fn language() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["en", "es", "fr", "nl", "pl"]).prop_map(String::from)
}

/// Generate unique attributes in random declaration order.
pub fn attributes() -> impl Strategy<Value = Vec<(String, NestedAttrType)>> {
    prop::collection::btree_map(attribute_name(), nested_type(), 1..8)
        .prop_map(|m| m.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

fn overlay(name: &str, properties: Vec<Property>) -> CommandKind {
    CommandKind::AddOverlay {
        name: name.to_string(),
        properties,
    }
}

fn text_block(key: &str, entries: Vec<(String, String)>) -> Property {
    Property::block(
        key,
        entries.into_iter().map(|(k, v)| Property::text(k, v)).collect(),
    )
}

fn subset(names: &[String]) -> impl Strategy<Value = Vec<String>> {
    let names = names.to_vec();
    let len = names.len();
    prop::sample::subsequence(names, 0..=len)
}

/// Generate one `ADD OVERLAY` command over the given attribute names.
pub fn overlay_command(names: Vec<String>) -> impl Strategy<Value = CommandKind> {
    let labels = (
        language(),
        prop::sample::select(vec!["Label", "LABEL", "label"]),
        subset(&names).prop_flat_map(|keys| {
            let n = keys.len();
            (Just(keys), prop::collection::vec(text_value(), n))
        }),
    )
        .prop_map(|(lang, name, (keys, values))| {
            overlay(
                name,
                vec![
                    Property::text("language", lang),
                    text_block("attribute_labels", keys.into_iter().zip(values).collect()),
                ],
            )
        });

    let meta = (language(), text_value(), text_value()).prop_map(|(lang, name, description)| {
        overlay(
            "Meta",
            vec![
                Property::text("language", lang),
                Property::text("name", name),
                Property::text("description", description),
            ],
        )
    });

    let formats = (
        prop::sample::select(vec!["Format", "Standard", "Mapping", "CHARACTER_ENCODING"]),
        subset(&names).prop_flat_map(|keys| {
            let n = keys.len();
            (Just(keys), prop::collection::vec(text_value(), n))
        }),
    )
        .prop_map(|(name, (keys, values))| {
            let key = match name {
                "Format" => "attribute_formats",
                "Standard" => "attribute_standards",
                "Mapping" => "attribute_mappings",
                _ => "attribute_character_encodings",
            };
            overlay(name, vec![text_block(key, keys.into_iter().zip(values).collect())])
        });

    let cardinalities = subset(&names)
        .prop_flat_map(|keys| {
            let n = keys.len();
            (Just(keys), prop::collection::vec((0u64..3, prop::option::of(0u64..3)), n))
        })
        .prop_map(|(keys, ranges)| {
            let entries = keys
                .into_iter()
                .zip(ranges)
                .map(|(k, (min, max))| {
                    let range = match max {
                        Some(extra) => format!("{min}..{}", min + extra),
                        None => format!("{min}..*"),
                    };
                    (k, range)
                })
                .collect();
            overlay("CARDINALITY", vec![text_block("attribute_cardinalities", entries)])
        });

    let entry_codes = subset(&names)
        .prop_flat_map(|keys| {
            let n = keys.len();
            (
                Just(keys),
                prop::collection::vec(prop::collection::btree_set("[A-Z0-9]{1,3}", 1..4), n),
            )
        })
        .prop_map(|(keys, codes)| {
            let children = keys
                .into_iter()
                .zip(codes)
                .map(|(k, codes)| Property::new(k, PropertyValue::Array(codes.into_iter().collect())))
                .collect();
            overlay("entry-code", vec![Property::block("attribute_entry_codes", children)])
        });

    let sensitive = subset(&names).prop_map(|keys| {
        overlay(
            "Sensitive",
            vec![Property::block("attributes", keys.into_iter().map(Property::bare).collect())],
        )
    });

    prop_oneof![labels, meta, formats, cardinalities, entry_codes, sensitive]
}

/// Generate a complete OCAfile syntax tree.
pub fn ocafile() -> impl Strategy<Value = OcaFile> {
    (
        prop::option::of(schema_name()),
        prop::option::of(text_value()),
        attributes(),
    )
        .prop_flat_map(|(name, classification, attributes)| {
            let names: Vec<String> = attributes.iter().map(|(n, _)| n.clone()).collect();
            prop::collection::vec(overlay_command(names), 0..5).prop_map(move |overlays| {
                let mut commands = Vec::new();
                if let Some(value) = &classification {
                    commands.push(CommandKind::AddClassification(value.clone()));
                }
                commands.push(CommandKind::AddAttribute(attributes.clone()));
                commands.extend(overlays);
                OcaFile {
                    name: name.clone(),
                    commands: commands
                        .into_iter()
                        .map(|kind| Command { line: 0, kind })
                        .collect(),
                }
            })
        })
}
