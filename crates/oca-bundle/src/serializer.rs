//! Bundle to OCAfile.
//!
//! The bundle is turned back into commands and rendered by the OCAfile
//! generator. Assembling the output reproduces the bundle digest.

use oca_bundle_core::{Bundle, Overlay, OverlayKind};
use oca_bundle_file::{generate, Command, CommandKind, OcaFile, Property, PropertyValue};
use oca_bundle_registry::OverlayRegistry;
use serde_json::Value;

/// Render a bundle as OCAfile text.
pub fn to_ocafile(bundle: &Bundle, registry: &dyn OverlayRegistry) -> String {
    generate(&to_commands(bundle, registry))
}

/// The commands that assemble into `bundle`.
pub fn to_commands(bundle: &Bundle, registry: &dyn OverlayRegistry) -> OcaFile {
    let capture_base = bundle.capture_base();
    let mut commands = Vec::new();

    if !capture_base.classification().is_empty() {
        commands.push(command(CommandKind::AddClassification(
            capture_base.classification().to_string(),
        )));
    }
    if !capture_base.attributes().is_empty() {
        let attributes = capture_base
            .attributes()
            .iter()
            .map(|(name, ty)| (name.clone(), ty.clone()))
            .collect();
        commands.push(command(CommandKind::AddAttribute(attributes)));
    }
    for overlay in bundle.overlays() {
        commands.push(command(CommandKind::AddOverlay {
            name: display_name(overlay, registry),
            properties: overlay_properties(overlay),
        }));
    }

    OcaFile {
        name: bundle.name().map(str::to_string),
        commands,
    }
}

fn command(kind: CommandKind) -> Command {
    Command { line: 0, kind }
}

/// Registry name for the overlay's type tag. Unregistered custom tags fall
/// back to the name segment of the tag.
fn display_name(overlay: &Overlay, registry: &dyn OverlayRegistry) -> String {
    let tag = overlay.type_tag();
    if let Some(definition) = registry.resolve_tag(&tag) {
        return definition.name.clone();
    }
    match overlay.kind() {
        OverlayKind::Custom => tag.split('/').nth(1).unwrap_or(&tag).to_string(),
        kind => kind.name().to_string(),
    }
}

fn overlay_properties(overlay: &Overlay) -> Vec<Property> {
    let mut properties = Vec::new();
    if let Some(language) = overlay.language() {
        properties.push(Property::text("language", language));
    }

    let mut payload: Vec<_> = overlay.body().to_payload().into_iter().collect();
    payload.sort_by(|a, b| a.0.cmp(&b.0));
    properties.extend(payload.into_iter().map(|(key, value)| property(key, &value)));
    properties
}

/// Block form of a payload value. Lists of strings are written as arrays,
/// objects as nested blocks, and other scalars as their JSON text.
fn property(key: String, value: &Value) -> Property {
    let value = match value {
        Value::String(text) => PropertyValue::Text(text.clone()),
        Value::Array(items) if items.iter().all(Value::is_string) => PropertyValue::Array(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        Value::Object(map) => PropertyValue::Block(
            map.iter()
                .map(|(k, v)| property(k.clone(), v))
                .collect(),
        ),
        other => PropertyValue::Text(other.to_string()),
    };
    Property::new(key, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;
    use oca_bundle_file::parse;
    use oca_bundle_registry::{MemoryRegistry, OverlayDefinition};

    const PERSON: &str = r#"--name=person
ADD CLASSIFICATION "GICS:35102020"
ADD ATTRIBUTE name=Text age=Numeric sex=Text
ADD OVERLAY META
  language="en"
  name="Person"
ADD OVERLAY LABEL
  language="en"
  attribute_labels
    name="Full name"
    age="Age"
ADD OVERLAY ENTRY_CODE
  attribute_entry_codes
    sex=["M", "F"]
ADD OVERLAY ENTRY
  language="en"
  attribute_entries
    sex
      M="Male"
      F="Female"
ADD OVERLAY SENSITIVE
  attributes
    name
"#;

    #[test]
    fn test_output_shape() {
        let registry = MemoryRegistry::default();
        let bundle = assemble(&parse(PERSON).unwrap(), &registry).unwrap();
        let text = to_ocafile(&bundle, &registry);

        assert!(text.starts_with("--name=person\n"));
        assert!(text.contains("ADD CLASSIFICATION \"GICS:35102020\""));
        assert!(text.contains("ADD ATTRIBUTE name=Text \\\n"));
        assert!(text.contains("ADD OVERLAY EntryCode\n  attribute_entry_codes\n    sex=[\"M\", \"F\"]\n"));
        assert!(text.contains("ADD OVERLAY Sensitive\n  attributes=[\"name\"]\n"));
    }

    #[test]
    fn test_round_trip_digest() {
        let registry = MemoryRegistry::default();
        let bundle = assemble(&parse(PERSON).unwrap(), &registry).unwrap();
        let text = to_ocafile(&bundle, &registry);
        let again = assemble(&parse(&text).unwrap(), &registry).unwrap();
        assert_eq!(again.digest(), bundle.digest());
        assert_eq!(again, bundle);
    }

    #[test]
    fn test_custom_overlay_display_name() {
        let mut registry = MemoryRegistry::default();
        registry
            .insert(OverlayDefinition::custom("Passport_Extra", "1.0.0", false, vec![]))
            .unwrap();
        let file = parse("ADD ATTRIBUTE a=Text\nADD OVERLAY passport-extra\n  attribute_notes\n    a=\"n\"\n").unwrap();
        let bundle = assemble(&file, &registry).unwrap();

        let text = to_ocafile(&bundle, &registry);
        assert!(text.contains("ADD OVERLAY Passport_Extra\n"));
        let again = assemble(&parse(&text).unwrap(), &registry).unwrap();
        assert_eq!(again.digest(), bundle.digest());

        // Without the definition, the tag's name segment is used.
        let text = to_ocafile(&bundle, &MemoryRegistry::default());
        assert!(text.contains("ADD OVERLAY passport_extra\n"));
    }

    #[test]
    fn test_empty_bundle() {
        let registry = MemoryRegistry::default();
        let bundle = assemble(&parse("").unwrap(), &registry).unwrap();
        assert_eq!(to_ocafile(&bundle, &registry), "");
    }
}
