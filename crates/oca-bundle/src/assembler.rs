//! Bundle assembly: parsed OCAfile commands to a digested bundle.
//!
//! Each `ADD OVERLAY` block is interpreted through a table of the payload
//! keys its kind defines, then decoded by the core payload decoder. Custom
//! kinds keep their whole property tree as JSON.

use oca_bundle_core::overlay::RESERVED_KEYS;
use oca_bundle_core::{Bundle, CaptureBaseBuilder, CoreError, Overlay, OverlayBody, OverlayKind};
use oca_bundle_file::{CommandKind, OcaFile, Property, PropertyValue};
use oca_bundle_registry::OverlayRegistry;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Why commands did not assemble. Lines are 1-based source lines, zero for
/// commands built in code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    #[error("line {line}: unknown overlay {name:?}")]
    UnknownOverlay { line: usize, name: String },

    #[error("line {line}: attribute {name:?} is already declared")]
    DuplicateAttribute { line: usize, name: String },

    #[error("line {line}: property {key:?} of {overlay} overlay is given twice")]
    DuplicateProperty {
        line: usize,
        overlay: String,
        key: String,
    },

    #[error("line {line}: {overlay} overlay does not define property {key:?}")]
    UnexpectedProperty {
        line: usize,
        overlay: String,
        key: String,
    },

    #[error("line {line}: property {key:?} of {overlay} overlay: {reason}")]
    InvalidProperty {
        line: usize,
        overlay: String,
        key: String,
        reason: String,
    },

    #[error("line {line}: classification is already set")]
    DuplicateClassification { line: usize },

    #[error("digest computation failed: {0}")]
    Digest(String),
}

impl From<CoreError> for AssemblyError {
    fn from(err: CoreError) -> Self {
        Self::Digest(err.to_string())
    }
}

/// How a payload key is written in an overlay block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// `key="text"`
    Text,
    /// Block of `attr="text"` lines.
    TextMap,
    /// Block of `attr` blocks of `code="text"` lines.
    NestedTextMap,
    /// Block of `attr=["a", "b"]` lines.
    ListMap,
    /// `key=["a", "b"]`, or a block of bare keys.
    List,
}

/// Payload keys of a built-in kind. `None` means any key holding text.
fn payload_keys(kind: OverlayKind) -> Option<&'static [(&'static str, Shape)]> {
    use Shape::*;
    let keys: &'static [(&'static str, Shape)] = match kind {
        OverlayKind::Meta | OverlayKind::Custom => return None,
        OverlayKind::Label => &[("attribute_labels", TextMap)],
        OverlayKind::Information => &[("attribute_information", TextMap)],
        OverlayKind::Entry => &[("attribute_entries", NestedTextMap)],
        OverlayKind::CharacterEncoding => &[
            ("default_character_encoding", Text),
            ("attribute_character_encodings", TextMap),
        ],
        OverlayKind::Format => &[("attribute_formats", TextMap)],
        OverlayKind::Unit => &[("metric_system", Text), ("attribute_units", TextMap)],
        OverlayKind::Cardinality => &[("attribute_cardinalities", TextMap)],
        OverlayKind::EntryCode => &[("attribute_entry_codes", ListMap)],
        OverlayKind::Sensitive => &[("attributes", List)],
        OverlayKind::Standard => &[("attribute_standards", TextMap)],
        OverlayKind::Mapping => &[("attribute_mappings", TextMap)],
        OverlayKind::Conformance => &[("attribute_conformances", TextMap)],
        OverlayKind::Conditional => &[
            ("attribute_conditions", TextMap),
            ("attribute_dependencies", ListMap),
        ],
        OverlayKind::Link => &[("target_bundle", Text), ("attribute_mapping", TextMap)],
        OverlayKind::EntryCodeMapping => &[("attribute_entry_codes_mapping", ListMap)],
    };
    Some(keys)
}

/// Assemble a bundle from parsed commands.
///
/// Overlay names are resolved through `registry`. The bundle name comes from
/// the `--name=` header.
pub fn assemble(file: &OcaFile, registry: &dyn OverlayRegistry) -> Result<Bundle, AssemblyError> {
    let mut capture_base = CaptureBaseBuilder::new();
    let mut classification_line = None;
    let mut overlays = Vec::new();

    for command in &file.commands {
        let line = command.line;
        match &command.kind {
            CommandKind::AddClassification(value) => {
                if classification_line.is_some() {
                    return Err(AssemblyError::DuplicateClassification { line });
                }
                classification_line = Some(line);
                capture_base = capture_base.classification(value.clone());
            }
            CommandKind::AddAttribute(attributes) => {
                for (name, ty) in attributes {
                    if capture_base.has_attribute(name) {
                        return Err(AssemblyError::DuplicateAttribute {
                            line,
                            name: name.clone(),
                        });
                    }
                    capture_base = capture_base.attribute(name.clone(), ty.clone());
                }
            }
            CommandKind::AddOverlay { name, properties } => {
                overlays.push(build_overlay(line, name, properties, registry)?);
            }
        }
    }

    let bundle = Bundle::new(file.name.clone(), capture_base.build()?, overlays)?;
    debug!(
        digest = %bundle.digest(),
        attributes = bundle.capture_base().attributes().len(),
        overlays = bundle.overlays().len(),
        "assembled bundle"
    );
    Ok(bundle)
}

fn build_overlay(
    line: usize,
    name: &str,
    properties: &[Property],
    registry: &dyn OverlayRegistry,
) -> Result<Overlay, AssemblyError> {
    let definition = registry
        .resolve(name)
        .ok_or_else(|| AssemblyError::UnknownOverlay {
            line,
            name: name.to_string(),
        })?;
    let ctx = Ctx {
        overlay: &definition.name,
        command_line: line,
    };
    let schema = payload_keys(definition.kind);

    let mut language = None;
    let mut payload = Map::new();
    for property in properties {
        let key = property.key.as_str();
        if key == "language" {
            if language.is_some() {
                return Err(ctx.duplicate(property));
            }
            language = Some(ctx.text(property)?.to_string());
            continue;
        }
        if payload.contains_key(key) {
            return Err(ctx.duplicate(property));
        }
        if RESERVED_KEYS.contains(&key) {
            return Err(ctx.unexpected(property));
        }

        let value = match schema {
            None if definition.kind == OverlayKind::Meta => Value::String(ctx.text(property)?.to_string()),
            None => custom_value(&property.value),
            Some(keys) => {
                let shape = keys
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, shape)| *shape)
                    .ok_or_else(|| ctx.unexpected(property))?;
                ctx.shaped(property, shape)?
            }
        };
        payload.insert(key.to_string(), value);
    }

    let body = OverlayBody::from_payload(&definition.type_tag(), payload).map_err(|e| {
        AssemblyError::InvalidProperty {
            line,
            overlay: definition.name.clone(),
            key: String::new(),
            reason: e.to_string(),
        }
    })?;
    Ok(Overlay::new(language, body)?)
}

/// Error context for one overlay command.
struct Ctx<'a> {
    overlay: &'a str,
    command_line: usize,
}

impl Ctx<'_> {
    fn line(&self, property: &Property) -> usize {
        if property.line == 0 {
            self.command_line
        } else {
            property.line
        }
    }

    fn unexpected(&self, property: &Property) -> AssemblyError {
        AssemblyError::UnexpectedProperty {
            line: self.line(property),
            overlay: self.overlay.to_string(),
            key: property.key.clone(),
        }
    }

    fn duplicate(&self, property: &Property) -> AssemblyError {
        AssemblyError::DuplicateProperty {
            line: self.line(property),
            overlay: self.overlay.to_string(),
            key: property.key.clone(),
        }
    }

    fn invalid(&self, property: &Property, expected: &str) -> AssemblyError {
        AssemblyError::InvalidProperty {
            line: self.line(property),
            overlay: self.overlay.to_string(),
            key: property.key.clone(),
            reason: format!("expected {expected}, found {}", property.value.shape()),
        }
    }

    fn text<'p>(&self, property: &'p Property) -> Result<&'p str, AssemblyError> {
        property
            .value
            .as_text()
            .ok_or_else(|| self.invalid(property, "a text value"))
    }

    /// Children of a block property; a bare key is an empty block.
    fn children<'p>(&self, property: &'p Property) -> Result<&'p [Property], AssemblyError> {
        match &property.value {
            PropertyValue::Empty => Ok(&[]),
            PropertyValue::Block(children) => Ok(children),
            _ => Err(self.invalid(property, "a nested block")),
        }
    }

    fn shaped(&self, property: &Property, shape: Shape) -> Result<Value, AssemblyError> {
        match shape {
            Shape::Text => Ok(Value::String(self.text(property)?.to_string())),
            Shape::TextMap => self.map_of(property, |child| {
                Ok(Value::String(self.text(child)?.to_string()))
            }),
            Shape::NestedTextMap => self.map_of(property, |child| {
                self.map_of(child, |entry| Ok(Value::String(self.text(entry)?.to_string())))
            }),
            Shape::ListMap => self.map_of(property, |child| match &child.value {
                PropertyValue::Array(items) => Ok(Value::from(items.clone())),
                _ => Err(self.invalid(child, "an array")),
            }),
            Shape::List => match &property.value {
                PropertyValue::Array(items) => Ok(Value::from(items.clone())),
                _ => {
                    let keys = self
                        .children(property)?
                        .iter()
                        .map(|child| match child.value {
                            PropertyValue::Empty => Ok(Value::String(child.key.clone())),
                            _ => Err(self.invalid(child, "a bare key")),
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Value::Array(keys))
                }
            },
        }
    }

    fn map_of(
        &self,
        property: &Property,
        value: impl Fn(&Property) -> Result<Value, AssemblyError>,
    ) -> Result<Value, AssemblyError> {
        let mut map = Map::new();
        for child in self.children(property)? {
            if map.contains_key(&child.key) {
                return Err(AssemblyError::InvalidProperty {
                    line: self.line(child),
                    overlay: self.overlay.to_string(),
                    key: child.key.clone(),
                    reason: format!("duplicate key in {}", property.key),
                });
            }
            map.insert(child.key.clone(), value(child)?);
        }
        Ok(Value::Object(map))
    }
}

/// JSON form of a custom overlay property.
///
/// Text and arrays map directly. A block of bare keys is a list of those
/// keys; any other block is an object. A bare key on its own is an empty
/// object.
pub(crate) fn custom_value(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Empty => Value::Object(Map::new()),
        PropertyValue::Text(text) => Value::String(text.clone()),
        PropertyValue::Array(items) => Value::from(items.clone()),
        PropertyValue::Block(children) => {
            if !children.is_empty() && children.iter().all(|c| c.value == PropertyValue::Empty) {
                Value::Array(children.iter().map(|c| Value::String(c.key.clone())).collect())
            } else {
                Value::Object(
                    children
                        .iter()
                        .map(|c| (c.key.clone(), custom_value(&c.value)))
                        .collect(),
                )
            }
        }
    }
}
