//! Overlays: typed layers of metadata over a capture base.
//!
//! Wire form of every overlay is a flat JSON object:
//! `{digest, capture_base, type, language?, ...payload}`. The payload keys
//! depend on the kind. Custom overlays (kinds the registry knows about but this
//! crate does not) keep their payload as opaque JSON.

use serde::de::{self, DeserializeOwned};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::canonical::{canonical_bytes, OVERLAY_DOMAIN};
use crate::digest::Said;
use crate::error::{CoreError, Result};

/// Version component of every built-in overlay type tag.
pub const BUILTIN_OVERLAY_VERSION: &str = "2.0.0";

/// Keys that live beside the payload and can never be payload keys.
pub const RESERVED_KEYS: [&str; 4] = ["digest", "capture_base", "type", "language"];

/// Overlay kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OverlayKind {
    Meta,
    Label,
    Information,
    Entry,
    CharacterEncoding,
    Format,
    Unit,
    Cardinality,
    EntryCode,
    Sensitive,
    Standard,
    Mapping,
    Conformance,
    Conditional,
    /// Attribute mapping onto another bundle.
    Link,
    EntryCodeMapping,
    /// Registry-defined kind with an opaque payload.
    Custom,
}

impl OverlayKind {
    /// Every kind with a typed payload.
    pub const BUILTIN: [OverlayKind; 16] = [
        Self::Meta,
        Self::Label,
        Self::Information,
        Self::Entry,
        Self::CharacterEncoding,
        Self::Format,
        Self::Unit,
        Self::Cardinality,
        Self::EntryCode,
        Self::Sensitive,
        Self::Standard,
        Self::Mapping,
        Self::Conformance,
        Self::Conditional,
        Self::Link,
        Self::EntryCodeMapping,
    ];

    /// Display name, as written after `ADD OVERLAY`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Meta => "Meta",
            Self::Label => "Label",
            Self::Information => "Information",
            Self::Entry => "Entry",
            Self::CharacterEncoding => "CharacterEncoding",
            Self::Format => "Format",
            Self::Unit => "Unit",
            Self::Cardinality => "Cardinality",
            Self::EntryCode => "EntryCode",
            Self::Sensitive => "Sensitive",
            Self::Standard => "Standard",
            Self::Mapping => "Mapping",
            Self::Conformance => "Conformance",
            Self::Conditional => "Conditional",
            Self::Link => "Link",
            Self::EntryCodeMapping => "EntryCodeMapping",
            Self::Custom => "Custom",
        }
    }

    /// Name segment of the type tag.
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Meta => "meta",
            Self::Label => "label",
            Self::Information => "information",
            Self::Entry => "entry",
            Self::CharacterEncoding => "character_encoding",
            Self::Format => "format",
            Self::Unit => "unit",
            Self::Cardinality => "cardinality",
            Self::EntryCode => "entry_code",
            Self::Sensitive => "sensitive",
            Self::Standard => "standard",
            Self::Mapping => "mapping",
            Self::Conformance => "conformance",
            Self::Conditional => "conditional",
            Self::Link => "link",
            Self::EntryCodeMapping => "entry_code_mapping",
            Self::Custom => "custom",
        }
    }

    /// Whether overlays of this kind carry a language.
    ///
    /// Always false for [`OverlayKind::Custom`]; the registry decides for
    /// custom kinds.
    pub const fn language_scoped(self) -> bool {
        matches!(self, Self::Meta | Self::Label | Self::Information | Self::Entry)
    }

    /// Type tag of a built-in kind (`overlay/<slug>/2.0.0`).
    pub fn type_tag(self) -> Option<String> {
        match self {
            Self::Custom => None,
            kind => Some(format!("overlay/{}/{}", kind.slug(), BUILTIN_OVERLAY_VERSION)),
        }
    }

    /// Find the built-in kind a type tag names.
    pub fn from_type_tag(tag: &str) -> Option<Self> {
        let rest = tag.strip_prefix("overlay/")?;
        let (slug, version) = rest.split_once('/')?;
        if version != BUILTIN_OVERLAY_VERSION {
            return None;
        }
        Self::BUILTIN.into_iter().find(|k| k.slug() == slug)
    }
}

impl fmt::Display for OverlayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type tag of a custom overlay: `overlay/<name>/<version>` with the name
/// lowercased and separators folded to `_`.
pub fn custom_type_tag(name: &str, version: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect();
    format!("overlay/{slug}/{version}")
}

/// Kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayBody {
    /// Free-form `key -> text` entries (`name`, `description`, ...).
    Meta(BTreeMap<String, String>),
    Label {
        attribute_labels: BTreeMap<String, String>,
    },
    Information {
        attribute_information: BTreeMap<String, String>,
    },
    /// Human-readable labels for entry codes, per attribute.
    Entry {
        attribute_entries: BTreeMap<String, BTreeMap<String, String>>,
    },
    CharacterEncoding {
        default_character_encoding: Option<String>,
        attribute_character_encodings: BTreeMap<String, String>,
    },
    Format {
        attribute_formats: BTreeMap<String, String>,
    },
    Unit {
        metric_system: Option<String>,
        attribute_units: BTreeMap<String, String>,
    },
    /// Ranges are kept as text so malformed values reach the semantic
    /// validator instead of failing decoding.
    Cardinality {
        attribute_cardinalities: BTreeMap<String, String>,
    },
    /// Allowed codes per attribute, in declaration order.
    EntryCode {
        attribute_entry_codes: BTreeMap<String, Vec<String>>,
    },
    Sensitive {
        attributes: BTreeSet<String>,
    },
    Standard {
        attribute_standards: BTreeMap<String, String>,
    },
    Mapping {
        attribute_mappings: BTreeMap<String, String>,
    },
    Conformance {
        attribute_conformances: BTreeMap<String, String>,
    },
    Conditional {
        attribute_conditions: BTreeMap<String, String>,
        attribute_dependencies: BTreeMap<String, Vec<String>>,
    },
    /// `target_bundle` is kept as text; the semantic validator checks it is a
    /// digest.
    Link {
        target_bundle: Option<String>,
        attribute_mapping: BTreeMap<String, String>,
    },
    /// `source:target` code pairs per attribute.
    EntryCodeMapping {
        attribute_entry_codes_mapping: BTreeMap<String, Vec<String>>,
    },
    Custom {
        type_tag: String,
        properties: Map<String, Value>,
    },
}

impl OverlayBody {
    /// The kind of this payload.
    pub fn kind(&self) -> OverlayKind {
        match self {
            Self::Meta(_) => OverlayKind::Meta,
            Self::Label { .. } => OverlayKind::Label,
            Self::Information { .. } => OverlayKind::Information,
            Self::Entry { .. } => OverlayKind::Entry,
            Self::CharacterEncoding { .. } => OverlayKind::CharacterEncoding,
            Self::Format { .. } => OverlayKind::Format,
            Self::Unit { .. } => OverlayKind::Unit,
            Self::Cardinality { .. } => OverlayKind::Cardinality,
            Self::EntryCode { .. } => OverlayKind::EntryCode,
            Self::Sensitive { .. } => OverlayKind::Sensitive,
            Self::Standard { .. } => OverlayKind::Standard,
            Self::Mapping { .. } => OverlayKind::Mapping,
            Self::Conformance { .. } => OverlayKind::Conformance,
            Self::Conditional { .. } => OverlayKind::Conditional,
            Self::Link { .. } => OverlayKind::Link,
            Self::EntryCodeMapping { .. } => OverlayKind::EntryCodeMapping,
            Self::Custom { .. } => OverlayKind::Custom,
        }
    }

    /// Full type tag.
    pub fn type_tag(&self) -> String {
        match self {
            Self::Custom { type_tag, .. } => type_tag.clone(),
            body => format!("overlay/{}/{}", body.kind().slug(), BUILTIN_OVERLAY_VERSION),
        }
    }

    /// Attribute names this payload refers to, in payload order.
    ///
    /// Meta overlays refer to none. Custom overlays refer to the keys of
    /// every object-valued `attribute_*` property.
    pub fn attribute_references(&self) -> Vec<&str> {
        fn keys<V>(map: &BTreeMap<String, V>) -> Vec<&str> {
            map.keys().map(String::as_str).collect()
        }

        match self {
            Self::Meta(_) => Vec::new(),
            Self::Label { attribute_labels } => keys(attribute_labels),
            Self::Information { attribute_information } => keys(attribute_information),
            Self::Entry { attribute_entries } => keys(attribute_entries),
            Self::CharacterEncoding { attribute_character_encodings, .. } => {
                keys(attribute_character_encodings)
            }
            Self::Format { attribute_formats } => keys(attribute_formats),
            Self::Unit { attribute_units, .. } => keys(attribute_units),
            Self::Cardinality { attribute_cardinalities } => keys(attribute_cardinalities),
            Self::EntryCode { attribute_entry_codes } => keys(attribute_entry_codes),
            Self::Sensitive { attributes } => attributes.iter().map(String::as_str).collect(),
            Self::Standard { attribute_standards } => keys(attribute_standards),
            Self::Mapping { attribute_mappings } => keys(attribute_mappings),
            Self::Conformance { attribute_conformances } => keys(attribute_conformances),
            Self::Conditional { attribute_conditions, attribute_dependencies } => {
                let mut refs = keys(attribute_conditions);
                refs.extend(
                    attribute_dependencies
                        .keys()
                        .map(String::as_str)
                        .filter(|k| !attribute_conditions.contains_key(*k)),
                );
                refs
            }
            Self::Link { attribute_mapping, .. } => keys(attribute_mapping),
            Self::EntryCodeMapping { attribute_entry_codes_mapping } => {
                keys(attribute_entry_codes_mapping)
            }
            Self::Custom { properties, .. } => properties
                .iter()
                .filter(|(key, _)| key.starts_with("attribute_"))
                .filter_map(|(_, value)| value.as_object())
                .flat_map(|obj| obj.keys().map(String::as_str))
                .collect(),
        }
    }

    /// Render the payload keys as JSON.
    pub fn to_payload(&self) -> Map<String, Value> {
        let mut out = Map::new();
        match self {
            Self::Meta(entries) => {
                for (k, v) in entries {
                    out.insert(k.clone(), Value::String(v.clone()));
                }
            }
            Self::Label { attribute_labels } => {
                out.insert("attribute_labels".into(), strings(attribute_labels));
            }
            Self::Information { attribute_information } => {
                out.insert("attribute_information".into(), strings(attribute_information));
            }
            Self::Entry { attribute_entries } => {
                let entries = attribute_entries
                    .iter()
                    .map(|(attr, codes)| (attr.clone(), strings(codes)))
                    .collect();
                out.insert("attribute_entries".into(), Value::Object(entries));
            }
            Self::CharacterEncoding {
                default_character_encoding,
                attribute_character_encodings,
            } => {
                if let Some(default) = default_character_encoding {
                    out.insert("default_character_encoding".into(), Value::String(default.clone()));
                }
                out.insert(
                    "attribute_character_encodings".into(),
                    strings(attribute_character_encodings),
                );
            }
            Self::Format { attribute_formats } => {
                out.insert("attribute_formats".into(), strings(attribute_formats));
            }
            Self::Unit { metric_system, attribute_units } => {
                if let Some(system) = metric_system {
                    out.insert("metric_system".into(), Value::String(system.clone()));
                }
                out.insert("attribute_units".into(), strings(attribute_units));
            }
            Self::Cardinality { attribute_cardinalities } => {
                out.insert("attribute_cardinalities".into(), strings(attribute_cardinalities));
            }
            Self::EntryCode { attribute_entry_codes } => {
                out.insert("attribute_entry_codes".into(), lists(attribute_entry_codes));
            }
            Self::Sensitive { attributes } => {
                out.insert(
                    "attributes".into(),
                    Value::from(attributes.iter().cloned().collect::<Vec<_>>()),
                );
            }
            Self::Standard { attribute_standards } => {
                out.insert("attribute_standards".into(), strings(attribute_standards));
            }
            Self::Mapping { attribute_mappings } => {
                out.insert("attribute_mappings".into(), strings(attribute_mappings));
            }
            Self::Conformance { attribute_conformances } => {
                out.insert("attribute_conformances".into(), strings(attribute_conformances));
            }
            Self::Conditional { attribute_conditions, attribute_dependencies } => {
                out.insert("attribute_conditions".into(), strings(attribute_conditions));
                out.insert("attribute_dependencies".into(), lists(attribute_dependencies));
            }
            Self::Link { target_bundle, attribute_mapping } => {
                if let Some(target) = target_bundle {
                    out.insert("target_bundle".into(), Value::String(target.clone()));
                }
                out.insert("attribute_mapping".into(), strings(attribute_mapping));
            }
            Self::EntryCodeMapping { attribute_entry_codes_mapping } => {
                out.insert(
                    "attribute_entry_codes_mapping".into(),
                    lists(attribute_entry_codes_mapping),
                );
            }
            Self::Custom { properties, .. } => {
                out.extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        out
    }

    /// Decode a payload for the given type tag.
    ///
    /// Built-in tags are decoded strictly: an unknown key is an error. Any
    /// other `overlay/...` tag becomes a [`OverlayBody::Custom`].
    pub fn from_payload(type_tag: &str, payload: Map<String, Value>) -> Result<Self> {
        let Some(kind) = OverlayKind::from_type_tag(type_tag) else {
            if !type_tag.starts_with("overlay/") {
                return Err(CoreError::MalformedOverlay(format!(
                    "unsupported overlay type {type_tag:?}"
                )));
            }
            return Ok(Self::Custom {
                type_tag: type_tag.to_string(),
                properties: payload,
            });
        };

        let mut p = Payload { tag: type_tag, map: payload };
        let body = match kind {
            OverlayKind::Meta => {
                let entries = std::mem::take(&mut p.map)
                    .into_iter()
                    .map(|(k, v)| match v {
                        Value::String(s) => Ok((k, s)),
                        other => Err(CoreError::MalformedOverlay(format!(
                            "{type_tag}: meta entry {k:?} must be a string, got {other}"
                        ))),
                    })
                    .collect::<Result<_>>()?;
                Self::Meta(entries)
            }
            OverlayKind::Label => Self::Label {
                attribute_labels: p.take("attribute_labels")?,
            },
            OverlayKind::Information => Self::Information {
                attribute_information: p.take("attribute_information")?,
            },
            OverlayKind::Entry => Self::Entry {
                attribute_entries: p.take("attribute_entries")?,
            },
            OverlayKind::CharacterEncoding => Self::CharacterEncoding {
                default_character_encoding: p.take("default_character_encoding")?,
                attribute_character_encodings: p.take("attribute_character_encodings")?,
            },
            OverlayKind::Format => Self::Format {
                attribute_formats: p.take("attribute_formats")?,
            },
            OverlayKind::Unit => Self::Unit {
                metric_system: p.take("metric_system")?,
                attribute_units: p.take("attribute_units")?,
            },
            OverlayKind::Cardinality => Self::Cardinality {
                attribute_cardinalities: p.take("attribute_cardinalities")?,
            },
            OverlayKind::EntryCode => Self::EntryCode {
                attribute_entry_codes: p.take("attribute_entry_codes")?,
            },
            OverlayKind::Sensitive => Self::Sensitive {
                attributes: p.take("attributes")?,
            },
            OverlayKind::Standard => Self::Standard {
                attribute_standards: p.take("attribute_standards")?,
            },
            OverlayKind::Mapping => Self::Mapping {
                attribute_mappings: p.take("attribute_mappings")?,
            },
            OverlayKind::Conformance => Self::Conformance {
                attribute_conformances: p.take("attribute_conformances")?,
            },
            OverlayKind::Conditional => Self::Conditional {
                attribute_conditions: p.take("attribute_conditions")?,
                attribute_dependencies: p.take("attribute_dependencies")?,
            },
            OverlayKind::Link => Self::Link {
                target_bundle: p.take("target_bundle")?,
                attribute_mapping: p.take("attribute_mapping")?,
            },
            OverlayKind::EntryCodeMapping => Self::EntryCodeMapping {
                attribute_entry_codes_mapping: p.take("attribute_entry_codes_mapping")?,
            },
            OverlayKind::Custom => Self::Custom {
                type_tag: type_tag.to_string(),
                properties: std::mem::take(&mut p.map),
            },
        };
        p.finish()?;
        Ok(body)
    }
}

fn strings(map: &BTreeMap<String, String>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

fn lists(map: &BTreeMap<String, Vec<String>>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::from(v.clone())))
            .collect(),
    )
}

/// Payload keys not yet consumed by the decoder.
struct Payload<'a> {
    tag: &'a str,
    map: Map<String, Value>,
}

impl Payload<'_> {
    fn take<T: DeserializeOwned + Default>(&mut self, key: &str) -> Result<T> {
        match self.map.remove(key) {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => serde_json::from_value(value)
                .map_err(|e| CoreError::MalformedOverlay(format!("{}: {key}: {e}", self.tag))),
        }
    }

    fn finish(self) -> Result<()> {
        match self.map.keys().next() {
            Some(key) => Err(CoreError::MalformedOverlay(format!(
                "{}: unexpected key {key:?}",
                self.tag
            ))),
            None => Ok(()),
        }
    }
}

/// One digested overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    digest: Said,
    capture_base: Option<Said>,
    language: Option<String>,
    body: OverlayBody,
}

impl Overlay {
    /// Create an overlay and compute its digest. The capture base reference
    /// is attached when the overlay is placed into a bundle.
    pub fn new(language: Option<String>, body: OverlayBody) -> Result<Self> {
        let digest = compute_digest(language.as_deref(), &body)?;
        Ok(Self {
            digest,
            capture_base: None,
            language,
            body,
        })
    }

    /// The content address of this overlay.
    pub fn digest(&self) -> &Said {
        &self.digest
    }

    /// Digest of the capture base this overlay belongs to.
    pub fn capture_base(&self) -> Option<&Said> {
        self.capture_base.as_ref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn body(&self) -> &OverlayBody {
        &self.body
    }

    pub fn kind(&self) -> OverlayKind {
        self.body.kind()
    }

    pub fn type_tag(&self) -> String {
        self.body.type_tag()
    }

    /// Recompute the digest from type, language and payload.
    pub fn compute_digest(&self) -> Result<Said> {
        compute_digest(self.language.as_deref(), &self.body)
    }

    pub(crate) fn bind(&mut self, capture_base: Said) {
        self.capture_base = Some(capture_base);
    }

    /// Decode from the flat wire object.
    pub fn from_json(mut map: Map<String, Value>) -> Result<Self> {
        let missing = |key: &str| CoreError::MalformedOverlay(format!("missing {key:?}"));

        let type_tag = match map.remove("type") {
            Some(Value::String(tag)) => tag,
            Some(other) => {
                return Err(CoreError::MalformedOverlay(format!(
                    "\"type\" must be a string, got {other}"
                )))
            }
            None => return Err(missing("type")),
        };
        let digest = match map.remove("digest") {
            Some(Value::String(s)) => s.parse()?,
            _ => return Err(missing("digest")),
        };
        let capture_base = match map.remove("capture_base") {
            Some(Value::String(s)) => Some(s.parse()?),
            None | Some(Value::Null) => None,
            Some(other) => {
                return Err(CoreError::MalformedOverlay(format!(
                    "\"capture_base\" must be a digest string, got {other}"
                )))
            }
        };
        let language = match map.remove("language") {
            Some(Value::String(s)) => Some(s),
            None | Some(Value::Null) => None,
            Some(other) => {
                return Err(CoreError::MalformedOverlay(format!(
                    "\"language\" must be a string, got {other}"
                )))
            }
        };

        let body = OverlayBody::from_payload(&type_tag, map)?;
        Ok(Self {
            digest,
            capture_base,
            language,
            body,
        })
    }
}

fn compute_digest(language: Option<&str>, body: &OverlayBody) -> Result<Said> {
    let mut content = body.to_payload();
    content.insert("type".into(), Value::String(body.type_tag()));
    if let Some(language) = language {
        content.insert("language".into(), Value::String(language.to_string()));
    }
    let bytes = canonical_bytes(&Value::Object(content))?;
    Ok(Said::compute(OVERLAY_DOMAIN, &bytes))
}

impl Serialize for Overlay {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let payload = self.body.to_payload();
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("digest", &self.digest)?;
        if let Some(capture_base) = &self.capture_base {
            map.serialize_entry("capture_base", capture_base)?;
        }
        map.serialize_entry("type", &self.body.type_tag())?;
        if let Some(language) = &self.language {
            map.serialize_entry("language", language)?;
        }
        for (key, value) in &payload {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Overlay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Overlay::from_json(map).map_err(de::Error::custom)
    }
}
