//! String-in, string-out boundary operations.
//!
//! These take OCAfile text and bundle/data JSON, which makes them the
//! surface a language binding wraps. A `None` or blank registry path selects
//! the built-in overlay kinds.

use oca_bundle_core::{Bundle, CoreError, NestedAttrType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{EngineConfig, RegistrySource};
use crate::engine::Engine;
use crate::error::{BundleError, Result};

/// One capture-base attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeInfo {
    pub name: String,
    /// Type as text, with arrays in bracket form: `Text`, `[Numeric]`,
    /// `[[Text]]`, `refn:address`.
    #[serde(rename = "type")]
    pub attribute_type: String,
}

/// Result of a validation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    fn from_messages(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

fn engine(registry_path: Option<&str>) -> Result<Engine<Box<dyn oca_bundle_registry::OverlayRegistry>>> {
    Engine::from_source(&RegistrySource::from_path(registry_path), EngineConfig::default())
}

fn decode_bundle(bundle_json: &str) -> Result<Bundle> {
    Bundle::from_json(bundle_json).map_err(BundleError::InvalidBundleJson)
}

/// Compile OCAfile text into pretty-printed bundle JSON.
pub fn build_from_ocafile(text: &str, registry_path: Option<&str>) -> Result<String> {
    let bundle = engine(registry_path)?.build(text)?;
    bundle
        .to_json_pretty()
        .map_err(|e| CoreError::EncodingError(e.to_string()).into())
}

/// Attributes of a bundle, in declaration order.
pub fn bundle_attributes(bundle_json: &str, registry_path: Option<&str>) -> Result<Vec<AttributeInfo>> {
    // The registry is loaded so a bad path is reported consistently.
    engine(registry_path)?;
    let bundle = decode_bundle(bundle_json)?;
    Ok(bundle
        .capture_base()
        .attributes()
        .iter()
        .map(|(name, ty)| AttributeInfo {
            name: name.clone(),
            attribute_type: listing_type(ty),
        })
        .collect())
}

fn listing_type(ty: &NestedAttrType) -> String {
    match ty {
        NestedAttrType::Array(inner) => format!("[{}]", listing_type(inner)),
        other => other.to_string(),
    }
}

/// Check a bundle's internal consistency.
pub fn validate_bundle_semantics(bundle_json: &str) -> Result<ValidationOutcome> {
    let bundle = decode_bundle(bundle_json)?;
    let report = Engine::builtin().validate_semantics(&bundle);
    Ok(ValidationOutcome::from_messages(report.messages()))
}

/// Validate a JSON record against a bundle.
pub fn validate_bundle_data(
    bundle_json: &str,
    data_json: &str,
    registry_path: Option<&str>,
) -> Result<ValidationOutcome> {
    let engine = engine(registry_path)?;
    let bundle = decode_bundle(bundle_json)?;
    let data: Value = serde_json::from_str(data_json).map_err(BundleError::InvalidDataJson)?;
    let report = engine.validate_data(&bundle, &data);
    Ok(ValidationOutcome::from_messages(report.messages()))
}

/// Regenerate OCAfile text from bundle JSON.
pub fn bundle_to_ocafile(bundle_json: &str, registry_path: Option<&str>) -> Result<String> {
    let engine = engine(registry_path)?;
    let bundle = decode_bundle(bundle_json)?;
    Ok(engine.to_ocafile(&bundle))
}
