//! Capture base: the structural schema of a bundle.
//!
//! The attribute map keeps declaration order for presentation (generated
//! OCAfiles, attribute listings). Digesting goes through the canonical
//! encoder, which sorts map keys, so declaration order never affects the
//! identifier.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::attribute::NestedAttrType;
use crate::canonical::{canonical_bytes, CAPTURE_BASE_DOMAIN};
use crate::digest::Said;
use crate::error::Result;

/// Type marker of the capture bases produced by this crate.
pub const CAPTURE_BASE_TYPE: &str = "capture_base/2.0.0";

/// An immutable, digested capture base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureBase {
    digest: Said,
    #[serde(rename = "type")]
    schema_type: String,
    #[serde(default)]
    classification: String,
    #[serde(default)]
    attributes: IndexMap<String, NestedAttrType>,
}

impl CaptureBase {
    /// The content address of this capture base.
    pub fn digest(&self) -> &Said {
        &self.digest
    }

    /// The schema kind marker (`capture_base/2.0.0`).
    pub fn schema_type(&self) -> &str {
        &self.schema_type
    }

    /// Classification tag (empty when none was declared).
    pub fn classification(&self) -> &str {
        &self.classification
    }

    /// Attributes in declaration order.
    pub fn attributes(&self) -> &IndexMap<String, NestedAttrType> {
        &self.attributes
    }

    /// Look up one attribute type.
    pub fn attribute(&self, name: &str) -> Option<&NestedAttrType> {
        self.attributes.get(name)
    }

    /// Check whether an attribute is declared.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Recompute the digest from the current content.
    ///
    /// Equal to [`CaptureBase::digest`] for every capture base built by
    /// [`CaptureBaseBuilder`]; differs for tampered or hand-edited input.
    pub fn compute_digest(&self) -> Result<Said> {
        compute_digest(&self.schema_type, &self.classification, &self.attributes)
    }
}

fn compute_digest(
    schema_type: &str,
    classification: &str,
    attributes: &IndexMap<String, NestedAttrType>,
) -> Result<Said> {
    let content = json!({
        "type": schema_type,
        "classification": classification,
        "attributes": attributes,
    });
    let bytes = canonical_bytes(&content)?;
    Ok(Said::compute(CAPTURE_BASE_DOMAIN, &bytes))
}

/// Builder for capture bases.
#[derive(Debug, Clone, Default)]
pub struct CaptureBaseBuilder {
    classification: String,
    attributes: IndexMap<String, NestedAttrType>,
}

impl CaptureBaseBuilder {
    /// Start an empty capture base.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the classification tag.
    pub fn classification(mut self, classification: impl Into<String>) -> Self {
        self.classification = classification.into();
        self
    }

    /// Add an attribute. A repeated name replaces the earlier type but keeps
    /// its position; callers that must reject duplicates check
    /// [`CaptureBaseBuilder::has_attribute`] first.
    pub fn attribute(mut self, name: impl Into<String>, ty: impl Into<NestedAttrType>) -> Self {
        self.attributes.insert(name.into(), ty.into());
        self
    }

    /// Check whether an attribute was already added.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Compute the digest and freeze the capture base.
    pub fn build(self) -> Result<CaptureBase> {
        let digest = compute_digest(CAPTURE_BASE_TYPE, &self.classification, &self.attributes)?;
        Ok(CaptureBase {
            digest,
            schema_type: CAPTURE_BASE_TYPE.to_string(),
            classification: self.classification,
            attributes: self.attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeType;

    fn sample() -> CaptureBase {
        CaptureBaseBuilder::new()
            .attribute("name", AttributeType::Text)
            .attribute("age", AttributeType::Numeric)
            .build()
            .unwrap()
    }

    #[test]
    fn test_declaration_order_preserved() {
        let cb = sample();
        let names: Vec<_> = cb.attributes().keys().cloned().collect();
        assert_eq!(names, vec!["name", "age"]);
    }

    #[test]
    fn test_digest_ignores_declaration_order() {
        let reversed = CaptureBaseBuilder::new()
            .attribute("age", AttributeType::Numeric)
            .attribute("name", AttributeType::Text)
            .build()
            .unwrap();
        assert_eq!(sample().digest(), reversed.digest());
    }

    #[test]
    fn test_digest_depends_on_classification() {
        let classified = CaptureBaseBuilder::new()
            .classification("GICS:35102020")
            .attribute("name", AttributeType::Text)
            .attribute("age", AttributeType::Numeric)
            .build()
            .unwrap();
        assert_ne!(sample().digest(), classified.digest());
    }

    #[test]
    fn test_json_roundtrip_keeps_digest_and_order() {
        let cb = sample();
        let json = serde_json::to_string(&cb).unwrap();
        assert!(json.contains(r#""type":"capture_base/2.0.0""#));

        let back: CaptureBase = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cb);
        assert_eq!(back.compute_digest().unwrap(), *cb.digest());
    }
}
