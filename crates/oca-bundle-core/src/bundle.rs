//! Bundles: a capture base plus an ordered sequence of overlays.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::canonical::{canonical_bytes, BUNDLE_DOMAIN};
use crate::capture_base::CaptureBase;
use crate::digest::Said;
use crate::error::Result;
use crate::overlay::{Overlay, OverlayKind};

/// An immutable, content-addressed OCA bundle.
///
/// The optional `name` is a local alias taken from the OCAfile header. It is
/// carried on the wire but is not part of the digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    digest: Said,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    capture_base: CaptureBase,
    #[serde(default)]
    overlays: Vec<Overlay>,
}

impl Bundle {
    /// Assemble a bundle, binding every overlay to the capture base and
    /// computing the bundle digest.
    pub fn new(
        name: Option<String>,
        capture_base: CaptureBase,
        mut overlays: Vec<Overlay>,
    ) -> Result<Self> {
        for overlay in &mut overlays {
            overlay.bind(*capture_base.digest());
        }
        let digest = compute_digest(capture_base.digest(), overlays.iter().map(Overlay::digest))?;
        Ok(Self {
            digest,
            name,
            capture_base,
            overlays,
        })
    }

    pub fn digest(&self) -> &Said {
        &self.digest
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn capture_base(&self) -> &CaptureBase {
        &self.capture_base
    }

    /// Overlays in bundle order.
    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    /// Overlays of one kind, in bundle order.
    pub fn overlays_of(&self, kind: OverlayKind) -> impl Iterator<Item = &Overlay> {
        self.overlays.iter().filter(move |o| o.kind() == kind)
    }

    /// Recompute the bundle digest from the stored capture base and overlay
    /// digests.
    pub fn compute_digest(&self) -> Result<Said> {
        compute_digest(
            self.capture_base.digest(),
            self.overlays.iter().map(Overlay::digest),
        )
    }

    /// Parse the JSON wire form.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Render the JSON wire form, pretty-printed.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn compute_digest<'a>(
    capture_base: &Said,
    overlays: impl Iterator<Item = &'a Said>,
) -> Result<Said> {
    let overlays: Vec<Value> = overlays.map(|d| Value::String(d.to_string())).collect();
    let content = json!({
        "capture_base": capture_base.to_string(),
        "overlays": overlays,
    });
    let bytes = canonical_bytes(&content)?;
    Ok(Said::compute(BUNDLE_DOMAIN, &bytes))
}
