//! # OCA Bundle Core
//!
//! Pure primitives for OCA bundles: attributes, capture bases, overlays,
//! bundles and their content-addressed identifiers.
//!
//! This crate contains no I/O. It is pure computation over immutable,
//! digested data structures.
//!
//! ## Key Types
//!
//! - [`Bundle`] - A capture base plus an ordered sequence of overlays
//! - [`CaptureBase`] - The attribute schema
//! - [`Overlay`] / [`OverlayBody`] - Typed metadata layers
//! - [`Said`] - Self-addressing identifier (BLAKE3-256)
//! - [`NestedAttrType`] - Attribute types, including arrays and references
//!
//! ## Canonicalization
//!
//! Every digest is computed over deterministic CBOR. See the [`canonical`]
//! module.

pub mod attribute;
pub mod bundle;
pub mod canonical;
pub mod capture_base;
pub mod cardinality;
pub mod digest;
pub mod error;
pub mod overlay;

pub use attribute::{AttributeType, NestedAttrType, RefValue};
pub use bundle::Bundle;
pub use canonical::canonical_bytes;
pub use capture_base::{CaptureBase, CaptureBaseBuilder, CAPTURE_BASE_TYPE};
pub use cardinality::Cardinality;
pub use digest::{DigestAlgorithm, Said};
pub use error::{CoreError, Result};
pub use overlay::{custom_type_tag, Overlay, OverlayBody, OverlayKind};
