//! # OCA Bundle
//!
//! The unified API for OCA bundles: compile OCAfiles into content-addressed
//! bundles, validate bundles and data records, and regenerate OCAfiles.
//!
//! ## Overview
//!
//! - **Capture base**: the ordered attribute schema of a record
//! - **Overlays**: typed metadata layers (labels, formats, entry codes, ...)
//! - **Bundle**: a capture base plus overlays, identified by a BLAKE3 digest
//! - **OCAfile**: the human-authored text form of a bundle
//!
//! ## Usage
//!
//! ```rust
//! use oca_bundle::Engine;
//! use serde_json::json;
//!
//! let engine = Engine::builtin();
//! let bundle = engine
//!     .build("ADD ATTRIBUTE name=Text age=Numeric\n")
//!     .unwrap();
//!
//! assert!(engine.validate_semantics(&bundle).is_valid());
//! assert!(engine
//!     .validate_data(&bundle, &json!({"name": "Alice", "age": 42}))
//!     .is_valid());
//!
//! let text = engine.to_ocafile(&bundle);
//! assert_eq!(engine.build(&text).unwrap().digest(), bundle.digest());
//! ```
//!
//! ## Re-exports
//!
//! - `oca_bundle::core` - Data model and digests
//! - `oca_bundle::registry` - Overlay registries
//! - `oca_bundle::file` - OCAfile parser and generator
//! - `oca_bundle::validation` - Semantic and data validation

pub mod api;
pub mod assembler;
pub mod config;
pub mod engine;
pub mod error;
pub mod serializer;

pub use oca_bundle_core as core;
pub use oca_bundle_file as file;
pub use oca_bundle_registry as registry;
pub use oca_bundle_validation as validation;

pub use api::{
    build_from_ocafile, bundle_attributes, bundle_to_ocafile, validate_bundle_data,
    validate_bundle_semantics, AttributeInfo, ValidationOutcome,
};
pub use assembler::{assemble, AssemblyError};
pub use config::{DataValidationConfig, EngineConfig, RegistrySource};
pub use engine::Engine;
pub use error::{BundleError, Result};
pub use serializer::{to_commands, to_ocafile};

pub use oca_bundle_core::{Bundle, CaptureBase, NestedAttrType, Overlay, OverlayBody, OverlayKind, Said};
pub use oca_bundle_validation::{DataValidationError, SemanticError, ValidationReport};
