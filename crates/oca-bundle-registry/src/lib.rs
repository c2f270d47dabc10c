//! # OCA Bundle Registry
//!
//! Overlay name resolution. Every `ADD OVERLAY <name>` command is resolved
//! through an [`OverlayRegistry`], which maps display names and aliases to
//! overlay kinds and type tags.
//!
//! ## Key Types
//!
//! - [`OverlayRegistry`] - The read-only lookup trait
//! - [`MemoryRegistry`] - Built-in definitions, optionally extended in code
//! - [`FileRegistry`] - Built-ins plus definitions loaded from a directory
//! - [`OverlayDefinition`] - One known overlay kind
//!
//! ## Usage
//!
//! ```rust,no_run
//! use oca_bundle_registry::{FileRegistry, MemoryRegistry, OverlayRegistry};
//!
//! let builtin = MemoryRegistry::default();
//! assert!(builtin.resolve("character_encoding").is_some());
//!
//! let extended = FileRegistry::from_dir("registry").unwrap();
//! let _ = extended.resolve("passport_extra");
//! ```

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{RegistryError, Result};
pub use file::FileRegistry;
pub use memory::MemoryRegistry;
pub use traits::{normalize_name, OverlayDefinition, OverlayRegistry};
