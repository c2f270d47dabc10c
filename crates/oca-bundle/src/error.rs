//! Error types for the bundle engine.

use oca_bundle_core::CoreError;
use oca_bundle_file::SyntaxError;
use oca_bundle_registry::RegistryError;
use thiserror::Error;

use crate::assembler::AssemblyError;

/// Errors that can occur during engine operations.
///
/// Validation findings are not errors; they are returned in reports.
#[derive(Debug, Error)]
pub enum BundleError {
    /// OCAfile syntax error.
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    /// The commands did not assemble into a bundle.
    #[error("assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    /// The overlay registry could not be loaded.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Bundle JSON could not be decoded.
    #[error("invalid bundle JSON: {0}")]
    InvalidBundleJson(#[source] serde_json::Error),

    /// Data JSON could not be decoded.
    #[error("invalid data JSON: {0}")]
    InvalidDataJson(#[source] serde_json::Error),

    /// Encoding or digest failure.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, BundleError>;
