//! Error types for the overlay registry.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading an overlay registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Registry directory does not exist.
    #[error("registry directory not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Registry path exists but is not a directory.
    #[error("registry path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Reading the directory or a registry file failed.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A registry file is not valid registry JSON.
    #[error("malformed registry file {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    /// Two definitions share a (normalized) name or alias.
    #[error("duplicate overlay definition {name:?} in {}", path.display())]
    DuplicateDefinition { name: String, path: PathBuf },
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
