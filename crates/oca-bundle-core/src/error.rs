//! Error types for the OCA bundle core.

use thiserror::Error;

/// Core errors that can occur while building or decoding bundle primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown digest algorithm code: {0:?}")]
    UnknownAlgorithm(char),

    #[error("malformed digest: {0}")]
    MalformedDigest(String),

    #[error("invalid attribute type: {0}")]
    InvalidAttributeType(String),

    #[error("malformed cardinality {0:?}: expected <min>..<max>")]
    MalformedCardinality(String),

    #[error("malformed overlay: {0}")]
    MalformedOverlay(String),

    #[error("encoding error: {0}")]
    EncodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
