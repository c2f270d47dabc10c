//! Syntax errors.

use thiserror::Error;

/// A syntax error with its 1-based source position.
///
/// Lines joined by a trailing `\` report the line the statement starts on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}, column {column}: {kind}")]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub kind: SyntaxErrorKind,
}

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxErrorKind {
    #[error("unknown keyword {0:?}")]
    UnknownKeyword(String),

    #[error("expected `key=value` or a bare key")]
    MissingEquals,

    #[error("expected a value for {0}")]
    MissingValue(&'static str),

    #[error("unterminated quoted string")]
    UnterminatedString,

    #[error("unterminated array")]
    UnterminatedArray,

    #[error("unexpected characters after value")]
    TrailingCharacters,

    #[error("tab character in indentation")]
    TabIndentation,

    #[error("indented line outside an overlay block")]
    IndentOutsideBlock,

    #[error("indented block under a key that already has a value")]
    IndentUnderValue,

    #[error("dedent does not match any enclosing indentation level")]
    InconsistentDedent,

    #[error("--name header must be the first statement")]
    MisplacedHeader,

    #[error("duplicate --name header")]
    DuplicateHeader,

    #[error("attribute {0:?} is not of the form name=Type")]
    MalformedAttribute(String),

    #[error("unknown attribute type {0:?}")]
    UnknownAttributeType(String),

    #[error("ADD ATTRIBUTE lists no attributes")]
    EmptyAttributeList,
}

/// Result type for parsing.
pub type Result<T> = std::result::Result<T, SyntaxError>;
