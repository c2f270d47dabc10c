//! # OCAfile
//!
//! The human-authored text form of an OCA bundle.
//!
//! ```text
//! --name=person
//! ADD ATTRIBUTE name=Text age=Numeric
//! ADD OVERLAY Label
//!   language="en"
//!   attribute_labels
//!     name="Full name"
//! ```
//!
//! [`parse`] turns text into an [`OcaFile`] (a list of commands), and
//! [`generate`] renders one back. Neither step knows about overlay kinds:
//! interpreting `ADD OVERLAY` blocks is the assembler's job.

pub mod ast;
pub mod error;
pub mod generator;
pub mod parser;

pub use ast::{Command, CommandKind, OcaFile, Property, PropertyValue};
pub use error::{Result, SyntaxError, SyntaxErrorKind};
pub use generator::generate;
pub use parser::parse;
