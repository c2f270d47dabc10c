//! # OCA Bundle Validation
//!
//! Two independent checks over an assembled [`Bundle`](oca_bundle_core::Bundle):
//!
//! - **Semantic validation** ([`validate_semantics`]): is the bundle
//!   internally consistent? Overlays must reference declared attributes,
//!   language-scoped overlays need a language, entry codes, cardinalities,
//!   conformances, conditions and formats must be well formed, and every
//!   stored digest must match its content.
//! - **Data validation** ([`validate_data`]): does a JSON record satisfy the
//!   constraints the bundle expresses?
//!
//! Both return a [`ValidationReport`] listing every finding in order.

pub mod condition;
pub mod data;
pub mod format;
pub mod report;
pub mod semantic;

pub use condition::{Condition, ConditionError};
pub use data::{validate_data, DataValidationConfig, DataValidationError};
pub use format::{CharacterEncoding, DateTimeFormat};
pub use report::ValidationReport;
pub use semantic::{validate_semantics, validate_semantics_with, SemanticError, SemanticRules};
