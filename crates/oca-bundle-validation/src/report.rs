//! Validation reports: every finding, never short-circuited.

use std::fmt;

/// Ordered collection of validation findings.
///
/// A report with no errors means the subject is valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport<E> {
    errors: Vec<E>,
}

impl<E> ValidationReport<E> {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn push(&mut self, error: E) {
        self.errors.push(error);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[E] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<E> {
        self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl<E: fmt::Display> ValidationReport<E> {
    /// Rendered error messages, in report order.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

impl<E> Default for ValidationReport<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> FromIterator<E> for ValidationReport<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl<E> Extend<E> for ValidationReport<E> {
    fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
        self.errors.extend(iter);
    }
}
