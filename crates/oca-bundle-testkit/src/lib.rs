//! # OCA Bundle Testkit
//!
//! Testing utilities for the OCA bundle engine.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: OCAfiles with their expected digests, pinning the
//!   canonical encoding and digest scheme
//! - **Generators**: Proptest strategies for OCAfile syntax trees
//! - **Fixtures**: Shared OCAfiles, data records and registry files
//!
//! ## Golden Vectors
//!
//! ```rust
//! use oca_bundle_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, digest) in verify_all_vectors() {
//!     assert!(matches, "{name}: {digest}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use oca_bundle_testkit::generators::ocafile;
//!
//! proptest! {
//!     #[test]
//!     fn generated_text_reassembles(file in ocafile()) {
//!         let text = oca_bundle::file::generate(&file);
//!         prop_assert!(oca_bundle::file::parse(&text).is_ok());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{build, PASSPORT, PERSON};
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
