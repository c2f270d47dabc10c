//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the canonical encoding and digest scheme: any change to
//! either shows up as a digest mismatch here first.

use oca_bundle::assemble;
use oca_bundle_core::{canonical_bytes, Bundle};
use oca_bundle_file::parse;
use oca_bundle_registry::MemoryRegistry;

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// OCAfile source.
    pub ocafile: &'static str,
    /// Expected capture base digest.
    pub expected_capture_base: &'static str,
    /// Expected overlay digests, in bundle order.
    pub expected_overlays: &'static [&'static str],
    /// Expected bundle digest.
    pub expected_bundle: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "empty OCAfile",
            ocafile: "",
            expected_capture_base: "E9b25c76298cf5739a7bd523f4b2969bb2b4b36109e1966413840c8c020598c1b",
            expected_overlays: &[],
            expected_bundle: "E55eebb9b0f282a4ddbd7ef3b7df563eac7d3b9d37495b1010ba9eefd295a7502",
        },
        GoldenVector {
            name: "two attributes",
            ocafile: "ADD ATTRIBUTE name=Text age=Numeric\n",
            expected_capture_base: "Ee2eacf9dedf8649e0233ec3f24e9d903c22b3e12ea5237d1578d4a90d3517a63",
            expected_overlays: &[],
            expected_bundle: "Ebfa9a2c5a01a880af4d3dbcaa88bc5c5b313e9c556e948f025c4b1ca9314ee47",
        },
        GoldenVector {
            name: "classification and array attribute",
            ocafile: "ADD CLASSIFICATION GICS:35102020\nADD ATTRIBUTE tags=Array[Text] photo=Binary\n",
            expected_capture_base: "Ef124af6fe37bf497fc340f80e2b766f8757dc370265e330b87e50968f54f49f4",
            expected_overlays: &[],
            expected_bundle: "Ef3e26e8cb84c18747758f9dab02e3170ab1dd15983d619e127c90e0fc8c8dc70",
        },
        GoldenVector {
            name: "label overlay",
            ocafile: "ADD ATTRIBUTE name=Text age=Numeric\n\
                      ADD OVERLAY LABEL\n  language=\"en\"\n  attribute_labels\n    name=\"Full name\"\n",
            expected_capture_base: "Ee2eacf9dedf8649e0233ec3f24e9d903c22b3e12ea5237d1578d4a90d3517a63",
            expected_overlays: &["E47a219a92da938474f6781993f89887f9c6aa97444066557f76c2f4fcbb137fe"],
            expected_bundle: "E564658e36d842f6d0d8aa7912f0258c78a6eb3d2da4701eb55ffef4a962aab0d",
        },
        GoldenVector {
            name: "label and entry code overlays",
            ocafile: "ADD ATTRIBUTE name=Text age=Numeric\n\
                      ADD OVERLAY LABEL\n  language=\"en\"\n  attribute_labels\n    name=\"Full name\"\n\
                      ADD OVERLAY ENTRY_CODE\n  attribute_entry_codes\n    sex=[\"M\", \"F\"]\n",
            expected_capture_base: "Ee2eacf9dedf8649e0233ec3f24e9d903c22b3e12ea5237d1578d4a90d3517a63",
            expected_overlays: &[
                "E47a219a92da938474f6781993f89887f9c6aa97444066557f76c2f4fcbb137fe",
                "Ef8b459fd365fc5f1629e2fc78f16c3e2aa495d741d3ef718899e1d6c7e3c9f06",
            ],
            expected_bundle: "E776a84c85a4de733b99f33e8e7ea8dc75ae056e8d7cc3f03fff88f5fb6aa6570",
        },
    ]
}

/// A small JSON value covering key sorting, arrays and negative integers.
pub const CANONICAL_SAMPLE_JSON: &str = r#"{"bb": 1, "a": [true, null, "x"], "c": -1}"#;
/// Canonical CBOR of [`CANONICAL_SAMPLE_JSON`], as lowercase hex.
pub const CANONICAL_SAMPLE_HEX: &str = "a3616183f5f6617861632062626201";

/// Build the bundle a vector describes, with the built-in registry.
pub fn bundle_from_vector(vector: &GoldenVector) -> Bundle {
    let file = parse(vector.ocafile).unwrap_or_else(|e| panic!("{}: {e}", vector.name));
    assemble(&file, &MemoryRegistry::default()).unwrap_or_else(|e| panic!("{}: {e}", vector.name))
}

/// Check every vector. Returns `(name, matches, computed bundle digest)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let bundle = bundle_from_vector(v);
            let overlays: Vec<String> = bundle.overlays().iter().map(|o| o.digest().to_string()).collect();
            let matches = bundle.capture_base().digest().to_string() == v.expected_capture_base
                && overlays == v.expected_overlays
                && bundle.digest().to_string() == v.expected_bundle;
            (v.name.to_string(), matches, bundle.digest().to_string())
        })
        .collect()
}

/// Hex of the canonical encoding of [`CANONICAL_SAMPLE_JSON`].
pub fn canonical_sample_hex() -> String {
    let value: serde_json::Value =
        serde_json::from_str(CANONICAL_SAMPLE_JSON).unwrap_or_else(|e| panic!("sample JSON: {e}"));
    let bytes = canonical_bytes(&value).unwrap_or_else(|e| panic!("sample encoding: {e}"));
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectors_match() {
        for (name, matches, digest) in verify_all_vectors() {
            assert!(matches, "vector {name:?} computed {digest}");
        }
    }

    #[test]
    fn test_canonical_sample() {
        assert_eq!(canonical_sample_hex(), CANONICAL_SAMPLE_HEX);
    }

    #[test]
    fn test_vector_bundles_are_semantically_valid() {
        // Only the last vector has an entry code for an undeclared attribute.
        for vector in all_vectors().iter().take(4) {
            let report = oca_bundle::validation::validate_semantics(&bundle_from_vector(vector));
            assert!(report.is_valid(), "{}: {:?}", vector.name, report.messages());
        }
    }
}
