//! Property tests over generated OCAfiles.

use proptest::prelude::*;

use oca_bundle::file::{generate, parse};
use oca_bundle::registry::MemoryRegistry;
use oca_bundle::{assemble, to_ocafile, Bundle, SemanticError};
use oca_bundle_testkit::generators::ocafile;

fn registry() -> MemoryRegistry {
    MemoryRegistry::default()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_generated_text_assembles_identically(file in ocafile()) {
        let direct = assemble(&file, &registry()).unwrap();
        let text = generate(&file);
        let parsed = parse(&text).unwrap();
        let again = assemble(&parsed, &registry()).unwrap();
        prop_assert_eq!(again.digest(), direct.digest());
    }

    #[test]
    fn prop_serializer_round_trips(file in ocafile()) {
        let bundle = assemble(&file, &registry()).unwrap();
        let text = to_ocafile(&bundle, &registry());
        let again = assemble(&parse(&text).unwrap(), &registry()).unwrap();
        prop_assert_eq!(&again, &bundle);
        // The serializer output is a fixed point.
        prop_assert_eq!(to_ocafile(&again, &registry()), text);
    }

    #[test]
    fn prop_layout_does_not_change_digest(file in ocafile()) {
        let text = generate(&file);
        let relaxed = format!("\n# generated\n{}", text
            .replace("ADD ATTRIBUTE", "add attribute")
            .replace("ADD OVERLAY", "Add Overlay")
            .replace("\n  ", "\n    ")
            .replace("\n\n", "\n\n\n"));
        let a = assemble(&parse(&text).unwrap(), &registry()).unwrap();
        let b = assemble(&parse(&relaxed).unwrap(), &registry()).unwrap();
        prop_assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn prop_bundle_json_round_trips(file in ocafile()) {
        let bundle = assemble(&file, &registry()).unwrap();
        let json = bundle.to_json_pretty().unwrap();
        let decoded = Bundle::from_json(&json).unwrap();
        prop_assert_eq!(&decoded, &bundle);

        let report = oca_bundle::validation::validate_semantics(&decoded);
        let integrity_failures = report
            .errors()
            .iter()
            .filter(|e| matches!(e, SemanticError::DigestMismatch { .. } | SemanticError::CaptureBaseMismatch { .. }))
            .count();
        prop_assert_eq!(integrity_failures, 0);
    }

    #[test]
    fn prop_attribute_count_matches(file in ocafile()) {
        let bundle = assemble(&file, &registry()).unwrap();
        let declared: usize = file
            .commands
            .iter()
            .map(|c| match &c.kind {
                oca_bundle::file::CommandKind::AddAttribute(attrs) => attrs.len(),
                _ => 0,
            })
            .sum();
        prop_assert_eq!(bundle.capture_base().attributes().len(), declared);
    }
}
