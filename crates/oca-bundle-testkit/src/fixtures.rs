//! Test fixtures and helpers.
//!
//! OCAfiles, data records and registry files shared by integration tests.

use std::path::{Path, PathBuf};

use oca_bundle::{Bundle, Engine};
use serde_json::{json, Value};

/// Two attributes, no overlays.
pub const PERSON: &str = "ADD ATTRIBUTE name=Text age=Numeric\n";

/// A single attribute restricted to three entry codes.
pub const GENDER: &str = r#"ADD ATTRIBUTE gender=Text
ADD OVERLAY ENTRY_CODE
  attribute_entry_codes
    gender=["M", "F", "X"]
"#;

/// A passport schema using every built-in overlay kind.
pub const PASSPORT: &str = r#"--name=passport-schema
ADD CLASSIFICATION "identity:passport"
ADD Attribute passport_number=Text \
            issue_date=DateTime \
            expiry_date=DateTime \
            issuing_country=Text \
            gender=Text \
            height=Numeric \
            weight=Numeric \
            guardian=Text \
            birth_year=Numeric

ADD Overlay Meta
  language="en"
  name="Passport Schema"
  description="International passport credential schema"

ADD Overlay Meta
  language="es"
  name="Esquema de Pasaporte"
  description="Esquema de credencial de pasaporte internacional"

ADD OVERLAY Label
  language="en"
  attribute_labels
    passport_number="Passport Number"
    issue_date="Issue Date"
    expiry_date="Expiry Date"
    issuing_country="Issuing Country"
    gender="Gender"
    height="Height (cm)"
    weight="Weight (kg)"

ADD OVERLAY Label
  language="es"
  attribute_labels
    passport_number="Número de Pasaporte"
    issue_date="Fecha de Emisión"
    expiry_date="Fecha de Expiración"
    issuing_country="País Emisor"
    gender="Género"
    height="Altura (cm)"
    weight="Peso (kg)"

ADD OVERLAY Information
  language="en"
  attribute_information
    passport_number="Nine characters, letters and digits"

ADD OVERLAY CHARACTER_ENCODING
  default_character_encoding="utf-8"
  attribute_character_encodings
    issuing_country="iso-8859-1"
    gender="utf-8"

ADD OVERLAY FORMAT
  attribute_formats
    passport_number="[A-Z0-9]{9}"
    issue_date="YYYY-MM-DD"
    expiry_date="YYYY-MM-DD"

ADD OVERLAY UNIT
  metric_system="metric"
  attribute_units
    height="cm"
    weight="kg"

ADD OVERLAY CARDINALITY
  attribute_cardinalities
    passport_number="1..1"
    issue_date="1..1"
    expiry_date="1..1"
    issuing_country="1..1"
    gender="1..1"
    height="0..1"
    weight="0..1"

ADD OVERLAY ENTRY_CODE
  attribute_entry_codes
    gender=["M", "F", "X"]

ADD OVERLAY ENTRY
  language="en"
  attribute_entries
    gender
      "M"="Male"
      "F"="Female"
      "X"="Other/Unspecified"

ADD OVERLAY ENTRY
  language="es"
  attribute_entries
    gender
      "M"="Masculino"
      "F"="Femenino"
      "X"="Otro/No especificado"

ADD OVERLAY SENSITIVE
  attributes
    passport_number
    height

ADD OVERLAY STANDARD
  attribute_standards
    issuing_country="ISO 3166-1 alpha-3"
    gender="ISO 5218"

ADD OVERLAY MAPPING
  attribute_mappings
    passport_number="doc_id"
    issuing_country="country_code"

ADD OVERLAY CONFORMANCE
  attribute_conformances
    passport_number="M"
    guardian="M"
    birth_year="M"

ADD OVERLAY CONDITIONAL
  attribute_conditions
    guardian="${birth_year} > 2008"
  attribute_dependencies
    guardian=["birth_year"]

ADD OVERLAY LINK
  target_bundle="Ef3e26e8cb84c18747758f9dab02e3170ab1dd15983d619e127c90e0fc8c8dc70"
  attribute_mapping
    passport_number="document_number"
    issuing_country="country"

ADD OVERLAY ENTRY_CODE_MAPPING
  attribute_entry_codes_mapping
    gender=["M:male", "F:female", "X:unspecified"]
"#;

/// A passport record that satisfies [`PASSPORT`].
pub fn valid_passport() -> Value {
    json!({
        "passport_number": "X12345678",
        "issue_date": "2020-01-15",
        "expiry_date": "2030-01-14",
        "issuing_country": "España",
        "gender": "F",
        "height": 172,
        "birth_year": 1990
    })
}

/// A passport record with one error per listed attribute: missing
/// `passport_number` and `guardian`, a bad `issue_date` format, an
/// unknown `gender` code and a non-numeric `height`.
pub fn invalid_passport() -> Value {
    json!({
        "issue_date": "15/01/2020",
        "expiry_date": "2030-01-14",
        "issuing_country": "ESP",
        "gender": "Q",
        "height": "tall",
        "birth_year": 2012
    })
}

/// Registry file defining one custom overlay kind.
pub const REGISTRY_JSON: &str = r#"{
  "name": "semantic",
  "overlays": [
    { "name": "Passport_Extra", "version": "1.0.0", "language_scoped": false, "aliases": ["extra"] }
  ]
}
"#;

/// OCAfile using the custom kind from [`REGISTRY_JSON`].
pub const PASSPORT_EXTRA: &str = r#"ADD ATTRIBUTE passport_number=Text
ADD OVERLAY Passport_Extra
  issuer="NLD"
  attribute_notes
    passport_number="Checked at border"
"#;

/// Write [`REGISTRY_JSON`] into `dir` and return the file path.
pub fn write_registry(dir: &Path) -> std::io::Result<PathBuf> {
    let path = dir.join("semantic.overlayfile.json");
    std::fs::write(&path, REGISTRY_JSON)?;
    Ok(path)
}

/// Build an OCAfile with the built-in registry, panicking on failure.
pub fn build(text: &str) -> Bundle {
    Engine::builtin()
        .build(text)
        .unwrap_or_else(|e| panic!("fixture failed to build: {e}"))
}
