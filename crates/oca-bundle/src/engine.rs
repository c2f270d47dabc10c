//! The Engine: typed access to every bundle operation.

use oca_bundle_core::{Bundle, OverlayKind};
use oca_bundle_file::{parse, OcaFile};
use oca_bundle_registry::{FileRegistry, MemoryRegistry, OverlayRegistry};
use oca_bundle_validation::{
    validate_data, validate_semantics_with, DataValidationError, SemanticError, SemanticRules,
    ValidationReport,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::assembler::assemble;
use crate::config::{EngineConfig, RegistrySource};
use crate::error::Result;
use crate::serializer::to_ocafile;

/// Compiles OCAfiles, validates bundles and data, and regenerates OCAfiles,
/// resolving overlay names through one registry.
///
/// An engine is immutable; share it across threads behind an `Arc`.
pub struct Engine<R: OverlayRegistry> {
    registry: R,
    config: EngineConfig,
}

impl Engine<MemoryRegistry> {
    /// Engine over the built-in overlay kinds with default configuration.
    pub fn builtin() -> Self {
        Self::new(MemoryRegistry::default(), EngineConfig::default())
    }
}

impl Engine<Box<dyn OverlayRegistry>> {
    /// Engine over the registry a [`RegistrySource`] selects.
    pub fn from_source(source: &RegistrySource, config: EngineConfig) -> Result<Self> {
        let registry: Box<dyn OverlayRegistry> = match source {
            RegistrySource::BuiltIn => Box::new(MemoryRegistry::default()),
            RegistrySource::Directory(dir) => Box::new(FileRegistry::from_dir(dir)?),
        };
        Ok(Self::new(registry, config))
    }
}

impl<R: OverlayRegistry> Engine<R> {
    pub fn new(registry: R, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse OCAfile text.
    pub fn parse(&self, text: &str) -> Result<OcaFile> {
        Ok(parse(text)?)
    }

    /// Assemble parsed commands into a bundle.
    pub fn assemble(&self, file: &OcaFile) -> Result<Bundle> {
        Ok(assemble(file, &self.registry)?)
    }

    /// Parse and assemble. With `validate_on_build`, semantic findings are
    /// logged but do not fail the build.
    pub fn build(&self, text: &str) -> Result<Bundle> {
        let bundle = self.assemble(&self.parse(text)?)?;
        if self.config.validate_on_build {
            let report = self.validate_semantics(&bundle);
            for message in report.messages() {
                warn!(bundle = %bundle.digest(), "{message}");
            }
        }
        debug!(digest = %bundle.digest(), "built bundle");
        Ok(bundle)
    }

    /// Validate bundle consistency. Custom kinds the registry marks as
    /// language-scoped need a language, and `enforce_translations` applies.
    pub fn validate_semantics(&self, bundle: &Bundle) -> ValidationReport<SemanticError> {
        validate_semantics_with(bundle, &self.semantic_rules())
    }

    fn semantic_rules(&self) -> SemanticRules {
        SemanticRules {
            language_scoped_tags: self
                .registry
                .definitions()
                .iter()
                .filter(|d| d.kind == OverlayKind::Custom && d.language_scoped)
                .map(|d| d.type_tag())
                .collect(),
            enforce_translations: self.config.enforce_translations.clone(),
        }
    }

    /// Validate a data record with the engine's data settings.
    pub fn validate_data(&self, bundle: &Bundle, data: &Value) -> ValidationReport<DataValidationError> {
        validate_data(bundle, data, &self.config.data)
    }

    pub fn to_ocafile(&self, bundle: &Bundle) -> String {
        to_ocafile(bundle, &self.registry)
    }
}

impl Default for Engine<MemoryRegistry> {
    fn default() -> Self {
        Self::builtin()
    }
}
