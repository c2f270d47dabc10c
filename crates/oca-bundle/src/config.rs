//! Engine configuration.

use std::path::PathBuf;

pub use oca_bundle_validation::DataValidationConfig;

/// Configuration for the [`Engine`](crate::Engine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Run the semantic validator after every build and log its findings.
    pub validate_on_build: bool,
    /// Data validation settings.
    pub data: DataValidationConfig,
    /// Languages every language-scoped overlay kind in a bundle must be
    /// translated into. Empty disables the check.
    pub enforce_translations: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            validate_on_build: true,
            data: DataValidationConfig::default(),
            enforce_translations: Vec::new(),
        }
    }
}

/// Where overlay definitions come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RegistrySource {
    /// Built-in overlay kinds only.
    #[default]
    BuiltIn,
    /// Built-ins plus every `*.json` registry file in a directory.
    Directory(PathBuf),
}

impl RegistrySource {
    /// `None` or a blank path selects the built-in registry.
    pub fn from_path(path: Option<&str>) -> Self {
        match path.map(str::trim) {
            Some(p) if !p.is_empty() => Self::Directory(PathBuf::from(p)),
            _ => Self::BuiltIn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.validate_on_build);
        assert!(config.data.required_by_default);
        assert!(config.enforce_translations.is_empty());
    }

    #[test]
    fn test_source_from_path() {
        assert_eq!(RegistrySource::from_path(None), RegistrySource::BuiltIn);
        assert_eq!(RegistrySource::from_path(Some("  ")), RegistrySource::BuiltIn);
        assert_eq!(
            RegistrySource::from_path(Some("registry")),
            RegistrySource::Directory(PathBuf::from("registry"))
        );
    }
}
