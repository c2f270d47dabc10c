//! Directory-backed registry.
//!
//! Every `*.json` file in the directory contributes overlay definitions on
//! top of the built-ins:
//!
//! ```json
//! { "name": "semantic",
//!   "overlays": [ { "name": "Passport_Extra", "version": "1.0.0",
//!                   "language_scoped": false, "aliases": ["extra"] } ] }
//! ```
//!
//! Files are read once, in file-name order. A definition that restates a
//! built-in kind only contributes its aliases.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{RegistryError, Result};
use crate::memory::MemoryRegistry;
use crate::traits::{normalize_name, OverlayDefinition, OverlayRegistry};

const DEFAULT_CUSTOM_VERSION: &str = "1.0.0";

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    name: Option<String>,
    overlays: Vec<FileDefinition>,
}

#[derive(Debug, Deserialize)]
struct FileDefinition {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    language_scoped: bool,
    #[serde(default)]
    aliases: Vec<String>,
}

/// Registry loaded from a directory of JSON definition files.
#[derive(Debug, Clone)]
pub struct FileRegistry {
    dir: PathBuf,
    inner: MemoryRegistry,
}

impl FileRegistry {
    /// Load every `*.json` file in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            return Err(RegistryError::NotFound(dir));
        }
        if !dir.is_dir() {
            return Err(RegistryError::NotADirectory(dir));
        }

        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| RegistryError::Io { path, source }
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(&dir).map_err(io_err(&dir))? {
            let path = entry.map_err(io_err(&dir))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            } else {
                warn!(path = %path.display(), "skipping non-registry entry");
            }
        }
        files.sort();

        let mut inner = MemoryRegistry::new();
        let mut origins: HashMap<String, PathBuf> = HashMap::new();
        for path in &files {
            let text = fs::read_to_string(path).map_err(io_err(path))?;
            let file: RegistryFile =
                serde_json::from_str(&text).map_err(|e| RegistryError::Malformed {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            debug!(
                path = %path.display(),
                registry = file.name.as_deref().unwrap_or("<unnamed>"),
                overlays = file.overlays.len(),
                "loading registry file"
            );

            for def in file.overlays {
                load_definition(&mut inner, &mut origins, path, def)?;
            }
        }

        info!(
            dir = %dir.display(),
            files = files.len(),
            definitions = inner.definitions().len(),
            "overlay registry loaded"
        );
        Ok(Self { dir, inner })
    }

    /// The directory this registry was loaded from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn load_definition(
    inner: &mut MemoryRegistry,
    origins: &mut HashMap<String, PathBuf>,
    path: &Path,
    def: FileDefinition,
) -> Result<()> {
    let duplicate = |name: &str| RegistryError::DuplicateDefinition {
        name: name.to_string(),
        path: path.to_path_buf(),
    };

    if def.name.trim().is_empty() {
        return Err(RegistryError::Malformed {
            path: path.to_path_buf(),
            reason: "overlay definition with an empty name".into(),
        });
    }

    let key = normalize_name(&def.name);
    if origins.insert(key, path.to_path_buf()).is_some() {
        return Err(duplicate(&def.name));
    }

    let builtin = inner
        .resolve(&def.name)
        .is_some_and(|existing| existing.kind != oca_bundle_core::OverlayKind::Custom);
    if builtin {
        debug!(name = %def.name, "registry file restates a built-in overlay");
        return match inner.add_aliases(&def.name, &def.aliases) {
            Ok(_) => Ok(()),
            Err(alias) => Err(duplicate(&alias)),
        };
    }

    let definition = OverlayDefinition::custom(
        def.name,
        def.version.unwrap_or_else(|| DEFAULT_CUSTOM_VERSION.to_string()),
        def.language_scoped,
        def.aliases,
    );
    inner.insert(definition).map_err(|name| duplicate(&name))
}

impl OverlayRegistry for FileRegistry {
    fn definitions(&self) -> &[OverlayDefinition] {
        self.inner.definitions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oca_bundle_core::OverlayKind;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join(name), contents).unwrap();
    }

    #[test]
    fn test_loads_custom_definitions() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "semantic.json",
            r#"{"name": "semantic", "overlays": [
                {"name": "Passport_Extra", "version": "1.0.0", "aliases": ["extra"]},
                {"name": "Layout", "language_scoped": true}
            ]}"#,
        );
        write(&dir, "README.md", "not a registry file");

        let registry = FileRegistry::from_dir(dir.path()).unwrap();
        let extra = registry.resolve("extra").unwrap();
        assert_eq!(extra.kind, OverlayKind::Custom);
        assert_eq!(extra.type_tag(), "overlay/passport_extra/1.0.0");

        let layout = registry.resolve("LAYOUT").unwrap();
        assert!(layout.language_scoped);
        assert_eq!(layout.version, DEFAULT_CUSTOM_VERSION);

        // Built-ins stay available.
        assert!(registry.resolve("label").is_some());
    }

    #[test]
    fn test_builtin_restatement_adds_aliases() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.json", r#"{"overlays": [{"name": "label", "aliases": ["caption"]}]}"#);

        let registry = FileRegistry::from_dir(dir.path()).unwrap();
        assert_eq!(registry.resolve("caption").unwrap().kind, OverlayKind::Label);
        assert_eq!(registry.definitions().len(), OverlayKind::BUILTIN.len());
    }

    #[test]
    fn test_duplicate_across_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.json", r#"{"overlays": [{"name": "Layout"}]}"#);
        write(&dir, "b.json", r#"{"overlays": [{"name": "layout"}]}"#);

        let result = FileRegistry::from_dir(dir.path());
        assert!(matches!(result, Err(RegistryError::DuplicateDefinition { .. })));
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, "bad.json", r#"{"overlays": "nope"}"#);

        let result = FileRegistry::from_dir(dir.path());
        assert!(matches!(result, Err(RegistryError::Malformed { .. })));
    }

    #[test]
    fn test_missing_and_non_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(FileRegistry::from_dir(&missing), Err(RegistryError::NotFound(_))));

        write(&dir, "file.json", "{}");
        let file = dir.path().join("file.json");
        assert!(matches!(FileRegistry::from_dir(&file), Err(RegistryError::NotADirectory(_))));
    }
}
