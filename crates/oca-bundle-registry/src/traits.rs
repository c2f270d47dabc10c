//! Registry trait: the lookup service overlay names are resolved through.
//!
//! The assembler resolves `ADD OVERLAY <name>` through a registry, the
//! serializer maps type tags back to display names, and the engine tells the
//! semantic validator which custom kinds are language-scoped.

use std::sync::Arc;

use oca_bundle_core::{custom_type_tag, OverlayKind};

/// One overlay kind known to a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayDefinition {
    /// Display name, as written after `ADD OVERLAY`.
    pub name: String,
    /// Typed kind, or [`OverlayKind::Custom`] for registry-only kinds.
    pub kind: OverlayKind,
    pub version: String,
    pub language_scoped: bool,
    /// Alternative names accepted by [`OverlayRegistry::resolve`].
    pub aliases: Vec<String>,
}

impl OverlayDefinition {
    /// Definition of a built-in kind.
    pub fn builtin(kind: OverlayKind) -> Self {
        Self {
            name: kind.name().to_string(),
            kind,
            version: oca_bundle_core::overlay::BUILTIN_OVERLAY_VERSION.to_string(),
            language_scoped: kind.language_scoped(),
            aliases: Vec::new(),
        }
    }

    /// Definition of a registry-only kind.
    pub fn custom(
        name: impl Into<String>,
        version: impl Into<String>,
        language_scoped: bool,
        aliases: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: OverlayKind::Custom,
            version: version.into(),
            language_scoped,
            aliases,
        }
    }

    /// Wire type tag of overlays of this kind.
    pub fn type_tag(&self) -> String {
        self.kind
            .type_tag()
            .unwrap_or_else(|| custom_type_tag(&self.name, &self.version))
    }

    /// Whether `name` refers to this definition (by name or alias).
    pub fn matches(&self, name: &str) -> bool {
        let wanted = normalize_name(name);
        normalize_name(&self.name) == wanted
            || self.aliases.iter().any(|a| normalize_name(a) == wanted)
    }
}

/// Normalize an overlay name for lookups: lowercase, with `_`, `-` and
/// spaces removed. `CHARACTER_ENCODING`, `character-encoding` and
/// `CharacterEncoding` all normalize to `characterencoding`.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Read-only overlay lookup service.
///
/// Implementations are immutable after construction and shared across
/// threads without locking.
pub trait OverlayRegistry: Send + Sync {
    /// All definitions, built-ins first.
    fn definitions(&self) -> &[OverlayDefinition];

    /// Resolve an `ADD OVERLAY` name.
    fn resolve(&self, name: &str) -> Option<&OverlayDefinition> {
        self.definitions().iter().find(|d| d.matches(name))
    }

    /// Resolve a wire type tag.
    fn resolve_tag(&self, tag: &str) -> Option<&OverlayDefinition> {
        self.definitions().iter().find(|d| d.type_tag() == tag)
    }
}

impl<R: OverlayRegistry + ?Sized> OverlayRegistry for Arc<R> {
    fn definitions(&self) -> &[OverlayDefinition] {
        (**self).definitions()
    }

    fn resolve(&self, name: &str) -> Option<&OverlayDefinition> {
        (**self).resolve(name)
    }

    fn resolve_tag(&self, tag: &str) -> Option<&OverlayDefinition> {
        (**self).resolve_tag(tag)
    }
}

impl<R: OverlayRegistry + ?Sized> OverlayRegistry for Box<R> {
    fn definitions(&self) -> &[OverlayDefinition] {
        (**self).definitions()
    }

    fn resolve(&self, name: &str) -> Option<&OverlayDefinition> {
        (**self).resolve(name)
    }

    fn resolve_tag(&self, tag: &str) -> Option<&OverlayDefinition> {
        (**self).resolve_tag(tag)
    }
}
