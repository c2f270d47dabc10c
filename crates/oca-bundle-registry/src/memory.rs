//! In-memory registry.
//!
//! [`MemoryRegistry::default`] holds one definition per built-in overlay
//! kind. Custom definitions can be added before the registry is shared.

use oca_bundle_core::OverlayKind;

use crate::traits::{normalize_name, OverlayDefinition, OverlayRegistry};

/// Registry backed by a plain vector of definitions.
#[derive(Debug, Clone)]
pub struct MemoryRegistry {
    definitions: Vec<OverlayDefinition>,
}

impl MemoryRegistry {
    /// Registry with the built-in definitions.
    pub fn new() -> Self {
        Self {
            definitions: OverlayKind::BUILTIN
                .into_iter()
                .map(OverlayDefinition::builtin)
                .collect(),
        }
    }

    /// Registry with no definitions at all.
    pub fn empty() -> Self {
        Self {
            definitions: Vec::new(),
        }
    }

    /// Add a definition.
    ///
    /// Fails with the clashing name if the definition's name or one of its
    /// aliases already resolves to another definition.
    pub fn insert(&mut self, definition: OverlayDefinition) -> Result<(), String> {
        if let Some(clash) = self.clash(&definition) {
            return Err(clash);
        }
        self.definitions.push(definition);
        Ok(())
    }

    /// Add aliases to an existing definition.
    ///
    /// Returns false when `name` resolves to nothing. Aliases that already
    /// resolve somewhere are reported as the error value.
    pub fn add_aliases(&mut self, name: &str, aliases: &[String]) -> Result<bool, String> {
        let Some(index) = self.definitions.iter().position(|d| d.matches(name)) else {
            return Ok(false);
        };
        for alias in aliases {
            match self.definitions.iter().position(|d| d.matches(alias)) {
                Some(other) if other == index => continue,
                Some(_) => return Err(alias.clone()),
                None => self.definitions[index].aliases.push(alias.clone()),
            }
        }
        Ok(true)
    }

    fn clash(&self, definition: &OverlayDefinition) -> Option<String> {
        std::iter::once(&definition.name)
            .chain(&definition.aliases)
            .find(|name| self.resolve(name).is_some())
            .map(|name| normalize_name(name))
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayRegistry for MemoryRegistry {
    fn definitions(&self) -> &[OverlayDefinition] {
        &self.definitions
    }
}
