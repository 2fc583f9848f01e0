//! Platform registry: maps device kinds onto platform families.

use std::collections::HashMap;
use std::sync::LazyLock;

use log::warn;

use super::definition::PlatformDefinition;
use super::vendors;
use crate::inventory::kinds;

static REGISTRY: LazyLock<PlatformRegistry> = LazyLock::new(PlatformRegistry::builtin);

/// Family definitions plus the kind-to-family table.
#[derive(Debug, Default)]
pub struct PlatformRegistry {
    platforms: HashMap<String, PlatformDefinition>,
    kinds: HashMap<String, String>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared registry with every built-in family.
    pub fn global() -> &'static PlatformRegistry {
        &REGISTRY
    }

    /// Registry populated with the built-in vendor families.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (constructor, aliases) in vendors::BUILTIN {
            match constructor() {
                Ok(platform) => registry.register(platform, aliases.iter().copied()),
                Err(e) => warn!("built-in platform skipped: {e}"),
            }
        }
        registry
    }

    /// Add a family and the device kinds that use it.
    ///
    /// A family registered under an existing name replaces it.
    pub fn register<'a>(
        &mut self,
        platform: PlatformDefinition,
        kinds: impl IntoIterator<Item = &'a str>,
    ) {
        for kind in kinds {
            self.kinds.insert(kind.to_string(), platform.name.clone());
        }
        self.kinds
            .insert(platform.name.clone(), platform.name.clone());
        self.platforms.insert(platform.name.clone(), platform);
    }

    /// Family by its own name.
    pub fn get(&self, name: &str) -> Option<&PlatformDefinition> {
        self.platforms.get(name)
    }

    /// Family for a device kind. Telnet kinds use their base family; kinds
    /// without a family get a generic definition with no commit or save.
    pub fn resolve(&self, kind: &str) -> PlatformDefinition {
        let base = kinds::base_kind(kind);
        self.kinds
            .get(base)
            .and_then(|family| self.platforms.get(family))
            .cloned()
            .unwrap_or_else(|| PlatformDefinition::new(base))
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.platforms.keys()
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }
}
