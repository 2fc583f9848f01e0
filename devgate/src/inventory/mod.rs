//! Device inventory: descriptors, supported kinds and the resolver.

pub mod device;
pub mod kinds;
mod resolver;

pub use device::{DEFAULT_PORT, DeviceDescriptor, DeviceSummary};
pub use resolver::{DEFAULT_SECTION, Inventory};

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// When the inventory document is read from disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPolicy {
    /// Re-read the document on every lookup. Edits apply immediately.
    #[default]
    Always,
    /// Keep the last resolved inventory until [`InventoryStore::reload`].
    OnSignal,
}

/// Source of the current inventory, honoring a [`ReloadPolicy`].
///
/// With [`ReloadPolicy::Always`] nothing is cached and concurrent readers each
/// resolve their own copy (last read wins). With [`ReloadPolicy::OnSignal`]
/// readers share one `Arc<Inventory>` that is swapped on reload.
#[derive(Debug)]
pub struct InventoryStore {
    path: PathBuf,
    policy: ReloadPolicy,
    cached: RwLock<Option<Arc<Inventory>>>,
}

impl InventoryStore {
    pub fn new(path: impl Into<PathBuf>, policy: ReloadPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
            cached: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> ReloadPolicy {
        self.policy
    }

    /// The inventory to use for the current request.
    pub fn current(&self) -> Result<Arc<Inventory>, ConfigError> {
        match self.policy {
            ReloadPolicy::Always => Inventory::load(&self.path).map(Arc::new),
            ReloadPolicy::OnSignal => {
                if let Some(inventory) = self.read_cache() {
                    return Ok(inventory);
                }
                self.reload()
            }
        }
    }

    /// Re-read the document and replace the cached copy.
    ///
    /// On failure the previous copy stays in place.
    pub fn reload(&self) -> Result<Arc<Inventory>, ConfigError> {
        let inventory = Arc::new(Inventory::load(&self.path)?);
        if self.policy == ReloadPolicy::OnSignal {
            let mut cached = self
                .cached
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *cached = Some(inventory.clone());
            info!(
                "inventory reloaded from {} ({} devices)",
                self.path.display(),
                inventory.len()
            );
        }
        Ok(inventory)
    }

    fn read_cache(&self) -> Option<Arc<Inventory>> {
        self.cached
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Seek, Write};

    use super::*;

    fn write_inventory(file: &mut tempfile::NamedTempFile, host: &str) {
        file.as_file_mut().set_len(0).unwrap();
        file.as_file_mut().rewind().unwrap();
        write!(
            file,
            "[r1]\nhostname = \"{host}\"\ndevice_type = \"cisco_ios\"\n"
        )
        .unwrap();
        file.flush().unwrap();
    }

    #[test]
    fn test_always_policy_sees_edits() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write_inventory(&mut file, "10.0.0.1");
        let store = InventoryStore::new(file.path(), ReloadPolicy::Always);
        assert_eq!(store.current().unwrap().get("r1").unwrap().hostname(), "10.0.0.1");

        write_inventory(&mut file, "10.0.0.2");
        assert_eq!(store.current().unwrap().get("r1").unwrap().hostname(), "10.0.0.2");
    }

    #[test]
    fn test_on_signal_policy_caches_until_reload() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write_inventory(&mut file, "10.0.0.1");
        let store = InventoryStore::new(file.path(), ReloadPolicy::OnSignal);
        assert_eq!(store.current().unwrap().get("r1").unwrap().hostname(), "10.0.0.1");

        write_inventory(&mut file, "10.0.0.2");
        assert_eq!(store.current().unwrap().get("r1").unwrap().hostname(), "10.0.0.1");

        store.reload().unwrap();
        assert_eq!(store.current().unwrap().get("r1").unwrap().hostname(), "10.0.0.2");
    }

    #[test]
    fn test_failed_reload_keeps_previous_copy() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write_inventory(&mut file, "10.0.0.1");
        let store = InventoryStore::new(file.path(), ReloadPolicy::OnSignal);
        store.current().unwrap();

        file.as_file_mut().set_len(0).unwrap();
        file.as_file_mut().rewind().unwrap();
        write!(file, "[broken").unwrap();
        file.flush().unwrap();

        assert!(store.reload().is_err());
        assert_eq!(store.current().unwrap().get("r1").unwrap().hostname(), "10.0.0.1");
    }

    #[test]
    fn test_reload_policy_names() {
        let policy: ReloadPolicy = serde_json::from_str("\"on_signal\"").unwrap();
        assert_eq!(policy, ReloadPolicy::OnSignal);
    }
}
