//! Inventory document loading with `default` inheritance.
//!
//! The document is TOML. One reserved top-level table, `default`, holds field
//! values copied into every other entry that does not set them itself:
//!
//! ```toml
//! [default]
//! username = "rouser"
//! password = "secret"
//!
//! [qfx1]
//! hostname = "10.0.0.1"
//! device_type = "juniper_junos"
//!
//! [linux1]
//! hostname = "10.0.0.2"
//! device_type = "linux"
//! username = "linuxuser"
//! ```
//!
//! The merge is shallow and per field. `default` itself never becomes a device.

use std::path::Path;

use indexmap::IndexMap;
use log::debug;
use secrecy::SecretString;
use serde::Deserialize;
use toml::{Table, Value};

use super::device::{DEFAULT_PORT, DeviceDescriptor, DeviceSummary};
use crate::error::ConfigError;

/// Reserved key holding inherited field values.
pub const DEFAULT_SECTION: &str = "default";

/// Recognized fields of one entry, after the merge.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    name: Option<String>,
    hostname: Option<String>,
    device_type: Option<String>,
    username: Option<String>,
    password: Option<String>,
    port: Option<u16>,
}

/// All devices resolved from one inventory document, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    devices: IndexMap<String, DeviceDescriptor>,
}

impl Inventory {
    /// Load and resolve the inventory file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let table: Table = toml::from_str(&source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let inventory = Self::from_table(table)?;
        debug!(
            "resolved {} devices from {}",
            inventory.len(),
            path.display()
        );
        Ok(inventory)
    }

    /// Resolve an already-parsed document.
    pub fn from_table(table: Table) -> Result<Self, ConfigError> {
        let defaults = match table.get(DEFAULT_SECTION) {
            Some(Value::Table(defaults)) => defaults.clone(),
            Some(_) => {
                return Err(ConfigError::NotATable {
                    name: DEFAULT_SECTION.to_string(),
                });
            }
            None => Table::new(),
        };

        let mut devices = IndexMap::with_capacity(table.len());
        for (key, value) in table {
            if key == DEFAULT_SECTION {
                continue;
            }
            let Value::Table(entry) = value else {
                return Err(ConfigError::NotATable { name: key });
            };
            let device = resolve_entry(&key, merge_defaults(entry, &defaults))?;
            devices.insert(key, device);
        }

        Ok(Self { devices })
    }

    /// Look up a device by its inventory key.
    pub fn get(&self, name: &str) -> Option<&DeviceDescriptor> {
        self.devices.get(name)
    }

    /// Iterate devices in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DeviceDescriptor)> {
        self.devices.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Credential-free listing of every device.
    pub fn summaries(&self) -> Vec<DeviceSummary> {
        self.devices.values().map(DeviceDescriptor::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Field that names one entry; never inherited.
const NAME_FIELD: &str = "name";

/// Copy every default field the entry does not set. Top level only.
fn merge_defaults(mut entry: Table, defaults: &Table) -> Table {
    for (field, value) in defaults {
        if field != NAME_FIELD && !entry.contains_key(field) {
            entry.insert(field.clone(), value.clone());
        }
    }
    entry
}

fn resolve_entry(key: &str, entry: Table) -> Result<DeviceDescriptor, ConfigError> {
    let raw: RawEntry = Value::Table(entry)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::InvalidEntry {
            name: key.to_string(),
            message: e.message().to_string(),
        })?;

    DeviceDescriptor::new(
        raw.name.unwrap_or_else(|| key.to_string()),
        raw.hostname.unwrap_or_default(),
        raw.device_type.unwrap_or_default(),
        raw.username.unwrap_or_default(),
        SecretString::from(raw.password.unwrap_or_default()),
        raw.port.unwrap_or(DEFAULT_PORT),
    )
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use secrecy::ExposeSecret;

    use super::*;

    const SAMPLE: &str = r#"
[default]
username = "rouser"
password = "ropass"
port = 22

[linux1]
hostname = "192.168.0.10"
device_type = "linux"
username = "linuxuser"

[qfx1]
hostname = "192.168.0.20"
device_type = "juniper_junos"

[xr1]
name = "core-xr"
hostname = "192.168.0.30"
device_type = "cisco_xr"
port = 2022
"#;

    fn parse(source: &str) -> Result<Inventory, ConfigError> {
        Inventory::from_table(toml::from_str(source).unwrap())
    }

    #[test]
    fn test_sample_inventory() {
        let inventory = parse(SAMPLE).unwrap();
        assert_eq!(inventory.len(), 3);
        assert!(inventory.get(DEFAULT_SECTION).is_none());

        let linux = inventory.get("linux1").unwrap();
        assert_eq!(linux.username(), "linuxuser");
        assert_eq!(linux.password().expose_secret(), "ropass");

        let qfx = inventory.get("qfx1").unwrap();
        assert_eq!(qfx.kind(), "juniper_junos");
        assert_eq!(qfx.username(), "rouser");
        assert_eq!(qfx.name(), "qfx1");
    }

    #[test]
    fn test_entry_overrides_default_per_field() {
        let inventory = parse(
            r#"
[default]
username = "u"
port = 22

[a]
hostname = "h"
device_type = "linux"

[b]
hostname = "h"
device_type = "linux"
username = "v"
"#,
        )
        .unwrap();

        let a = inventory.get("a").unwrap();
        assert_eq!(a.username(), "u");
        assert_eq!(a.port(), 22);
        assert_eq!(a.hostname(), "h");

        let b = inventory.get("b").unwrap();
        assert_eq!(b.username(), "v");
        assert_eq!(b.port(), 22);
    }

    #[test]
    fn test_explicit_name_and_port() {
        let inventory = parse(SAMPLE).unwrap();
        let xr = inventory.get("xr1").unwrap();
        assert_eq!(xr.name(), "core-xr");
        assert_eq!(xr.port(), 2022);
    }

    #[test]
    fn test_default_name_not_inherited() {
        let inventory = parse(
            r#"
[default]
name = "shared"
device_type = "linux"

[a]
hostname = "h1"

[b]
hostname = "h2"
name = "bee"
"#,
        )
        .unwrap();
        assert_eq!(inventory.get("a").unwrap().name(), "a");
        assert_eq!(inventory.get("b").unwrap().name(), "bee");
    }

    #[test]
    fn test_document_order_preserved() {
        let inventory = parse(SAMPLE).unwrap();
        let names: Vec<&str> = inventory.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["linux1", "qfx1", "xr1"]);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        assert_eq!(parse(SAMPLE).unwrap(), parse(SAMPLE).unwrap());
    }

    #[test]
    fn test_invalid_kind_rejected() {
        let err = parse(
            r#"
[bad]
hostname = "h"
device_type = "unknown"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidKind { ref name, .. } if name == "bad"));
    }

    #[test]
    fn test_default_kind_inherited_and_validated() {
        let err = parse(
            r#"
[default]
device_type = "nope"

[a]
hostname = "h"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidKind { .. }));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = parse(
            r#"
[a]
hostname = "h"
device_type = "linux"
secret = "x"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEntry { ref name, .. } if name == "a"));
    }

    #[test]
    fn test_unknown_default_field_rejected() {
        let err = parse(
            r#"
[default]
timeout = 10

[a]
hostname = "h"
device_type = "linux"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEntry { .. }));
    }

    #[test]
    fn test_non_table_entry_rejected() {
        let err = parse(r#"stray = "value""#).unwrap_err();
        assert!(matches!(err, ConfigError::NotATable { ref name } if name == "stray"));
    }

    #[test]
    fn test_out_of_range_port_rejected() {
        let err = parse(
            r#"
[a]
hostname = "h"
device_type = "linux"
port = 70000
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEntry { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let inventory = Inventory::load(file.path()).unwrap();
        assert_eq!(inventory.len(), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Inventory::load(Path::new("/nonexistent/devices.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_unparsable_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[broken").unwrap();
        let err = Inventory::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
