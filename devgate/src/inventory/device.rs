//! Validated, immutable description of one manageable endpoint.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::kinds;
use crate::error::ConfigError;

/// Port assumed when an entry does not name one.
pub const DEFAULT_PORT: u16 = 22;

/// One device as known to the gateway.
///
/// A descriptor can only be obtained through [`DeviceDescriptor::new`], which
/// rejects unsupported device kinds, so every descriptor in circulation is
/// valid. Fields are read-only after construction.
#[derive(Clone)]
pub struct DeviceDescriptor {
    name: String,
    hostname: String,
    kind: String,
    username: String,
    password: SecretString,
    port: u16,
}

/// Public listing of a device; credentials are never part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSummary {
    pub name: String,
    pub hostname: String,
    pub device_type: String,
}

impl DeviceDescriptor {
    /// Construct a descriptor, validating `kind` against the supported set.
    pub fn new(
        name: impl Into<String>,
        hostname: impl Into<String>,
        kind: impl Into<String>,
        username: impl Into<String>,
        password: SecretString,
        port: u16,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let kind = kind.into();

        if !kinds::is_supported(&kind) {
            return Err(ConfigError::InvalidKind { name, kind });
        }

        Ok(Self {
            name,
            hostname: hostname.into(),
            kind,
            username: username.into(),
            password,
            port,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Device kind (e.g. `cisco_ios`, `juniper_junos_telnet`).
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The listing form of this device.
    pub fn summary(&self) -> DeviceSummary {
        DeviceSummary {
            name: self.name.clone(),
            hostname: self.hostname.clone(),
            device_type: self.kind.clone(),
        }
    }
}

impl PartialEq for DeviceDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.hostname == other.hostname
            && self.kind == other.kind
            && self.username == other.username
            && self.password.expose_secret() == other.password.expose_secret()
            && self.port == other.port
    }
}

impl Eq for DeviceDescriptor {}

impl fmt::Debug for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceDescriptor")
            .field("name", &self.name)
            .field("hostname", &self.hostname)
            .field("kind", &self.kind)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .finish()
    }
}
