//! Connection parameter derivation.
//!
//! Every function here is a pure transform from a device (or an inline
//! endpoint), a protocol and the gateway settings into the concrete values a
//! transport needs. Nothing here performs I/O or fails: protocol names are
//! parsed, and rejected, before parameters are built.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;

use crate::config::{GatewayConfig, IpmiTimeouts, TerminalTimeouts, WinRmTimeouts};
use crate::error::Error;
use crate::inventory::kinds::{self, TELNET_SUFFIX};
use crate::inventory::{DEFAULT_PORT, DeviceDescriptor};
use crate::transport::HostKeyVerification;

/// Vendors whose telnet driver is not simply `<kind>_telnet`.
///
/// Matched case-insensitively as a substring of the requested kind.
const TELNET_DRIVER_ALIASES: &[(&str, &str)] = &[("h3c", "hp_comware_telnet")];

/// Transport family for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Ssh,
    Telnet,
    WinRm(WinRmScheme),
    Ipmi,
}

impl Protocol {
    /// Conventional port for this protocol.
    pub fn default_port(self) -> u16 {
        match self {
            Self::Ssh => 22,
            Self::Telnet => 23,
            Self::WinRm(WinRmScheme::Http) => 5985,
            Self::WinRm(WinRmScheme::Https) => 5986,
            Self::Ipmi => 623,
        }
    }
}

/// Terminal protocols accepted by the command operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TerminalProtocol {
    #[default]
    Ssh,
    Telnet,
}

impl From<TerminalProtocol> for Protocol {
    fn from(protocol: TerminalProtocol) -> Self {
        match protocol {
            TerminalProtocol::Ssh => Self::Ssh,
            TerminalProtocol::Telnet => Self::Telnet,
        }
    }
}

impl FromStr for TerminalProtocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ssh" => Ok(Self::Ssh),
            "telnet" => Ok(Self::Telnet),
            _ => Err(Error::configuration(format!(
                "unsupported protocol '{s}', expected 'ssh' or 'telnet'"
            ))),
        }
    }
}

impl fmt::Display for TerminalProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ssh => f.write_str("ssh"),
            Self::Telnet => f.write_str("telnet"),
        }
    }
}

/// WinRM endpoint scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum WinRmScheme {
    #[default]
    Http,
    Https,
}

impl WinRmScheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl FromStr for WinRmScheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            _ => Err(Error::configuration(format!(
                "unsupported WinRM scheme '{s}', expected 'http' or 'https'"
            ))),
        }
    }
}

/// WinRM authentication transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum WinRmAuth {
    #[default]
    Basic,
}

impl FromStr for WinRmAuth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            _ => Err(Error::configuration(format!(
                "unsupported WinRM auth transport '{s}', only 'basic' is available"
            ))),
        }
    }
}

/// Username and password for an inline request.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// A host addressed directly, without an inventory entry.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub host: String,
    /// Requested port; `None` selects the protocol default.
    pub port: Option<u16>,
    pub credentials: Credentials,
}

/// Caller-tunable WinRM flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WinRmOptions {
    pub scheme: WinRmScheme,
    pub auth: WinRmAuth,
    /// Validate the server certificate over https.
    pub verify_tls: bool,
}

/// Everything a terminal transport needs to reach a device.
#[derive(Debug, Clone)]
pub struct TerminalParameters {
    pub host: String,
    pub port: u16,
    pub protocol: TerminalProtocol,
    /// Effective device kind, telnet suffix included when applicable.
    pub kind: String,
    pub username: String,
    pub password: SecretString,
    /// Enable secret; the login password is reused.
    pub secret: SecretString,
    pub timeouts: TerminalTimeouts,
    /// Transcript file for this host, when transcripts are enabled.
    pub session_log: Option<PathBuf>,
    pub host_key_verification: HostKeyVerification,
    pub known_hosts: Option<PathBuf>,
}

impl TerminalParameters {
    /// Platform family name (kind without the telnet suffix).
    pub fn platform_name(&self) -> &str {
        kinds::base_kind(&self.kind)
    }
}

/// Everything the WinRM client needs.
#[derive(Debug, Clone)]
pub struct WinRmParameters {
    pub host: String,
    pub port: u16,
    pub scheme: WinRmScheme,
    pub auth: WinRmAuth,
    pub verify_tls: bool,
    pub username: String,
    pub password: SecretString,
    pub timeouts: WinRmTimeouts,
}

impl WinRmParameters {
    /// WS-Management endpoint URL.
    pub fn endpoint_url(&self) -> String {
        format!("{}://{}:{}/wsman", self.scheme.as_str(), self.host, self.port)
    }
}

/// Everything the IPMI client needs.
#[derive(Debug, Clone)]
pub struct IpmiParameters {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub timeouts: IpmiTimeouts,
}

/// Pick the effective port.
///
/// An explicit port other than the inventory default (22) is always kept;
/// otherwise the protocol's conventional port is used.
pub fn effective_port(requested: Option<u16>, protocol: Protocol) -> u16 {
    match requested {
        Some(port) if port != DEFAULT_PORT => port,
        _ => protocol.default_port(),
    }
}

/// Device kind to drive over telnet.
///
/// Aliased vendors get their dedicated driver name; everything else gets the
/// telnet suffix appended once.
pub fn telnet_kind(kind: &str) -> String {
    let lower = kind.to_ascii_lowercase();
    if let Some((_, driver)) = TELNET_DRIVER_ALIASES
        .iter()
        .find(|(needle, _)| lower.contains(needle))
    {
        return (*driver).to_string();
    }

    if kinds::is_telnet(kind) {
        kind.to_string()
    } else {
        format!("{kind}{TELNET_SUFFIX}")
    }
}

/// Derive terminal session parameters for `device`.
///
/// A device whose kind is already a telnet driver is reached over telnet even
/// when `ssh` was requested.
pub fn terminal(
    device: &DeviceDescriptor,
    protocol: TerminalProtocol,
    config: &GatewayConfig,
) -> TerminalParameters {
    let protocol = if kinds::is_telnet(device.kind()) {
        TerminalProtocol::Telnet
    } else {
        protocol
    };

    let (kind, timeouts) = match protocol {
        TerminalProtocol::Ssh => (device.kind().to_string(), config.timeouts.ssh.clone()),
        TerminalProtocol::Telnet => (telnet_kind(device.kind()), config.timeouts.telnet.clone()),
    };

    TerminalParameters {
        host: device.hostname().to_string(),
        port: effective_port(Some(device.port()), protocol.into()),
        protocol,
        kind,
        username: device.username().to_string(),
        password: device.password().clone(),
        secret: device.password().clone(),
        timeouts,
        session_log: config
            .session_log_dir
            .as_ref()
            .map(|dir| dir.join(format!("session_{}.log", device.hostname()))),
        host_key_verification: config.host_key_verification.clone(),
        known_hosts: config.known_hosts.clone(),
    }
}

/// Derive WinRM parameters for an inline endpoint.
pub fn winrm(endpoint: &Endpoint, options: WinRmOptions, config: &GatewayConfig) -> WinRmParameters {
    WinRmParameters {
        host: endpoint.host.clone(),
        port: effective_port(endpoint.port, Protocol::WinRm(options.scheme)),
        scheme: options.scheme,
        auth: options.auth,
        verify_tls: options.verify_tls,
        username: endpoint.credentials.username.clone(),
        password: endpoint.credentials.password.clone(),
        timeouts: config.timeouts.winrm.clone(),
    }
}

/// Derive IPMI parameters for an inline endpoint.
pub fn ipmi(endpoint: &Endpoint, config: &GatewayConfig) -> IpmiParameters {
    IpmiParameters {
        host: endpoint.host.clone(),
        port: effective_port(endpoint.port, Protocol::Ipmi),
        username: endpoint.credentials.username.clone(),
        password: endpoint.credentials.password.clone(),
        timeouts: config.timeouts.ipmi.clone(),
    }
}
