//! Error types for devgate.
//!
//! Errors are layered the same way the transports are: [`TransportError`] for
//! anything that fails while reaching or talking to a device, [`ChannelError`]
//! for the interactive terminal read loop, and [`ConfigError`] for the
//! inventory and settings documents. The top-level [`Error`] carries the
//! caller-facing taxonomy and [`Error::render`] turns it into the tagged
//! string handed back to the caller.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for gateway operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Inventory or settings could not be loaded
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A name-based request referenced a device missing from the inventory
    #[error("no device named '{name}'")]
    UnknownDevice { name: String },

    /// The safety gate blocked the command before dispatch
    #[error("destructive command '{command}' is prohibited.")]
    PolicyRejected { command: String },

    /// Transport-level failure (connect, authenticate, lost session)
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Interactive channel failure (prompt never seen, channel closed)
    #[error("{0}")]
    Channel(#[from] ChannelError),

    /// Caller-supplied parameters are structurally invalid
    #[error("{message}")]
    Configuration { message: String },

    /// A structured command payload could not be parsed
    #[error("command is not a valid JSON string.")]
    MalformedCommand {
        #[source]
        source: serde_json::Error,
    },
}

/// Failure classes visible to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Config,
    UnknownDevice,
    PolicyRejected,
    Connectivity,
    Configuration,
    MalformedCommand,
}

impl ErrorClass {
    /// Stable prefix used when rendering errors of this class.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Connectivity => "Connection Error:",
            Self::Config | Self::Configuration => "Configuration Error:",
            Self::UnknownDevice | Self::PolicyRejected | Self::MalformedCommand => "Error:",
        }
    }
}

impl Error {
    /// Build a [`Error::Configuration`] from any message.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Classify this error into the caller-facing taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Config(_) => ErrorClass::Config,
            Self::UnknownDevice { .. } => ErrorClass::UnknownDevice,
            Self::PolicyRejected { .. } => ErrorClass::PolicyRejected,
            Self::Transport(_) | Self::Channel(_) => ErrorClass::Connectivity,
            Self::Configuration { .. } => ErrorClass::Configuration,
            Self::MalformedCommand { .. } => ErrorClass::MalformedCommand,
        }
    }

    /// Render the error as the tagged string returned to the caller.
    pub fn render(&self) -> String {
        format!("{} {}", self.class().tag(), self)
    }
}

/// Transport layer errors (TCP/UDP/HTTP connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host key changed since it was recorded
    #[error("host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Host key unknown and strict verification is on
    #[error("host key for {host}:{port} is not in known_hosts")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Telnet login did not complete
    #[error("telnet login failed: {0}")]
    TelnetLogin(String),

    /// WinRM HTTP exchange failed
    #[error("WinRM request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// WinRM endpoint answered with a fault or unexpected status
    #[error("WinRM fault (HTTP {status}): {message}")]
    WinRmFault { status: u16, message: String },

    /// IPMI session or framing failure
    #[error("IPMI error: {0}")]
    Ipmi(String),

    /// Connection was closed unexpectedly
    #[error("connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (prompt matching on an interactive session).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Failed to open PTY channel
    #[error("failed to open PTY channel")]
    PtyOpenFailed,

    /// Prompt matching timed out
    #[error("pattern not found within {0:?}")]
    PatternTimeout(Duration),

    /// Channel closed unexpectedly
    #[error("channel closed")]
    Closed,

    /// Invalid regex pattern
    #[error("invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Inventory and settings errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Inventory file could not be read
    #[error("cannot read inventory '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Inventory file is not valid TOML
    #[error("cannot parse inventory '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A top-level entry is not a table
    #[error("entry '{name}' is not a table")]
    NotATable { name: String },

    /// An entry carries a field that is not recognized or has the wrong type
    #[error("entry '{name}': {message}")]
    InvalidEntry { name: String, message: String },

    /// An entry's device kind is not supported
    #[error("name:{name}, invalid device_type: '{kind}'")]
    InvalidKind { name: String, kind: String },

    /// Settings could not be extracted
    #[error("invalid settings: {0}")]
    Settings(#[from] Box<figment::Error>),
}

/// Result type alias using devgate's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_tags() {
        let err = Error::UnknownDevice {
            name: "core1".to_string(),
        };
        assert_eq!(err.render(), "Error: no device named 'core1'");

        let err = Error::PolicyRejected {
            command: "clear counters".to_string(),
        };
        assert_eq!(
            err.render(),
            "Error: destructive command 'clear counters' is prohibited."
        );

        let err = Error::configuration("unsupported protocol 'ftp'");
        assert_eq!(
            err.render(),
            "Configuration Error: unsupported protocol 'ftp'"
        );

        let err: Error = TransportError::Disconnected.into();
        assert_eq!(err.render(), "Connection Error: connection disconnected");
    }

    #[test]
    fn test_malformed_command_is_fixed_string() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = Error::MalformedCommand { source };
        assert_eq!(err.render(), "Error: command is not a valid JSON string.");
    }

    #[test]
    fn test_channel_errors_are_connectivity() {
        let err: Error = ChannelError::Closed.into();
        assert_eq!(err.class(), ErrorClass::Connectivity);
    }

    #[test]
    fn test_config_error_class() {
        let err: Error = ConfigError::InvalidKind {
            name: "r1".to_string(),
            kind: "bogus".to_string(),
        }
        .into();
        assert_eq!(err.class(), ErrorClass::Config);
        assert_eq!(
            err.render(),
            "Configuration Error: name:r1, invalid device_type: 'bogus'"
        );
    }
}
