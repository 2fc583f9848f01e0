//! Terminal transport configuration.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::params::TerminalParameters;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys. Connection fails if the host
    /// is not already in known_hosts.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    /// This is the default and matches common SSH client behavior.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. For testing and lab use only.
    Disabled,
}

/// SSH connection configuration.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port.
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Password for authentication.
    pub password: SecretString,

    /// TCP connect plus handshake timeout.
    pub connect_timeout: Duration,

    /// Drop the session after this much inactivity.
    pub inactivity_timeout: Duration,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file.
    pub known_hosts_path: Option<PathBuf>,
}

impl SshConfig {
    pub fn from_params(params: &TerminalParameters, terminal_width: u32, terminal_height: u32) -> Self {
        Self {
            host: params.host.clone(),
            port: params.port,
            username: params.username.clone(),
            password: params.password.clone(),
            connect_timeout: params.timeouts.connect(),
            inactivity_timeout: params.timeouts.session().max(params.timeouts.read()),
            terminal_width,
            terminal_height,
            host_key_verification: params.host_key_verification.clone(),
            known_hosts_path: params.known_hosts.clone(),
        }
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Telnet connection configuration.
#[derive(Debug, Clone)]
pub struct TelnetConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub connect_timeout: Duration,
    /// Wait for each login prompt.
    pub login_timeout: Duration,
    /// Line terminator sent after each line.
    pub line_ending: &'static str,
}

impl TelnetConfig {
    pub fn from_params(params: &TerminalParameters, line_ending: &'static str) -> Self {
        Self {
            host: params.host.clone(),
            port: params.port,
            username: params.username.clone(),
            password: params.password.clone(),
            connect_timeout: params.timeouts.connect(),
            login_timeout: params.timeouts.blocking(),
            line_ending,
        }
    }
}
