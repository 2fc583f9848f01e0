//! Gateway settings.
//!
//! Settings are resolved once at startup and then shared read-only. Sources,
//! lowest priority first:
//!
//! 1. Built-in defaults
//! 2. The TOML settings file, if one is given
//! 3. `DEVGATE_*` environment variables (`__` separates nested keys, e.g.
//!    `DEVGATE_TIMEOUTS__SSH__READ_SECS=90`)
//!
//! Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::inventory::ReloadPolicy;
use crate::safety::{DEFAULT_DESTRUCTIVE_PREFIXES, SafetyPolicy};
use crate::transport::HostKeyVerification;

/// Environment variable prefix for settings overrides.
pub const ENV_PREFIX: &str = "DEVGATE_";

/// Immutable settings shared by every gateway call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Enforce the destructive-command gate.
    pub secured: bool,

    /// Path of the inventory document.
    pub inventory: PathBuf,

    /// When the inventory document is re-read.
    pub reload: ReloadPolicy,

    /// Command prefixes rejected while `secured` is on.
    pub destructive_prefixes: Vec<String>,

    /// Directory for per-host terminal transcripts. Disabled when unset.
    pub session_log_dir: Option<PathBuf>,

    /// SSH host key checking mode.
    pub host_key_verification: HostKeyVerification,

    /// Alternate known_hosts file.
    pub known_hosts: Option<PathBuf>,

    /// Per-protocol timeouts and pacing.
    pub timeouts: TimeoutPolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            secured: false,
            inventory: PathBuf::from("devices.toml"),
            reload: ReloadPolicy::default(),
            destructive_prefixes: DEFAULT_DESTRUCTIVE_PREFIXES
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            session_log_dir: None,
            host_key_verification: HostKeyVerification::default(),
            known_hosts: None,
            timeouts: TimeoutPolicy::default(),
        }
    }
}

impl GatewayConfig {
    /// Resolve settings from defaults, an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigError::Settings(Box::new(e)))
    }

    /// The safety gate described by these settings.
    pub fn safety_policy(&self) -> SafetyPolicy {
        SafetyPolicy::new(self.secured, self.destructive_prefixes.iter().cloned())
    }
}

/// Timeouts and pacing for every protocol family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutPolicy {
    pub ssh: TerminalTimeouts,
    pub telnet: TerminalTimeouts,
    pub winrm: WinRmTimeouts,
    pub ipmi: IpmiTimeouts,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            ssh: TerminalTimeouts::default(),
            telnet: TerminalTimeouts {
                read_secs: 90,
                banner_secs: 30,
                ..TerminalTimeouts::default()
            },
            winrm: WinRmTimeouts::default(),
            ipmi: IpmiTimeouts::default(),
        }
    }
}

/// Terminal session (SSH/telnet) timeouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalTimeouts {
    /// TCP connect and handshake.
    pub connect_secs: u64,
    /// Wait for the prompt after sending a command.
    pub read_secs: u64,
    /// Wait for the banner / first prompt after login.
    pub banner_secs: u64,
    /// Idle time after which the session is dropped.
    pub session_secs: u64,
    /// Wait for each login prompt (telnet).
    pub blocking_secs: u64,
    /// Multiplier applied to the base pacing delay.
    pub delay_factor: u32,
    /// Skip pacing delays entirely.
    pub fast_cli: bool,
}

impl Default for TerminalTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            read_secs: 60,
            banner_secs: 20,
            session_secs: 60,
            blocking_secs: 20,
            delay_factor: 3,
            fast_cli: false,
        }
    }
}

/// Base delay scaled by `delay_factor` between paced writes.
const BASE_PACING: Duration = Duration::from_millis(100);

impl TerminalTimeouts {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }

    pub fn banner(&self) -> Duration {
        Duration::from_secs(self.banner_secs)
    }

    pub fn session(&self) -> Duration {
        Duration::from_secs(self.session_secs)
    }

    pub fn blocking(&self) -> Duration {
        Duration::from_secs(self.blocking_secs)
    }

    /// Delay inserted between configuration commands.
    pub fn pacing(&self) -> Duration {
        if self.fast_cli {
            Duration::ZERO
        } else {
            BASE_PACING * self.delay_factor
        }
    }
}

/// WinRM timeouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WinRmTimeouts {
    pub connect_secs: u64,
    /// Whole-request HTTP timeout; must exceed `operation_secs`.
    pub read_secs: u64,
    /// WS-Management OperationTimeout for each Receive poll.
    pub operation_secs: u64,
}

impl Default for WinRmTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            read_secs: 60,
            operation_secs: 20,
        }
    }
}

/// IPMI timeouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpmiTimeouts {
    /// Wait for each response datagram.
    pub response_secs: u64,
}

impl Default for IpmiTimeouts {
    fn default() -> Self {
        Self { response_secs: 5 }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_are_safe_for_slow_links() {
        let config = GatewayConfig::default();
        for terminal in [&config.timeouts.ssh, &config.timeouts.telnet] {
            assert!(terminal.connect() >= Duration::from_secs(3));
            assert!(terminal.read() >= Duration::from_secs(20));
        }
        assert!(config.timeouts.telnet.read() > config.timeouts.ssh.read());
        assert!(config.timeouts.winrm.read_secs > config.timeouts.winrm.operation_secs);
        assert!(!config.secured);
        assert_eq!(config.reload, ReloadPolicy::Always);
    }

    #[test]
    fn test_pacing() {
        let mut timeouts = TerminalTimeouts::default();
        assert_eq!(timeouts.pacing(), Duration::from_millis(300));
        timeouts.fast_cli = true;
        assert_eq!(timeouts.pacing(), Duration::ZERO);
    }

    #[test]
    fn test_load_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
secured = true
inventory = "/etc/devgate/devices.toml"
reload = "on_signal"
destructive_prefixes = ["clear", "reload"]

[timeouts.ssh]
read_secs = 120
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = GatewayConfig::load(Some(file.path())).unwrap();
        assert!(config.secured);
        assert_eq!(config.inventory, PathBuf::from("/etc/devgate/devices.toml"));
        assert_eq!(config.reload, ReloadPolicy::OnSignal);
        assert_eq!(config.destructive_prefixes, ["clear", "reload"]);
        assert_eq!(config.timeouts.ssh.read_secs, 120);
        assert_eq!(config.timeouts.ssh.connect_secs, 10);
        assert_eq!(config.timeouts.telnet.blocking_secs, 20);
    }

    #[test]
    fn test_safety_policy_from_settings() {
        let config = GatewayConfig {
            secured: true,
            destructive_prefixes: vec!["clear".to_string()],
            ..GatewayConfig::default()
        };
        let policy = config.safety_policy();
        assert!(!policy.check("clear counters").is_allowed());
        assert!(policy.check("show version").is_allowed());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "reload = \"sometimes\"").unwrap();
        file.flush().unwrap();
        let err = GatewayConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Settings(_)));
    }
}
