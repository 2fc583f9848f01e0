//! The command gateway facade.
//!
//! Every request follows the same path: the safety gate checks free-form
//! commands, the device reference is resolved (inventory name or inline
//! credentials), connection parameters are derived, and exactly one session
//! is opened, used and released. Nothing is retried.
//!
//! The `Result`-returning methods are the library API. [`Gateway::handle`]
//! is the tool surface: it takes a [`ToolRequest`] and always answers with a
//! string, rendering failures with their tagged prefix.

mod request;

pub use request::{DeviceSpec, ToolRequest};

use std::sync::Arc;

use log::{debug, info, warn};
use secrecy::SecretString;
use serde::Serialize;

use crate::config::GatewayConfig;
use crate::driver::{NetworkConnector, TerminalConnector, TerminalSession};
use crate::error::{ConfigError, Error, Result};
use crate::inventory::{DEFAULT_PORT, DeviceDescriptor, DeviceSummary, InventoryStore, kinds};
use crate::ipmi::{self, BmcConnector, LanConnector, RawRequest};
use crate::params::{self, Credentials, Endpoint, TerminalParameters, TerminalProtocol, WinRmOptions};
use crate::safety::{SafetyPolicy, Verdict};
use crate::winrm::{self, HttpShellConnector, ShellConnector};

/// How a request names its target device.
#[derive(Debug, Clone)]
pub enum DeviceRef {
    /// An inventory entry.
    Name(String),
    /// A self-contained request carrying its own credentials.
    Inline(InlineDevice),
}

/// Device addressed without the inventory.
#[derive(Debug, Clone)]
pub struct InlineDevice {
    pub hostname: String,
    pub device_type: String,
    /// `None` selects the protocol default.
    pub port: Option<u16>,
    pub credentials: Credentials,
}

/// Listing of one device with its port.
#[derive(Debug, Clone, Serialize)]
struct DeviceDetail {
    #[serde(flatten)]
    summary: DeviceSummary,
    port: u16,
}

pub struct Gateway {
    config: Arc<GatewayConfig>,
    policy: SafetyPolicy,
    inventory: InventoryStore,
    terminal: Arc<dyn TerminalConnector>,
    shell: Arc<dyn ShellConnector>,
    bmc: Arc<dyn BmcConnector>,
}

impl Gateway {
    /// Gateway reaching devices over the network.
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_connectors(
            config,
            Arc::new(NetworkConnector),
            Arc::new(HttpShellConnector),
            Arc::new(LanConnector),
        )
    }

    /// Gateway with explicit transports.
    pub fn with_connectors(
        config: GatewayConfig,
        terminal: Arc<dyn TerminalConnector>,
        shell: Arc<dyn ShellConnector>,
        bmc: Arc<dyn BmcConnector>,
    ) -> Self {
        let policy = config.safety_policy();
        let inventory = InventoryStore::new(config.inventory.clone(), config.reload);
        Self {
            config: Arc::new(config),
            policy,
            inventory,
            terminal,
            shell,
            bmc,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }

    /// Load the inventory once, failing if it is unusable.
    ///
    /// Run at startup before serving; returns the number of devices.
    pub fn check_inventory(&self) -> Result<usize> {
        let inventory = self.inventory.reload()?;
        info!(
            "inventory {} ok ({} devices)",
            self.inventory.path().display(),
            inventory.len()
        );
        Ok(inventory.len())
    }

    /// Re-read the inventory document.
    ///
    /// Only meaningful with the `on_signal` policy; a failed reload keeps the
    /// previous inventory.
    pub fn reload(&self) -> Result<usize> {
        Ok(self.inventory.reload()?.len())
    }

    /// JSON array of every device, credentials omitted.
    pub fn list_devices(&self) -> Result<String> {
        let inventory = self.inventory.current()?;
        to_json(&inventory.summaries())
    }

    /// JSON object for one device.
    pub fn describe_device(&self, name: &str) -> Result<String> {
        let inventory = self.inventory.current()?;
        let device = inventory.get(name).ok_or_else(|| Error::UnknownDevice {
            name: name.to_string(),
        })?;
        to_json(&DeviceDetail {
            summary: device.summary(),
            port: device.port(),
        })
    }

    /// Run one read command and return its output.
    pub async fn send_command(
        &self,
        device: &DeviceRef,
        command: &str,
        protocol: TerminalProtocol,
    ) -> Result<String> {
        self.gate(device, command)?;
        let params = self.terminal_params(device, protocol)?;

        info!(
            "sending '{command}' to {}:{} via {} ({})",
            params.host, params.port, params.protocol, params.kind
        );
        let mut session = TerminalSession::open(self.terminal.as_ref(), &params).await?;
        let outcome = session.send_command(command).await.map(|r| r.result);
        let output = release(session, outcome).await?;
        info!("command on {} returned {} bytes", params.host, output.len());
        Ok(output)
    }

    /// Apply configuration commands in order, then commit and save.
    ///
    /// Commit and save are skipped when the platform has no such step. The
    /// output of configuration, commit and save is returned in that order.
    pub async fn send_config_set<S: AsRef<str>>(
        &self,
        device: &DeviceRef,
        commands: &[S],
        protocol: TerminalProtocol,
    ) -> Result<String> {
        for command in commands {
            self.gate(device, command.as_ref())?;
        }
        let params = self.terminal_params(device, protocol)?;

        info!(
            "applying {} config commands to {}:{} via {} ({})",
            commands.len(),
            params.host,
            params.port,
            params.protocol,
            params.kind
        );
        let mut session = TerminalSession::open(self.terminal.as_ref(), &params).await?;
        let outcome = configure(&mut session, commands).await;
        release(session, outcome).await
    }

    /// Run one command on a Windows host.
    ///
    /// A non-zero exit status returns standard error, otherwise standard
    /// output.
    pub async fn winrm_command(
        &self,
        endpoint: &Endpoint,
        command: &str,
        options: WinRmOptions,
    ) -> Result<String> {
        let params = params::winrm(endpoint, options, &self.config);
        info!("running winrm command on {}", params.endpoint_url());
        let output = winrm::execute(self.shell.as_ref(), &params, command).await?;
        debug!("winrm command exited with status {}", output.status);
        Ok(output.into_result())
    }

    /// Issue a raw BMC command given as JSON.
    pub async fn ipmi_raw(&self, endpoint: &Endpoint, payload: &str) -> Result<String> {
        let request = RawRequest::parse(payload)?;
        let params = params::ipmi(endpoint, &self.config);
        info!(
            "sending ipmi netfn {:#04x} cmd {:#04x} to {}:{}",
            request.netfn, request.command, params.host, params.port
        );
        let response = ipmi::execute(self.bmc.as_ref(), &params, &request).await?;
        Ok(response.render())
    }

    fn gate(&self, device: &DeviceRef, command: &str) -> Result<()> {
        match self.policy.check(command) {
            Verdict::Allowed => Ok(()),
            Verdict::Rejected { prefix } => {
                warn!(
                    "blocked destructive command for {}: '{command}' (prefix '{prefix}')",
                    device.label()
                );
                Err(Error::PolicyRejected {
                    command: command.to_string(),
                })
            }
        }
    }

    /// Look up or build the descriptor for `device`.
    ///
    /// Inline kinds are rewritten for telnet before validation, so aliases
    /// such as `h3c` resolve to a driver that exists.
    fn resolve(&self, device: &DeviceRef, protocol: TerminalProtocol) -> Result<DeviceDescriptor> {
        match device {
            DeviceRef::Name(name) => {
                let inventory = self.inventory.current()?;
                inventory.get(name).cloned().ok_or_else(|| Error::UnknownDevice {
                    name: name.clone(),
                })
            }
            DeviceRef::Inline(inline) => Ok(DeviceDescriptor::new(
                inline.hostname.clone(),
                inline.hostname.clone(),
                match protocol {
                    TerminalProtocol::Telnet => params::telnet_kind(&inline.device_type),
                    TerminalProtocol::Ssh => inline.device_type.clone(),
                },
                inline.credentials.username.clone(),
                inline.credentials.password.clone(),
                inline.port.unwrap_or(DEFAULT_PORT),
            )?),
        }
    }

    fn terminal_params(
        &self,
        device: &DeviceRef,
        protocol: TerminalProtocol,
    ) -> Result<TerminalParameters> {
        let descriptor = self.resolve(device, protocol)?;
        let params = params::terminal(&descriptor, protocol, &self.config);

        // Inventory kinds are rewritten here; the result must still be supported.
        if !kinds::is_supported(&params.kind) {
            return Err(ConfigError::InvalidKind {
                name: descriptor.name().to_string(),
                kind: params.kind,
            }
            .into());
        }
        Ok(params)
    }
}

impl DeviceRef {
    /// Inline reference with a plain password.
    pub fn inline(
        hostname: impl Into<String>,
        device_type: impl Into<String>,
        port: Option<u16>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::Inline(InlineDevice {
            hostname: hostname.into(),
            device_type: device_type.into(),
            port,
            credentials: Credentials {
                username: username.into(),
                password: SecretString::from(password.into()),
            },
        })
    }

    fn label(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Inline(inline) => &inline.hostname,
        }
    }
}

async fn configure<S: AsRef<str>>(session: &mut TerminalSession, commands: &[S]) -> Result<String> {
    let mut config = session.config_session().await?;
    config.send_commands(commands).await?;
    let result = config.commit().await?;

    let mut output = result.output;
    if let Some(commit) = result.commit.into_output()? {
        append(&mut output, &commit);
    } else {
        debug!("no commit step for {}", session.platform().name);
    }
    if let Some(save) = session.save().await?.into_output()? {
        append(&mut output, &save);
    } else {
        debug!("no save step for {}", session.platform().name);
    }
    Ok(output)
}

/// Close the session whatever the outcome.
///
/// A close failure is only logged: the outcome already says what happened.
async fn release<T>(session: TerminalSession, outcome: Result<T>) -> Result<T> {
    let platform = session.platform().name.clone();
    if let Err(e) = session.close().await {
        warn!("failed to close {platform} session: {e}");
    }
    outcome
}

fn append(output: &mut String, chunk: &str) {
    if !output.is_empty() && !output.ends_with('\n') {
        output.push('\n');
    }
    output.push_str(chunk);
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::configuration(format!("cannot encode listing: {e}")))
}
