//! Tool requests as they arrive from callers.
//!
//! Requests are JSON objects tagged by `tool`. Protocol and scheme names stay
//! strings until the gateway parses them, so a bad name comes back as a
//! tagged configuration error rather than a decode failure.
//!
//! ```json
//! {"tool": "send_command", "device": "core1", "command": "show version"}
//! {"tool": "send_command", "device": {"hostname": "10.0.0.1", "device_type": "cisco_ios",
//!  "username": "admin", "password": "pw"}, "command": "show clock", "protocol": "telnet"}
//! {"tool": "ipmi_raw", "hostname": "bmc1", "username": "admin", "password": "pw",
//!  "command": "{\"netfn\":6,\"command\":1}"}
//! ```

use log::debug;
use serde::Deserialize;

use super::{DeviceRef, Gateway};
use crate::error::{Error, Result};
use crate::params::{Credentials, Endpoint, TerminalProtocol, WinRmAuth, WinRmOptions, WinRmScheme};

/// A device given by inventory name or by inline credentials.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DeviceSpec {
    Name(String),
    Inline {
        hostname: String,
        device_type: String,
        username: String,
        password: String,
        #[serde(default)]
        port: Option<u16>,
    },
}

impl From<DeviceSpec> for DeviceRef {
    fn from(spec: DeviceSpec) -> Self {
        match spec {
            DeviceSpec::Name(name) => Self::Name(name),
            DeviceSpec::Inline {
                hostname,
                device_type,
                username,
                password,
                port,
            } => Self::inline(hostname, device_type, port, username, password),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolRequest {
    ListDevices,
    DescribeDevice {
        name: String,
    },
    SendCommand {
        device: DeviceSpec,
        command: String,
        #[serde(default = "default_protocol")]
        protocol: String,
    },
    SendConfigSet {
        device: DeviceSpec,
        commands: Vec<String>,
        #[serde(default = "default_protocol")]
        protocol: String,
    },
    WinrmCommand {
        hostname: String,
        username: String,
        password: String,
        #[serde(default)]
        port: Option<u16>,
        command: String,
        #[serde(default = "default_scheme")]
        scheme: String,
        #[serde(default = "default_transport")]
        transport: String,
        #[serde(default)]
        verify_tls: bool,
    },
    IpmiRaw {
        hostname: String,
        username: String,
        password: String,
        #[serde(default)]
        port: Option<u16>,
        /// JSON text of the raw command.
        command: String,
    },
}

fn default_protocol() -> String {
    "ssh".to_string()
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_transport() -> String {
    "basic".to_string()
}

impl ToolRequest {
    /// Decode one request line.
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line).map_err(|e| Error::configuration(format!("invalid request: {e}")))
    }

    /// Tool name, for logging.
    pub fn tool(&self) -> &'static str {
        match self {
            Self::ListDevices => "list_devices",
            Self::DescribeDevice { .. } => "describe_device",
            Self::SendCommand { .. } => "send_command",
            Self::SendConfigSet { .. } => "send_config_set",
            Self::WinrmCommand { .. } => "winrm_command",
            Self::IpmiRaw { .. } => "ipmi_raw",
        }
    }
}

impl Gateway {
    /// Serve one tool request. Failures come back as tagged strings.
    pub async fn handle(&self, request: ToolRequest) -> String {
        let tool = request.tool();
        match self.execute(request).await {
            Ok(output) => output,
            Err(e) => {
                debug!("{tool} failed: {e:?}");
                e.render()
            }
        }
    }

    /// Decode and serve one request line.
    pub async fn handle_line(&self, line: &str) -> String {
        match ToolRequest::parse(line) {
            Ok(request) => self.handle(request).await,
            Err(e) => e.render(),
        }
    }

    /// Serve one tool request, keeping the error typed.
    pub async fn execute(&self, request: ToolRequest) -> Result<String> {
        match request {
            ToolRequest::ListDevices => self.list_devices(),
            ToolRequest::DescribeDevice { name } => self.describe_device(&name),
            ToolRequest::SendCommand {
                device,
                command,
                protocol,
            } => {
                let protocol: TerminalProtocol = protocol.parse()?;
                self.send_command(&device.into(), &command, protocol).await
            }
            ToolRequest::SendConfigSet {
                device,
                commands,
                protocol,
            } => {
                let protocol: TerminalProtocol = protocol.parse()?;
                self.send_config_set(&device.into(), &commands, protocol)
                    .await
            }
            ToolRequest::WinrmCommand {
                hostname,
                username,
                password,
                port,
                command,
                scheme,
                transport,
                verify_tls,
            } => {
                let options = WinRmOptions {
                    scheme: scheme.parse::<WinRmScheme>()?,
                    auth: transport.parse::<WinRmAuth>()?,
                    verify_tls,
                };
                let endpoint = endpoint(hostname, port, username, password);
                self.winrm_command(&endpoint, &command, options).await
            }
            ToolRequest::IpmiRaw {
                hostname,
                username,
                password,
                port,
                command,
            } => {
                let endpoint = endpoint(hostname, port, username, password);
                self.ipmi_raw(&endpoint, &command).await
            }
        }
    }
}

fn endpoint(host: String, port: Option<u16>, username: String, password: String) -> Endpoint {
    Endpoint {
        host,
        port,
        credentials: Credentials::new(username, password),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_by_name_or_inline() {
        let request = ToolRequest::parse(
            r#"{"tool":"send_command","device":"core1","command":"show version"}"#,
        )
        .unwrap();
        match request {
            ToolRequest::SendCommand {
                device: DeviceSpec::Name(name),
                protocol,
                ..
            } => {
                assert_eq!(name, "core1");
                assert_eq!(protocol, "ssh");
            }
            other => panic!("unexpected request: {other:?}"),
        }

        let request = ToolRequest::parse(
            r#"{"tool":"send_config_set","device":{"hostname":"10.0.0.1","device_type":"cisco_ios","username":"u","password":"p","port":2222},"commands":["a","b"],"protocol":"telnet"}"#,
        )
        .unwrap();
        match request {
            ToolRequest::SendConfigSet {
                device: DeviceSpec::Inline { port, .. },
                commands,
                protocol,
            } => {
                assert_eq!(port, Some(2222));
                assert_eq!(commands, ["a", "b"]);
                assert_eq!(protocol, "telnet");
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn test_winrm_defaults() {
        let request = ToolRequest::parse(
            r#"{"tool":"winrm_command","hostname":"win01","username":"u","password":"p","command":"ipconfig"}"#,
        )
        .unwrap();
        match request {
            ToolRequest::WinrmCommand {
                scheme,
                transport,
                verify_tls,
                port,
                ..
            } => {
                assert_eq!(scheme, "http");
                assert_eq!(transport, "basic");
                assert!(!verify_tls);
                assert_eq!(port, None);
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_tool_is_configuration_error() {
        let err = ToolRequest::parse(r#"{"tool":"format_disk"}"#).unwrap_err();
        assert!(err.render().starts_with("Configuration Error: invalid request"));
    }
}
