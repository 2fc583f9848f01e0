//! WS-Management over HTTP(S) with Basic authentication.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};

use super::soap::{self, Header};
use super::{RemoteShell, ShellConnector, ShellOutput};
use crate::error::{Error, Result, TransportError};
use crate::params::{WinRmParameters, WinRmScheme};

const CONTENT_TYPE: &str = "application/soap+xml;charset=UTF-8";

/// Opens shells with a reqwest client per request.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpShellConnector;

#[async_trait]
impl ShellConnector for HttpShellConnector {
    async fn open(&self, params: &WinRmParameters) -> Result<Box<dyn RemoteShell>> {
        let shell = HttpShell::open(params).await?;
        Ok(Box::new(shell))
    }
}

/// A remote shell created on a WS-Management endpoint.
pub struct HttpShell {
    http: reqwest::Client,
    url: String,
    username: String,
    password: SecretString,
    operation_timeout: Duration,
    shell_id: String,
}

impl HttpShell {
    /// Create a shell on the endpoint described by `params`.
    pub async fn open(params: &WinRmParameters) -> Result<Self> {
        let http = build_client(params)?;
        let url = params.endpoint_url();
        info!("opening winrm shell on {url}");

        let mut shell = Self {
            http,
            url,
            username: params.username.clone(),
            password: params.password.clone(),
            operation_timeout: Duration::from_secs(params.timeouts.operation_secs),
            shell_id: String::new(),
        };

        let options = soap::create_options();
        let body = shell
            .post(soap::ACTION_CREATE, false, &options, soap::create_body())
            .await?;
        shell.shell_id = soap::shell_id(&body).ok_or_else(|| missing("ShellId"))?;
        debug!("winrm shell {} created", shell.shell_id);
        Ok(shell)
    }

    async fn post(
        &self,
        action: &str,
        with_shell: bool,
        options: &[(&str, String)],
        body: &str,
    ) -> Result<String> {
        let header = Header {
            to: &self.url,
            action,
            operation_timeout: self.operation_timeout,
            shell_id: with_shell.then_some(self.shell_id.as_str()),
            options,
        };
        let envelope = soap::envelope(&header, body);

        let response = self
            .http
            .post(&self.url)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .body(envelope)
            .send()
            .await
            .map_err(TransportError::Http)?;

        let status = response.status();
        let text = response.text().await.map_err(TransportError::Http)?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(TransportError::AuthenticationFailed {
                user: self.username.clone(),
            }
            .into());
        }
        if !status.is_success() {
            return Err(fault(status, &text));
        }
        Ok(text)
    }
}

#[async_trait]
impl RemoteShell for HttpShell {
    async fn start_command(&mut self, command: &str) -> Result<String> {
        let options = soap::command_options();
        let body = self
            .post(
                soap::ACTION_COMMAND,
                true,
                &options,
                &soap::command_body(command, &[]),
            )
            .await?;
        soap::command_id(&body).ok_or_else(|| missing("CommandId"))
    }

    async fn receive(&mut self, command_id: &str) -> Result<ShellOutput> {
        let body = soap::receive_body(command_id);
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        loop {
            let response = match self.post(soap::ACTION_RECEIVE, true, &[], &body).await {
                Ok(response) => response,
                Err(Error::Transport(TransportError::WinRmFault { message, .. }))
                    if soap::is_operation_timeout(&message) =>
                {
                    debug!("winrm receive poll expired, polling again");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let chunk = soap::parse_receive(&response).map_err(|e| {
                TransportError::WinRmFault {
                    status: StatusCode::OK.as_u16(),
                    message: format!("undecodable output stream: {e}"),
                }
            })?;
            stdout.extend(chunk.stdout);
            stderr.extend(chunk.stderr);

            if chunk.done {
                return Ok(ShellOutput {
                    stdout: String::from_utf8_lossy(&stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                    status: chunk.exit_code.unwrap_or_default(),
                });
            }
        }
    }

    async fn cleanup_command(&mut self, command_id: &str) -> Result<()> {
        self.post(soap::ACTION_SIGNAL, true, &[], &soap::signal_body(command_id))
            .await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.post(soap::ACTION_DELETE, true, &[], "").await?;
        debug!("winrm shell {} deleted", self.shell_id);
        Ok(())
    }
}

fn build_client(params: &WinRmParameters) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(params.timeouts.connect_secs))
        .timeout(Duration::from_secs(params.timeouts.read_secs))
        .user_agent(concat!("devgate/", env!("CARGO_PKG_VERSION")));

    if params.scheme == WinRmScheme::Https && !params.verify_tls {
        builder = builder.danger_accept_invalid_certs(true);
    }

    Ok(builder.build().map_err(TransportError::Http)?)
}

/// Turn a non-success response into a transport error.
///
/// The raw body is kept as the message when it carries no fault text, so
/// timeout detection still sees the fault code.
fn fault(status: StatusCode, body: &str) -> Error {
    let message = match soap::fault_message(body) {
        Some(text) if soap::is_operation_timeout(body) => format!("{text} (w:TimedOut)"),
        Some(text) => text,
        None if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string(),
        None => body.trim().to_string(),
    };
    TransportError::WinRmFault {
        status: status.as_u16(),
        message,
    }
    .into()
}

fn missing(element: &str) -> Error {
    TransportError::WinRmFault {
        status: StatusCode::OK.as_u16(),
        message: format!("response carried no {element}"),
    }
    .into()
}
