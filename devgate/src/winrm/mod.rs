//! Windows remote shell over WS-Management.
//!
//! A command runs inside a remote shell that must be released afterwards,
//! and the command itself holds a handle that must be signalled before the
//! shell goes away. [`execute`] owns that sequence: once a handle exists it
//! is released on every path, including failures part way through.

mod client;
pub mod soap;

pub use client::{HttpShell, HttpShellConnector};

use async_trait::async_trait;
use log::{debug, warn};

use crate::error::Result;
use crate::params::WinRmParameters;

/// Collected output of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: i64,
}

impl ShellOutput {
    /// Standard error for a non-zero status, standard output otherwise.
    pub fn into_result(self) -> String {
        if self.status != 0 { self.stderr } else { self.stdout }
    }
}

/// An open remote shell.
#[async_trait]
pub trait RemoteShell: Send {
    /// Start `command` and return its handle.
    async fn start_command(&mut self, command: &str) -> Result<String>;

    /// Poll until the command finishes.
    async fn receive(&mut self, command_id: &str) -> Result<ShellOutput>;

    /// Release the command handle.
    async fn cleanup_command(&mut self, command_id: &str) -> Result<()>;

    /// Release the shell.
    async fn close(&mut self) -> Result<()>;
}

/// Opens remote shells.
#[async_trait]
pub trait ShellConnector: Send + Sync {
    async fn open(&self, params: &WinRmParameters) -> Result<Box<dyn RemoteShell>>;
}

/// Run one command in a fresh shell and release everything afterwards.
///
/// A release failure is logged when an earlier step already failed, and
/// returned otherwise.
pub async fn execute(
    connector: &dyn ShellConnector,
    params: &WinRmParameters,
    command: &str,
) -> Result<ShellOutput> {
    let mut shell = connector.open(params).await?;
    let outcome = run_in_shell(shell.as_mut(), command).await;
    let closed = shell.close().await;
    finish(outcome, closed, "shell")
}

async fn run_in_shell(shell: &mut dyn RemoteShell, command: &str) -> Result<ShellOutput> {
    let command_id = shell.start_command(command).await?;
    debug!("winrm command {command_id} started");
    let outcome = shell.receive(&command_id).await;
    let cleaned = shell.cleanup_command(&command_id).await;
    finish(outcome, cleaned, "command")
}

fn finish<T>(outcome: Result<T>, release: Result<()>, what: &str) -> Result<T> {
    match (outcome, release) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(release_err)) => {
            warn!("failed to release winrm {what}: {release_err}");
            Err(e)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MockShellConnector;
    use super::*;
    use crate::config::GatewayConfig;
    use crate::params::{self, Credentials, Endpoint, WinRmOptions};

    fn params() -> WinRmParameters {
        let endpoint = Endpoint {
            host: "win01".to_string(),
            port: None,
            credentials: Credentials::new("Administrator", "pw"),
        };
        params::winrm(&endpoint, WinRmOptions::default(), &GatewayConfig::default())
    }

    #[test]
    fn test_status_selects_stream() {
        let ok = ShellOutput {
            stdout: "out".into(),
            stderr: "err".into(),
            status: 0,
        };
        assert_eq!(ok.into_result(), "out");

        let failed = ShellOutput {
            stdout: "out".into(),
            stderr: "err".into(),
            status: 1,
        };
        assert_eq!(failed.into_result(), "err");
    }

    #[tokio::test]
    async fn test_execute_releases_handles() {
        let connector = MockShellConnector {
            output: ShellOutput {
                stdout: "Windows IP Configuration".into(),
                stderr: String::new(),
                status: 0,
            },
            ..MockShellConnector::default()
        };
        let output = execute(&connector, &params(), "ipconfig").await.unwrap();
        assert_eq!(output.into_result(), "Windows IP Configuration");
        assert_eq!(
            connector.calls.lock().unwrap().as_slice(),
            [
                "open http://win01:5985/wsman",
                "start ipconfig",
                "receive cmd-1",
                "cleanup cmd-1",
                "close"
            ]
        );
    }

    #[tokio::test]
    async fn test_execute_releases_handles_on_failure() {
        let connector = MockShellConnector {
            fail_receive: true,
            ..MockShellConnector::default()
        };
        let err = execute(&connector, &params(), "ipconfig").await.unwrap_err();
        assert!(err.render().starts_with("Connection Error:"));
        let calls = connector.calls.lock().unwrap();
        assert_eq!(calls[calls.len() - 2..], ["cleanup cmd-1", "close"]);
    }
}
