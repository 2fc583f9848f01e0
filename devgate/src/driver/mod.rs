//! Device drivers for interactive terminal sessions.
//!
//! A [`TerminalSession`] owns one connected channel plus the platform
//! definition for the device kind. It finds the first prompt, escalates
//! privileges and disables paging at open, then runs plain commands,
//! configuration sets and the optional commit / save steps.

pub mod config_session;
pub(crate) mod response;
mod session;

pub use config_session::{ConfigResult, ConfigSession};
pub use response::Response;
pub use session::TerminalSession;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::params::{TerminalParameters, TerminalProtocol};
use crate::platform::PlatformDefinition;
use crate::transport::{SshConfig, SshTransport, TelnetConfig, TelnetTransport, TerminalTransport};

/// Outcome of an optional device-side step (commit or save).
#[derive(Debug)]
pub enum StepOutcome {
    /// The step ran; its output.
    Success(String),
    /// The platform has no such step. Not an error.
    Unsupported,
    /// The step ran and the device reported a failure.
    Failed(Error),
}

impl StepOutcome {
    /// Output to append to a configuration transcript.
    ///
    /// `Unsupported` contributes nothing; `Failed` becomes the error.
    pub fn into_output(self) -> Result<Option<String>> {
        match self {
            Self::Success(output) => Ok(Some(output)),
            Self::Unsupported => Ok(None),
            Self::Failed(e) => Err(e),
        }
    }
}

/// Opens the byte transport for a terminal session.
#[async_trait]
pub trait TerminalConnector: Send + Sync {
    async fn connect(
        &self,
        params: &TerminalParameters,
        platform: &PlatformDefinition,
    ) -> Result<Box<dyn TerminalTransport>>;
}

/// Connects over the network with SSH or telnet.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkConnector;

#[async_trait]
impl TerminalConnector for NetworkConnector {
    async fn connect(
        &self,
        params: &TerminalParameters,
        platform: &PlatformDefinition,
    ) -> Result<Box<dyn TerminalTransport>> {
        match params.protocol {
            TerminalProtocol::Ssh => {
                let config =
                    SshConfig::from_params(params, platform.terminal_width, platform.terminal_height);
                Ok(Box::new(SshTransport::connect(config).await?))
            }
            TerminalProtocol::Telnet => {
                let config = TelnetConfig::from_params(params, platform.line_ending);
                Ok(Box::new(TelnetTransport::connect(config).await?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_outcome_output() {
        assert_eq!(
            StepOutcome::Success("ok".into()).into_output().unwrap(),
            Some("ok".to_string())
        );
        assert_eq!(StepOutcome::Unsupported.into_output().unwrap(), None);
        assert!(
            StepOutcome::Failed(Error::configuration("boom"))
                .into_output()
                .is_err()
        );
    }
}
