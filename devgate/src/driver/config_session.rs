//! Configuration mode as an RAII guard.
//!
//! The guard holds `&mut TerminalSession`, so nothing else can talk to the
//! device while configuration mode is open. `commit()` and `exit()` consume
//! the guard and always leave configuration mode; dropping it without either
//! leaves the device in configuration mode and logs a warning.

use std::time::Duration;

use log::warn;

use super::StepOutcome;
use super::response::Response;
use super::session::TerminalSession;
use crate::error::Result;
use crate::platform::InteractiveStep;

/// What a finished configuration session produced.
#[derive(Debug)]
pub struct ConfigResult {
    /// Device output for entering, every command and leaving, in order.
    pub output: String,
    /// Commit step outcome.
    pub commit: StepOutcome,
}

pub struct ConfigSession<'a> {
    session: &'a mut TerminalSession,
    output: String,
    sent: usize,
    consumed: bool,
}

impl<'a> ConfigSession<'a> {
    pub(crate) async fn enter(session: &'a mut TerminalSession) -> Result<Self> {
        let mut output = String::new();
        if let Some(enter) = session.platform().config_enter.clone() {
            let response = session.send_command(&enter).await?;
            append(&mut output, &response.raw_result);
        }
        Ok(Self {
            session,
            output,
            sent: 0,
            consumed: false,
        })
    }

    /// Send one configuration command.
    ///
    /// Commands after the first are paced by the session's delay. A failure
    /// marker in the output is logged; the caller decides what it means.
    pub async fn send_command(&mut self, command: &str) -> Result<Response> {
        let pacing = self.session.pacing();
        if self.sent > 0 && pacing > Duration::ZERO {
            tokio::time::sleep(pacing).await;
        }

        let response = self.session.send_command(command).await?;
        self.sent += 1;
        if let Some(marker) = &response.failure_message {
            warn!("config command '{command}' reported '{marker}'");
        }
        append(&mut self.output, &response.raw_result);
        Ok(response)
    }

    /// Send every command in order, stopping at the first transport error.
    pub async fn send_commands<S: AsRef<str>>(&mut self, commands: &[S]) -> Result<()> {
        for command in commands {
            self.send_command(command.as_ref()).await?;
        }
        Ok(())
    }

    /// Output collected so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Commit when the platform supports it, then leave configuration mode.
    pub async fn commit(mut self) -> Result<ConfigResult> {
        self.consumed = true;

        let commit = match self.session.platform().commit.clone() {
            Some(step) if step.in_config_mode => {
                let outcome = self.session.run_step(&step).await?.into_outcome();
                self.leave().await?;
                outcome
            }
            Some(step) => {
                self.leave().await?;
                self.session.run_step(&step).await?.into_outcome()
            }
            None => {
                self.leave().await?;
                StepOutcome::Unsupported
            }
        };

        Ok(ConfigResult {
            output: std::mem::take(&mut self.output),
            commit,
        })
    }

    /// Leave configuration mode without committing.
    pub async fn exit(mut self) -> Result<String> {
        self.consumed = true;
        self.leave().await?;
        Ok(std::mem::take(&mut self.output))
    }

    /// Run a single step inside configuration mode, then leave.
    pub(crate) async fn run_step_and_exit(mut self, step: &InteractiveStep) -> Result<StepOutcome> {
        self.consumed = true;
        let response = self.session.run_step(step).await?;
        self.leave().await?;
        Ok(response.into_outcome())
    }

    async fn leave(&mut self) -> Result<()> {
        if let Some(exit) = self.session.platform().config_exit.clone() {
            let response = self.session.run_step(&exit).await?;
            append(&mut self.output, &response.raw_result);
        }
        Ok(())
    }
}

impl Drop for ConfigSession<'_> {
    fn drop(&mut self) {
        if !self.consumed {
            warn!("ConfigSession dropped without commit or exit; device left in config mode");
        }
    }
}

fn append(output: &mut String, chunk: &str) {
    if !output.is_empty() && !output.ends_with('\n') {
        output.push('\n');
    }
    output.push_str(chunk);
}
