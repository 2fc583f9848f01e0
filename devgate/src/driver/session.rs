//! Terminal session driver shared by every platform.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use secrecy::{ExposeSecret, SecretString};

use super::config_session::ConfigSession;
use super::response::Response;
use super::{StepOutcome, TerminalConnector};
use crate::channel::{TerminalChannel, any_of};
use crate::error::{ChannelError, Error, Result};
use crate::params::TerminalParameters;
use crate::platform::{
    DefaultBehavior, InteractiveStep, PlatformDefinition, PlatformRegistry, VendorBehavior,
};
use crate::transport::TerminalTransport;

/// An open, prompt-synchronized CLI session.
pub struct TerminalSession {
    channel: TerminalChannel,
    platform: PlatformDefinition,
    behavior: Arc<dyn VendorBehavior>,
    secret: SecretString,
    read_timeout: Duration,
    banner_timeout: Duration,
    pacing: Duration,
}

impl TerminalSession {
    /// Connect with `connector` and prepare the session for commands.
    pub async fn open(
        connector: &dyn TerminalConnector,
        params: &TerminalParameters,
    ) -> Result<Self> {
        let platform = PlatformRegistry::global().resolve(&params.kind);
        info!(
            "opening {} session to {}:{} ({})",
            params.protocol, params.host, params.port, platform.name
        );
        let transport = connector.connect(params, &platform).await?;
        Self::establish(transport, params, platform).await
    }

    /// Prepare an already connected transport.
    ///
    /// Waits for the first prompt, enters privileged mode when the platform
    /// has one and runs the platform's on-open commands.
    pub async fn establish(
        transport: Box<dyn TerminalTransport>,
        params: &TerminalParameters,
        platform: PlatformDefinition,
    ) -> Result<Self> {
        let mut channel = TerminalChannel::new(transport);
        if let Some(path) = &params.session_log {
            channel = channel.with_transcript(path);
        }

        let behavior = platform
            .behavior
            .clone()
            .unwrap_or_else(|| Arc::new(DefaultBehavior));

        let mut session = Self {
            channel,
            platform,
            behavior,
            secret: params.secret.clone(),
            read_timeout: params.timeouts.read(),
            banner_timeout: params.timeouts.banner(),
            pacing: params.timeouts.pacing(),
        };

        let prompt = session.find_prompt().await?;
        session.enable(&prompt).await?;

        for command in session.platform.on_open_commands.clone() {
            let response = session.send_command(&command).await?;
            if let Some(marker) = &response.failure_message {
                warn!("on-open command '{command}' reported '{marker}'");
            }
        }

        Ok(session)
    }

    pub fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    /// Delay between paced configuration writes.
    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    /// Send one command and wait for the prompt.
    pub async fn send_command(&mut self, command: &str) -> Result<Response> {
        let start = Instant::now();
        self.channel.send(command, self.platform.line_ending).await?;
        let data = self
            .channel
            .read_until(&self.platform.prompt, self.read_timeout)
            .await?;
        Ok(self.response(command, &data, start.elapsed()))
    }

    /// Enter configuration mode.
    pub async fn config_session(&mut self) -> Result<ConfigSession<'_>> {
        ConfigSession::enter(self).await
    }

    /// Run the platform's commit step outside a configuration session.
    pub async fn commit(&mut self) -> Result<StepOutcome> {
        match self.platform.commit.clone() {
            Some(step) => self.run_capability(&step).await,
            None => Ok(StepOutcome::Unsupported),
        }
    }

    /// Run the platform's save step.
    pub async fn save(&mut self) -> Result<StepOutcome> {
        match self.platform.save.clone() {
            Some(step) => self.run_capability(&step).await,
            None => Ok(StepOutcome::Unsupported),
        }
    }

    pub async fn close(self) -> Result<()> {
        debug!("closing {} session", self.platform.name);
        self.channel.close().await
    }

    /// Send a step command, answering its confirmation question if asked.
    pub(crate) async fn run_step(&mut self, step: &InteractiveStep) -> Result<Response> {
        let start = Instant::now();
        let line_ending = self.platform.line_ending;
        self.channel.send(&step.command, line_ending).await?;

        let data = match &step.confirm {
            None => {
                self.channel
                    .read_until(&self.platform.prompt, self.read_timeout)
                    .await?
            }
            Some(confirm) => {
                let either = any_of([confirm, &self.platform.prompt])?;
                let mut data = self.channel.read_until(&either, self.read_timeout).await?;
                if confirm.is_match(&data) {
                    debug!("answering confirmation for '{}'", step.command);
                    self.channel.send(&step.answer, line_ending).await?;
                    data.extend(
                        self.channel
                            .read_until(&self.platform.prompt, self.read_timeout)
                            .await?,
                    );
                }
                data
            }
        };

        Ok(self.response(&step.command, &data, start.elapsed()))
    }

    /// Commit or save, entering configuration mode around it when required.
    async fn run_capability(&mut self, step: &InteractiveStep) -> Result<StepOutcome> {
        if step.in_config_mode && self.platform.config_enter.is_some() {
            let config = self.config_session().await?;
            return config.run_step_and_exit(step).await;
        }
        Ok(self.run_step(step).await?.into_outcome())
    }

    async fn find_prompt(&mut self) -> Result<String> {
        let data = match self
            .channel
            .read_until(&self.platform.prompt, self.banner_timeout)
            .await
        {
            Ok(data) => data,
            Err(Error::Channel(ChannelError::PatternTimeout(_))) => {
                // Some devices print nothing until a key is pressed.
                debug!("no prompt after login, sending a bare line ending");
                self.channel.send("", self.platform.line_ending).await?;
                self.channel
                    .read_until(&self.platform.prompt, self.read_timeout)
                    .await?
            }
            Err(e) => return Err(e),
        };
        Ok(last_line(&data))
    }

    async fn enable(&mut self, prompt: &str) -> Result<()> {
        let Some(enable) = self.platform.enable.clone() else {
            return Ok(());
        };
        if !enable.unprivileged.is_match(prompt.as_bytes()) {
            return Ok(());
        }

        debug!("escalating with '{}'", enable.command);
        let line_ending = self.platform.line_ending;
        self.channel.send(&enable.command, line_ending).await?;
        let either = any_of([&enable.password_prompt, &self.platform.prompt])?;
        let mut data = self.channel.read_until(&either, self.read_timeout).await?;

        if enable.password_prompt.is_match(&data) {
            self.channel
                .send_hidden(self.secret.expose_secret(), line_ending)
                .await?;
            data = self
                .channel
                .read_until(&self.platform.prompt, self.read_timeout)
                .await?;
        }

        if enable.unprivileged.is_match(last_line(&data).as_bytes()) {
            return Err(Error::configuration(format!(
                "failed to enter privileged mode with '{}'",
                enable.command
            )));
        }
        Ok(())
    }

    fn response(&self, command: &str, data: &[u8], elapsed: Duration) -> Response {
        let raw = String::from_utf8_lossy(data).replace('\r', "");
        let normalized = self.behavior.normalize_output(&raw, command);
        let result = self.behavior.post_process_output(&normalized);
        let failure = self.platform.detect_failure(&result);

        let response = Response::new(command, result, raw, elapsed);
        match failure {
            Some(marker) => response.with_failure(marker),
            None => response,
        }
    }
}

fn last_line(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    text.trim_end()
        .rsplit(['\n', '\r'])
        .next()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::testing::ScriptedTransport;
    use crate::config::TerminalTimeouts;
    use crate::params::TerminalProtocol;
    use crate::platform::vendors::{cisco, juniper};
    use crate::transport::HostKeyVerification;

    fn params(kind: &str) -> TerminalParameters {
        TerminalParameters {
            host: "10.0.0.1".into(),
            port: 22,
            protocol: TerminalProtocol::Ssh,
            kind: kind.into(),
            username: "admin".into(),
            password: SecretString::from("pw".to_string()),
            secret: SecretString::from("en-secret".to_string()),
            timeouts: TerminalTimeouts {
                read_secs: 1,
                banner_secs: 1,
                fast_cli: true,
                ..TerminalTimeouts::default()
            },
            session_log: None,
            host_key_verification: HostKeyVerification::Disabled,
            known_hosts: None,
        }
    }

    #[tokio::test]
    async fn test_open_escalates_and_disables_paging() {
        let (transport, written) = ScriptedTransport::new(
            "Welcome\r\nrouter>",
            &[
                "enable\r\nPassword: ",
                "\r\nrouter#",
                "terminal length 0\r\nrouter#",
                "terminal width 511\r\nrouter#",
                "show clock\r\n12:00:00 UTC\r\nrouter#",
            ],
        );
        let mut session =
            TerminalSession::establish(Box::new(transport), &params("cisco_ios"), cisco::ios().unwrap())
                .await
                .unwrap();

        let response = session.send_command("show clock").await.unwrap();
        assert_eq!(response.result, "12:00:00 UTC");
        assert_eq!(response.prompt, "router#");
        session.close().await.unwrap();

        assert_eq!(
            written.lock().unwrap().as_slice(),
            [
                "enable\n",
                "en-secret\n",
                "terminal length 0\n",
                "terminal width 511\n",
                "show clock\n"
            ]
        );
    }

    #[tokio::test]
    async fn test_enable_failure() {
        let (transport, _) = ScriptedTransport::new(
            "router>",
            &["enable\r\nPassword: ", "\r\n% Access denied\r\n\r\nrouter>"],
        );
        let err = TerminalSession::establish(
            Box::new(transport),
            &params("cisco_ios"),
            cisco::ios().unwrap(),
        )
        .await
        .err()
        .unwrap();
        assert!(err.to_string().contains("privileged mode"));
    }

    #[tokio::test]
    async fn test_failure_marker_is_reported_not_raised() {
        let (transport, _) = ScriptedTransport::new(
            "user@r1> ",
            &[
                "set cli screen-length 0\r\nScreen length set to 0\r\nuser@r1> ",
                "set cli screen-width 511\r\nScreen width set to 511\r\nuser@r1> ",
                "show bogus\r\nsyntax error, expecting <command>.\r\nuser@r1> ",
            ],
        );
        let mut session = TerminalSession::establish(
            Box::new(transport),
            &params("juniper_junos"),
            juniper::platform().unwrap(),
        )
        .await
        .unwrap();

        let response = session.send_command("show bogus").await.unwrap();
        assert_eq!(response.failure_message.as_deref(), Some("syntax error"));
        assert_eq!(response.result, "syntax error, expecting <command>.");
    }

    #[tokio::test]
    async fn test_save_answers_confirmation() {
        let (transport, written) = ScriptedTransport::new(
            "router#",
            &[
                "terminal length 0\r\nrouter#",
                "terminal width 511\r\nrouter#",
                "write memory\r\nOverwrite the previous NVRAM configuration?[confirm]",
                "\r\nBuilding configuration...\r\n[OK]\r\nrouter#",
            ],
        );
        let mut session =
            TerminalSession::establish(Box::new(transport), &params("cisco_ios"), cisco::ios().unwrap())
                .await
                .unwrap();

        match session.save().await.unwrap() {
            StepOutcome::Success(output) => assert!(output.contains("[OK]")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(matches!(session.commit().await.unwrap(), StepOutcome::Unsupported));
        assert_eq!(written.lock().unwrap().last().unwrap(), "\n");
    }

    #[test]
    fn test_last_line() {
        assert_eq!(last_line(b"banner\r\nrouter> "), "router>");
        assert_eq!(last_line(b"router#"), "router#");
    }
}
