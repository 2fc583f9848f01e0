//! Result of one command sent to a terminal session.

use std::fmt;
use std::time::Duration;

use super::StepOutcome;
use crate::error::Error;

#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was sent.
    pub command: String,

    /// Output with the echo and trailing prompt removed.
    pub result: String,

    /// Everything read back, prompt included, with carriage returns dropped.
    pub raw_result: String,

    /// The prompt line the read stopped at.
    pub prompt: String,

    pub elapsed: Duration,

    /// Failure marker found in the output, if any.
    pub failure_message: Option<String>,
}

impl Response {
    pub fn new(
        command: impl Into<String>,
        result: impl Into<String>,
        raw_result: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        let raw_result = raw_result.into();
        let prompt = raw_result
            .rsplit('\n')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        Self {
            command: command.into(),
            result: result.into(),
            raw_result,
            prompt,
            elapsed,
            failure_message: None,
        }
    }

    pub fn with_failure(mut self, failure_message: impl Into<String>) -> Self {
        self.failure_message = Some(failure_message.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.failure_message.is_none()
    }

    /// Outcome of a commit or save step.
    pub fn into_outcome(self) -> StepOutcome {
        match self.failure_message {
            Some(marker) => StepOutcome::Failed(Error::configuration(format!(
                "'{}' failed: {}",
                self.command,
                failure_line(&self.raw_result, &marker)
            ))),
            None => StepOutcome::Success(self.raw_result),
        }
    }
}

/// The output line that carries `marker`, or the marker itself.
fn failure_line<'a>(output: &'a str, marker: &'a str) -> &'a str {
    output
        .lines()
        .find(|line| line.contains(marker))
        .map(str::trim)
        .unwrap_or(marker)
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_is_last_line() {
        let response = Response::new(
            "show clock",
            "12:00",
            "show clock\n12:00\nrouter# ",
            Duration::ZERO,
        );
        assert_eq!(response.prompt, "router#");
        assert!(response.is_success());
        assert_eq!(response.to_string(), "12:00");
    }

    #[test]
    fn test_failed_step_outcome() {
        let response = Response::new(
            "commit",
            "",
            "commit\nerror: configuration check-out failed\nuser@r1# ",
            Duration::ZERO,
        )
        .with_failure("error:");
        match response.into_outcome() {
            StepOutcome::Failed(e) => assert_eq!(
                e.to_string(),
                "'commit' failed: error: configuration check-out failed"
            ),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_successful_step_outcome_keeps_raw_output() {
        let response = Response::new(
            "write memory",
            "[OK]",
            "write memory\nBuilding configuration...\n[OK]\nrouter#",
            Duration::ZERO,
        );
        assert!(matches!(
            response.into_outcome(),
            StepOutcome::Success(out) if out.contains("[OK]")
        ));
    }
}
