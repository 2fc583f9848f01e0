//! Platform definition for vendor-specific CLI handling.

use std::fmt;
use std::sync::Arc;

use regex::bytes::Regex;
use serde::Serialize;

use super::VendorBehavior;
use crate::channel::{GENERIC_PROMPT, compile_prompt_pattern};
use crate::error::ChannelError;

/// A command that may stop at a confirmation question.
///
/// `write memory` on some images and `save` on Huawei ask before acting; the
/// driver answers when `confirm` matches instead of the normal prompt.
#[derive(Debug, Clone)]
pub struct InteractiveStep {
    pub command: String,
    pub confirm: Option<Regex>,
    pub answer: String,
    /// Must be issued from configuration mode.
    pub in_config_mode: bool,
}

impl InteractiveStep {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            confirm: None,
            answer: String::new(),
            in_config_mode: false,
        }
    }

    pub fn in_config_mode(mut self) -> Self {
        self.in_config_mode = true;
        self
    }

    /// Answer `answer` when the output ends in `pattern`.
    pub fn with_confirm(
        mut self,
        pattern: &str,
        answer: impl Into<String>,
    ) -> Result<Self, ChannelError> {
        self.confirm = Some(compile_prompt_pattern(pattern)?);
        self.answer = answer.into();
        Ok(self)
    }
}

/// How to leave an unprivileged prompt.
#[derive(Debug, Clone)]
pub struct EnableMode {
    /// Command that requests privileges.
    pub command: String,
    /// Prompt that means privileges are still missing.
    pub unprivileged: Regex,
    /// Password question answered with the device secret.
    pub password_prompt: Regex,
}

impl EnableMode {
    pub fn new(command: impl Into<String>, unprivileged: &str) -> Result<Self, ChannelError> {
        Ok(Self {
            command: command.into(),
            unprivileged: compile_prompt_pattern(unprivileged)?,
            password_prompt: compile_prompt_pattern(r"(?i)password:")?,
        })
    }
}

/// What a platform can do beyond plain commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub config_mode: bool,
    pub commit: bool,
    pub save: bool,
}

/// Everything the driver needs to know about one CLI family.
#[derive(Clone)]
pub struct PlatformDefinition {
    /// Family name (e.g. "cisco_ios", "juniper_junos").
    pub name: String,

    /// Matches the prompt in every mode the driver visits.
    pub prompt: Regex,

    /// Privilege escalation run at open when the prompt is unprivileged.
    pub enable: Option<EnableMode>,

    /// Commands run right after login (paging, width).
    pub on_open_commands: Vec<String>,

    /// Output substrings that mark a command as failed.
    pub failed_when_contains: Vec<String>,

    /// Enters configuration mode.
    pub config_enter: Option<String>,

    /// Leaves configuration mode. Some families ask about uncommitted
    /// changes on the way out.
    pub config_exit: Option<InteractiveStep>,

    /// Activates a candidate configuration.
    pub commit: Option<InteractiveStep>,

    /// Persists the running configuration.
    pub save: Option<InteractiveStep>,

    /// Sent after every command.
    pub line_ending: &'static str,

    pub terminal_width: u32,
    pub terminal_height: u32,

    pub behavior: Option<Arc<dyn VendorBehavior>>,
}

impl PlatformDefinition {
    /// Definition with the generic prompt and no optional capabilities.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: generic_prompt(),
            enable: None,
            on_open_commands: vec![],
            failed_when_contains: vec![],
            config_enter: None,
            config_exit: None,
            commit: None,
            save: None,
            line_ending: "\n",
            terminal_width: 511,
            terminal_height: 24,
            behavior: None,
        }
    }

    pub fn with_prompt(mut self, pattern: &str) -> Result<Self, ChannelError> {
        self.prompt = compile_prompt_pattern(pattern)?;
        Ok(self)
    }

    pub fn with_enable(mut self, enable: EnableMode) -> Self {
        self.enable = Some(enable);
        self
    }

    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    pub fn with_config_mode(mut self, enter: impl Into<String>, exit: impl Into<String>) -> Self {
        self.config_enter = Some(enter.into());
        self.config_exit = Some(InteractiveStep::new(exit));
        self
    }

    /// Replace the exit step, e.g. to answer an uncommitted-changes question.
    pub fn with_config_exit(mut self, step: InteractiveStep) -> Self {
        self.config_exit = Some(step);
        self
    }

    pub fn with_commit(mut self, step: InteractiveStep) -> Self {
        self.commit = Some(step);
        self
    }

    pub fn with_save(mut self, step: InteractiveStep) -> Self {
        self.save = Some(step);
        self
    }

    pub fn with_line_ending(mut self, line_ending: &'static str) -> Self {
        self.line_ending = line_ending;
        self
    }

    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    pub fn with_behavior(mut self, behavior: Arc<dyn VendorBehavior>) -> Self {
        self.behavior = Some(behavior);
        self
    }

    /// Which optional operations this family supports.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            config_mode: self.config_enter.is_some(),
            commit: self.commit.is_some(),
            save: self.save.is_some(),
        }
    }

    /// First failure marker found in `output`.
    pub fn detect_failure(&self, output: &str) -> Option<String> {
        if let Some(message) = self
            .behavior
            .as_ref()
            .and_then(|behavior| behavior.detect_failure(output))
        {
            return Some(message);
        }
        self.failed_when_contains
            .iter()
            .find(|marker| output.contains(marker.as_str()))
            .cloned()
    }
}

fn generic_prompt() -> Regex {
    Regex::new(GENERIC_PROMPT).expect("generic prompt pattern is valid")
}

impl fmt::Debug for PlatformDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformDefinition")
            .field("name", &self.name)
            .field("prompt", &self.prompt.as_str())
            .field("enable", &self.enable.as_ref().map(|e| &e.command))
            .field("on_open_commands", &self.on_open_commands)
            .field("failed_when_contains", &self.failed_when_contains)
            .field("capabilities", &self.capabilities())
            .field("line_ending", &self.line_ending)
            .field(
                "behavior",
                &self.behavior.as_ref().map(|_| "<VendorBehavior>"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_definition_has_no_capabilities() {
        let platform = PlatformDefinition::new("generic");
        assert_eq!(platform.capabilities(), Capabilities::default());
        assert!(platform.prompt.is_match(b"host> "));
        assert_eq!(platform.line_ending, "\n");
    }

    #[test]
    fn test_capabilities_follow_builder() {
        let platform = PlatformDefinition::new("x")
            .with_config_mode("configure", "exit")
            .with_commit(InteractiveStep::new("commit"));
        assert_eq!(
            platform.capabilities(),
            Capabilities {
                config_mode: true,
                commit: true,
                save: false,
            }
        );
    }

    #[test]
    fn test_detect_failure() {
        let platform = PlatformDefinition::new("x").with_failure_pattern("% Invalid input");
        assert_eq!(
            platform.detect_failure("  ^\n% Invalid input detected at '^' marker."),
            Some("% Invalid input".to_string())
        );
        assert_eq!(platform.detect_failure("Cisco IOS Software"), None);
    }

    #[test]
    fn test_confirm_step() {
        let step = InteractiveStep::new("save")
            .with_confirm(r"\[Y/N\]:", "y")
            .unwrap();
        let confirm = step.confirm.unwrap();
        assert!(confirm.is_match(b"Are you sure to continue?[Y/N]:"));
        assert_eq!(step.answer, "y");
    }
}
