//! Juniper JUNOS platform definition.
//!
//! # Prompt Examples
//!
//! ```text
//! user@router>              # operational mode
//! user@router#              # configuration mode
//! {master:0}                # routing-engine indicator (separate line)
//! user@router>
//! {master:0}[edit]          # config with routing-engine indicator
//! user@router#
//! ```
//!
//! Configuration is staged in a candidate and activated with `commit`.
//! There is no separate save step.

use std::sync::Arc;

use crate::error::ChannelError;
use crate::platform::{InteractiveStep, PlatformDefinition, VendorBehavior};

pub const PLATFORM_NAME: &str = "juniper_junos";

/// Operational (`>`) or configuration (`#`) prompt.
const PROMPT: &str = r"(?m)^(?:\{[^}]+\})?[\w.\-@()/:]{1,63}[>#]";

pub fn platform() -> Result<PlatformDefinition, ChannelError> {
    Ok(PlatformDefinition::new(PLATFORM_NAME)
        .with_prompt(PROMPT)?
        .with_failure_pattern("unknown command")
        .with_failure_pattern("syntax error")
        .with_failure_pattern("error:")
        .with_failure_pattern("missing argument")
        .with_failure_pattern("is ambiguous")
        .with_on_open_command("set cli screen-length 0")
        .with_on_open_command("set cli screen-width 511")
        .with_config_mode("configure", "exit configuration-mode")
        .with_config_exit(
            InteractiveStep::new("exit configuration-mode")
                .with_confirm(r"Exit with uncommitted changes\? \[yes,no\] \(yes\)", "yes")?,
        )
        .with_commit(InteractiveStep::new("commit").in_config_mode())
        .with_behavior(Arc::new(JuniperBehavior)))
}

/// Juniper JUNOS-specific behavior.
pub struct JuniperBehavior;

impl VendorBehavior for JuniperBehavior {
    fn post_process_output(&self, output: &str) -> String {
        // Config mode prints the [edit ...] context before every prompt.
        output
            .lines()
            .filter(|line| !line.trim().starts_with("[edit"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_juniper_platform() {
        let platform = platform().unwrap();
        assert_eq!(platform.name, "juniper_junos");
        let caps = platform.capabilities();
        assert!(caps.config_mode);
        assert!(caps.commit);
        assert!(!caps.save);
        assert!(platform.enable.is_none());
    }

    #[test]
    fn test_prompt_match() {
        let platform = platform().unwrap();
        assert!(platform.prompt.is_match(b"user@router> "));
        assert!(platform.prompt.is_match(b"admin@mx960#"));
        assert!(platform.prompt.is_match(b"{master:0}\nuser@router> "));
        assert!(platform.prompt.is_match(b"[edit]\nuser@router# "));
        assert!(platform.prompt.is_match(b"{master:0}user@router#"));
        assert!(!platform.prompt.is_match(b"user@router% "));
    }

    #[test]
    fn test_post_process_output() {
        let behavior = JuniperBehavior;

        let output = "Hostname: router\nModel: mx960";
        assert_eq!(behavior.post_process_output(output), output);

        let output = "ge-0/0/0\n[edit]\nge-0/0/1";
        assert_eq!(behavior.post_process_output(output), "ge-0/0/0\nge-0/0/1");

        let output = "ge-0/0/0\n[edit interfaces]";
        assert_eq!(behavior.post_process_output(output), "ge-0/0/0");
    }

    #[test]
    fn test_exit_discards_uncommitted_changes() {
        let exit = platform().unwrap().config_exit.unwrap();
        assert_eq!(exit.command, "exit configuration-mode");
        assert_eq!(exit.answer, "yes");
        assert!(
            exit.confirm
                .unwrap()
                .is_match(b"The configuration has been changed but not committed\nExit with uncommitted changes? [yes,no] (yes) ")
        );
    }

    #[test]
    fn test_on_open_commands() {
        let platform = platform().unwrap();
        assert_eq!(
            platform.on_open_commands,
            ["set cli screen-length 0", "set cli screen-width 511"]
        );
    }

    #[test]
    fn test_failed_when_contains() {
        let platform = platform().unwrap();
        assert_eq!(
            platform.detect_failure("syntax error, expecting <command>."),
            Some("syntax error".to_string())
        );
    }
}
