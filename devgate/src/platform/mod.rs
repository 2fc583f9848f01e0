//! Platform definitions for multi-vendor support.
//!
//! A platform describes one CLI family: its prompt, the commands that make the
//! session scriptable, how to enter configuration mode and whether the family
//! has a commit or save step. Device kinds map onto families through the
//! [`PlatformRegistry`].

mod definition;
mod registry;
pub mod vendors;

pub use definition::{Capabilities, EnableMode, InteractiveStep, PlatformDefinition};
pub use registry::PlatformRegistry;

/// Vendor hooks applied to command output.
pub trait VendorBehavior: Send + Sync {
    /// Strip the command echo and the trailing prompt.
    fn normalize_output(&self, raw: &str, command: &str) -> String {
        default_normalize(raw, command)
    }

    /// Vendor cleanup after normalization.
    fn post_process_output(&self, output: &str) -> String {
        output.to_string()
    }

    /// Vendor-specific failure detection beyond plain substrings.
    fn detect_failure(&self, _output: &str) -> Option<String> {
        None
    }
}

/// Behavior used when a platform has none of its own.
pub struct DefaultBehavior;

impl VendorBehavior for DefaultBehavior {}

/// Remove the echoed command from the front and the prompt line from the end.
pub fn default_normalize(raw: &str, command: &str) -> String {
    let raw = raw.replace("\r\n", "\n").replace('\r', "");
    let output = raw.trim_start_matches('\n');
    let output = output
        .strip_prefix(command.trim_end())
        .unwrap_or(output)
        .trim_start_matches([' ', '\n']);

    match output.rfind('\n') {
        Some(pos) => output[..pos].trim_end().to_string(),
        // Output was only the prompt.
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_normalize() {
        let raw = "show clock\r\n*12:00:01.123 UTC Mon Jan 1 2024\r\nrouter#";
        assert_eq!(
            default_normalize(raw, "show clock"),
            "*12:00:01.123 UTC Mon Jan 1 2024"
        );
    }

    #[test]
    fn test_default_normalize_prompt_only() {
        assert_eq!(default_normalize("terminal length 0\r\nrouter#", "terminal length 0"), "");
        assert_eq!(default_normalize("router#", "x"), "");
    }

    #[test]
    fn test_default_normalize_without_echo() {
        assert_eq!(default_normalize("line 1\nline 2\nhost$ ", "ls"), "line 1\nline 2");
    }

    #[test]
    fn test_default_behavior_passthrough() {
        let behavior = DefaultBehavior;
        assert_eq!(behavior.post_process_output("a\nb"), "a\nb");
        assert_eq!(behavior.detect_failure("anything"), None);
    }
}
