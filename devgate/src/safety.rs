//! Destructive-command gate.
//!
//! A command is rejected when the gate is active and the command starts with
//! any configured prefix. Matching is case-sensitive and purely lexical, so it
//! only applies to free-form command strings (terminal sessions). Structured
//! requests such as raw IPMI triples are not inspected.

use serde::{Deserialize, Serialize};

/// Prefixes rejected by default.
///
/// `r` covers `reload`, `request`, `restart` and friends in one entry.
pub const DEFAULT_DESTRUCTIVE_PREFIXES: &[&str] = &[
    "r", "clear", "copy", "file", "write", "delete", "shut", "start", "power", "debug", "lock",
    "set",
];

/// Mode flag plus the ordered prefix list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyPolicy {
    /// Whether the gate is enforced.
    pub secured: bool,

    /// Commands starting with any of these are rejected.
    pub prefixes: Vec<String>,
}

/// Outcome of [`SafetyPolicy::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Rejected {
        /// The prefix that matched.
        prefix: String,
    },
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

impl SafetyPolicy {
    pub fn new(secured: bool, prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            secured,
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Gate with the default prefixes in the given mode.
    pub fn with_defaults(secured: bool) -> Self {
        Self::new(secured, DEFAULT_DESTRUCTIVE_PREFIXES.iter().copied())
    }

    /// Check one command against every prefix.
    pub fn check(&self, command: &str) -> Verdict {
        if !self.secured {
            return Verdict::Allowed;
        }

        self.prefixes
            .iter()
            .find(|prefix| command.starts_with(prefix.as_str()))
            .map_or(Verdict::Allowed, |prefix| Verdict::Rejected {
                prefix: prefix.clone(),
            })
    }
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self::with_defaults(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_gate() {
        let policy = SafetyPolicy::new(true, ["clear"]);
        assert_eq!(
            policy.check("clear counters"),
            Verdict::Rejected {
                prefix: "clear".to_string()
            }
        );
        assert!(policy.check("show version").is_allowed());
    }

    #[test]
    fn test_inactive_gate_allows_everything() {
        let policy = SafetyPolicy::new(false, ["clear"]);
        assert!(policy.check("clear counters").is_allowed());
        assert!(policy.check("show version").is_allowed());
    }

    #[test]
    fn test_case_sensitive() {
        let policy = SafetyPolicy::new(true, ["clear"]);
        assert!(policy.check("CLEAR counters").is_allowed());
    }

    #[test]
    fn test_prefix_not_substring() {
        let policy = SafetyPolicy::new(true, ["delete"]);
        assert!(policy.check("show log | match delete").is_allowed());
    }

    #[test]
    fn test_single_letter_prefix_default() {
        let policy = SafetyPolicy::with_defaults(true);
        assert!(!policy.check("reload in 5").is_allowed());
        assert!(!policy.check("request system reboot").is_allowed());
        assert!(!policy.check("set interfaces ge-0/0/0 disable").is_allowed());
        assert!(policy.check("show interfaces terse").is_allowed());
        assert!(policy.check("ping 10.0.0.1").is_allowed());
    }

    #[test]
    fn test_first_matching_prefix_reported() {
        let policy = SafetyPolicy::new(true, ["sh", "shut"]);
        assert_eq!(
            policy.check("shutdown"),
            Verdict::Rejected {
                prefix: "sh".to_string()
            }
        );
    }

    #[test]
    fn test_empty_prefix_list() {
        let policy = SafetyPolicy::new(true, Vec::<String>::new());
        assert!(policy.check("clear counters").is_allowed());
    }
}
