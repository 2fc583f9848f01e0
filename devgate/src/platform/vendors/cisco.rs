//! Cisco platform definitions.
//!
//! # Prompt Examples
//!
//! ```text
//! router>                         # IOS/XE user exec
//! router#                         # IOS/XE privileged exec
//! router(config-if)#              # IOS/XE/NX-OS config sub-mode
//! RP/0/RSP0/CPU0:router#          # IOS XR exec
//! RP/0/RSP0/CPU0:router(config)#  # IOS XR config
//! asa/pri/act#                    # ASA multi-context
//! ```
//!
//! IOS, XE, NX-OS and ASA apply configuration immediately and persist it
//! with a save step. IOS XR stages a candidate and needs `commit`, with no
//! separate save.

use crate::error::ChannelError;
use crate::platform::{EnableMode, InteractiveStep, PlatformDefinition};

pub const IOS: &str = "cisco_ios";
pub const XR: &str = "cisco_xr";
pub const NXOS: &str = "cisco_nxos";
pub const ASA: &str = "cisco_asa";

/// Any IOS-style prompt, including config sub-modes.
const PROMPT: &str = r"(?m)^[\w.\-@/:()]{1,63}[>#]";

/// User exec prompt; parentheses excluded so config modes never match.
const UNPRIVILEGED: &str = r"(?m)^[\w.\-@/:]{1,63}>";

const FAILURES: &[&str] = &[
    "% Invalid input",
    "% Incomplete command",
    "% Ambiguous command",
    "% Unknown command",
    "% Bad IP address",
];

fn ios_family(name: &str) -> Result<PlatformDefinition, ChannelError> {
    let mut platform = PlatformDefinition::new(name)
        .with_prompt(PROMPT)?
        .with_enable(EnableMode::new("enable", UNPRIVILEGED)?)
        .with_config_mode("configure terminal", "end");
    for failure in FAILURES {
        platform = platform.with_failure_pattern(*failure);
    }
    Ok(platform)
}

/// IOS and IOS XE.
pub fn ios() -> Result<PlatformDefinition, ChannelError> {
    Ok(ios_family(IOS)?
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 511")
        .with_save(InteractiveStep::new("write memory").with_confirm(r"\[confirm\]", "")?))
}

pub fn nxos() -> Result<PlatformDefinition, ChannelError> {
    Ok(ios_family(NXOS)?
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 511")
        .with_save(InteractiveStep::new("copy running-config startup-config")))
}

pub fn xr() -> Result<PlatformDefinition, ChannelError> {
    Ok(ios_family(XR)?
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 511")
        .with_failure_pattern("% Failed to commit")
        .with_config_exit(
            InteractiveStep::new("end")
                .with_confirm(r"\(yes/no/cancel\)\?\s*\[cancel\]:", "no")?,
        )
        .with_commit(InteractiveStep::new("commit").in_config_mode()))
}

pub fn asa() -> Result<PlatformDefinition, ChannelError> {
    Ok(ios_family(ASA)?
        .with_on_open_command("terminal pager 0")
        .with_failure_pattern("ERROR:")
        .with_save(InteractiveStep::new("write memory")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Capabilities;

    #[test]
    fn test_ios_prompts() {
        let platform = ios().unwrap();
        assert!(platform.prompt.is_match(b"router>"));
        assert!(platform.prompt.is_match(b"router#"));
        assert!(platform.prompt.is_match(b"show ip int brief\nrouter(config-if)# "));
        assert!(!platform.prompt.is_match(b"Building configuration..."));

        let enable = platform.enable.unwrap();
        assert!(enable.unprivileged.is_match(b"router>"));
        assert!(!enable.unprivileged.is_match(b"router#"));
        assert!(enable.password_prompt.is_match(b"Password: "));
    }

    #[test]
    fn test_ios_saves_without_commit() {
        let platform = ios().unwrap();
        assert_eq!(
            platform.capabilities(),
            Capabilities {
                config_mode: true,
                commit: false,
                save: true,
            }
        );
        let save = platform.save.unwrap();
        assert_eq!(save.command, "write memory");
        assert!(!save.in_config_mode);
    }

    #[test]
    fn test_xr_commits_without_save() {
        let platform = xr().unwrap();
        assert!(platform.prompt.is_match(b"RP/0/RSP0/CPU0:router(config)#"));
        let caps = platform.capabilities();
        assert!(caps.commit);
        assert!(!caps.save);
        assert!(platform.commit.unwrap().in_config_mode);
    }

    #[test]
    fn test_nxos_and_asa() {
        assert_eq!(
            nxos().unwrap().save.unwrap().command,
            "copy running-config startup-config"
        );
        let asa = asa().unwrap();
        assert_eq!(asa.on_open_commands, ["terminal pager 0"]);
        assert!(asa.prompt.is_match(b"asa/pri/act#"));
    }

    #[test]
    fn test_failure_markers() {
        let platform = ios().unwrap();
        assert!(
            platform
                .detect_failure("% Invalid input detected at '^' marker.")
                .is_some()
        );
    }
}
