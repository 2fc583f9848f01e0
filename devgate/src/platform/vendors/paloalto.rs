//! Palo Alto PAN-OS platform definition.
//!
//! ```text
//! admin@fw01>          # operational mode
//! admin@fw01#          # configuration mode
//! admin@fw01(active)>  # HA member
//! ```

use crate::error::ChannelError;
use crate::platform::{InteractiveStep, PlatformDefinition};

pub const PLATFORM_NAME: &str = "paloalto_panos";

pub fn platform() -> Result<PlatformDefinition, ChannelError> {
    Ok(PlatformDefinition::new(PLATFORM_NAME)
        .with_prompt(r"(?m)^[\w.\-@()/:]{1,63}[>#]")?
        .with_on_open_command("set cli pager off")
        .with_failure_pattern("Invalid syntax")
        .with_failure_pattern("Unknown command")
        .with_failure_pattern("Commit failed")
        .with_config_mode("configure", "exit")
        .with_commit(InteractiveStep::new("commit").in_config_mode()))
}
