//! VyOS platform definition.
//!
//! ```text
//! vyos@vyos:~$         # operational mode
//! [edit]
//! vyos@vyos#           # configuration mode
//! ```
//!
//! Both `commit` and `save` are issued from configuration mode.

use crate::error::ChannelError;
use crate::platform::{InteractiveStep, PlatformDefinition};

pub const PLATFORM_NAME: &str = "vyos";

pub fn platform() -> Result<PlatformDefinition, ChannelError> {
    Ok(PlatformDefinition::new(PLATFORM_NAME)
        .with_prompt(r"(?m)^[\w.\-@()/:~]{1,63}[$#]")?
        .with_on_open_command("set terminal length 0")
        .with_failure_pattern("Invalid command")
        .with_failure_pattern("Commit failed")
        .with_config_mode("configure", "exit")
        .with_commit(InteractiveStep::new("commit").in_config_mode())
        .with_save(InteractiveStep::new("save").in_config_mode()))
}
