//! Arista EOS platform definition.
//!
//! # Prompt Examples
//!
//! ```text
//! switch>                            # exec mode
//! switch#                            # privileged exec
//! switch(config)#                    # configuration mode
//! switch(config-if-Et1)#             # config sub-mode (interface)
//! ```

use crate::error::ChannelError;
use crate::platform::{EnableMode, InteractiveStep, PlatformDefinition};

pub const PLATFORM_NAME: &str = "arista_eos";

pub fn platform() -> Result<PlatformDefinition, ChannelError> {
    Ok(PlatformDefinition::new(PLATFORM_NAME)
        .with_prompt(r"(?m)^[\w.\-@()/: ]{1,63}[>#]")?
        .with_enable(EnableMode::new("enable", r"(?m)^[\w.\-@/: ]{1,63}>")?)
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Error")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid input")
        .with_failure_pattern("% Unavailable command")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 32767")
        .with_terminal_size(32767, 24)
        .with_config_mode("configure terminal", "end")
        .with_save(InteractiveStep::new("write memory")))
}
