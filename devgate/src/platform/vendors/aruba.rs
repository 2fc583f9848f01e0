//! Aruba OS (controller) platform definition.
//!
//! ```text
//! (aruba) >             # user mode
//! (aruba) #             # enable mode
//! (aruba) (config) #    # configuration mode
//! ```
//!
//! The controller CLI expects carriage-return line endings.

use crate::error::ChannelError;
use crate::platform::{EnableMode, InteractiveStep, PlatformDefinition};

pub const PLATFORM_NAME: &str = "aruba_os";

pub fn platform() -> Result<PlatformDefinition, ChannelError> {
    Ok(PlatformDefinition::new(PLATFORM_NAME)
        .with_prompt(r"(?m)^\([\w.\-@/: ]{1,63}\)\s?(?:\([\w\-]+\)\s?)?[>#]")?
        .with_enable(EnableMode::new("enable", r"(?m)^\([\w.\-@/: ]{1,63}\)\s?>")?)
        .with_on_open_command("no paging")
        .with_failure_pattern("% Invalid input")
        .with_failure_pattern("% Parse error")
        .with_config_mode("configure term", "end")
        .with_save(InteractiveStep::new("write memory"))
        .with_line_ending("\r"))
}
