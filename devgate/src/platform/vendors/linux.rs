//! Linux platform definition.
//!
//! Standard shells with `$` (user) and `#` (root) prompts. No configuration
//! mode, commit or save.

use crate::error::ChannelError;
use crate::platform::PlatformDefinition;

pub const PLATFORM_NAME: &str = "linux";

pub fn platform() -> Result<PlatformDefinition, ChannelError> {
    Ok(PlatformDefinition::new(PLATFORM_NAME)
        .with_prompt(r"[$#]")?
        .with_on_open_command("export PS2='' TERM=dumb")
        .with_failure_pattern("command not found")
        .with_failure_pattern("No such file or directory")
        .with_failure_pattern("Permission denied")
        .with_failure_pattern("Operation not permitted"))
}
