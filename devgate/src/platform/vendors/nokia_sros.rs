//! Nokia SR OS platform definition.
//!
//! # Prompt Examples
//!
//! ```text
//! A:router#                            # classic exec
//! *A:router>config#                    # classic config with unsaved changes
//! [/]                                  # MD-CLI context line
//! A:admin@router#                      # MD-CLI prompt line
//! ```
//!
//! Classic CLI applies changes immediately; `admin save` persists them.

use crate::error::ChannelError;
use crate::platform::{InteractiveStep, PlatformDefinition};

pub const PLATFORM_NAME: &str = "nokia_sros";

pub fn platform() -> Result<PlatformDefinition, ChannelError> {
    Ok(PlatformDefinition::new(PLATFORM_NAME)
        .with_prompt(r"(?m)^\*?[ABCD]:[\w.\-@>]{1,63}#")?
        .with_on_open_command("environment no more")
        .with_failure_pattern("Error:")
        .with_failure_pattern("MINOR:")
        .with_failure_pattern("MAJOR:")
        .with_failure_pattern("CRITICAL:")
        .with_config_mode("configure", "exit all")
        .with_save(InteractiveStep::new("admin save")))
}
