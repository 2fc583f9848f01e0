//! HP / H3C platform definitions.
//!
//! # Prompt Examples
//!
//! ```text
//! <H3C>                        # Comware user view
//! [H3C]                        # Comware system view
//! [H3C-GigabitEthernet1/0/1]   # Comware interface view
//! switch>                      # ProCurve operator
//! switch#                      # ProCurve manager
//! switch(config)#              # ProCurve config
//! ```

use crate::error::ChannelError;
use crate::platform::{EnableMode, InteractiveStep, PlatformDefinition};

pub const COMWARE: &str = "hp_comware";
pub const PROCURVE: &str = "hp_procurve";

/// `<name>` in user view, `[name]` in system view. Huawei VRPv8 marks
/// candidate state with `~` or `*` after the bracket.
pub(crate) const VIEW_PROMPT: &str = r"(?m)^[<\[][~*]?[\w.\-@/: ]{1,63}[>\]]";

pub fn comware() -> Result<PlatformDefinition, ChannelError> {
    Ok(PlatformDefinition::new(COMWARE)
        .with_prompt(VIEW_PROMPT)?
        .with_on_open_command("screen-length disable")
        .with_failure_pattern("% Unrecognized command")
        .with_failure_pattern("% Wrong parameter")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Too many parameters")
        .with_failure_pattern("% Ambiguous command")
        .with_config_mode("system-view", "return")
        .with_save(InteractiveStep::new("save force")))
}

pub fn procurve() -> Result<PlatformDefinition, ChannelError> {
    Ok(PlatformDefinition::new(PROCURVE)
        .with_prompt(r"(?m)^[\w.\-@/:() ]{1,63}[>#]")?
        .with_enable(EnableMode::new("enable", r"(?m)^[\w.\-@/: ]{1,63}>")?)
        .with_on_open_command("no page")
        .with_failure_pattern("Invalid input:")
        .with_failure_pattern("Ambiguous input:")
        .with_config_mode("configure terminal", "end")
        .with_save(InteractiveStep::new("write memory")))
}
