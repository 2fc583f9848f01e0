//! Huawei VRP platform definitions.
//!
//! VRP (classic) applies changes immediately and asks for confirmation on
//! `save`. VRPv8 stages a candidate that must be committed.

use crate::error::ChannelError;
use crate::platform::vendors::hp::VIEW_PROMPT;
use crate::platform::{InteractiveStep, PlatformDefinition};

pub const VRP: &str = "huawei";
pub const VRPV8: &str = "huawei_vrpv8";

fn vrp_family(name: &str) -> Result<PlatformDefinition, ChannelError> {
    Ok(PlatformDefinition::new(name)
        .with_prompt(VIEW_PROMPT)?
        .with_on_open_command("screen-length 0 temporary")
        .with_failure_pattern("Error: Unrecognized command")
        .with_failure_pattern("Error: Wrong parameter")
        .with_failure_pattern("Error: Incomplete command")
        .with_failure_pattern("Error: Too many parameters")
        .with_config_mode("system-view", "return"))
}

pub fn vrp() -> Result<PlatformDefinition, ChannelError> {
    Ok(vrp_family(VRP)?.with_save(InteractiveStep::new("save").with_confirm(r"\[Y/N\]:", "y")?))
}

pub fn vrpv8() -> Result<PlatformDefinition, ChannelError> {
    Ok(vrp_family(VRPV8)?
        .with_failure_pattern("Error: The configuration")
        .with_commit(InteractiveStep::new("commit").in_config_mode()))
}
