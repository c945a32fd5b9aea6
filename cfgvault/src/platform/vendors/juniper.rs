//! Juniper JUNOS platform definition.
//!
//! Privilege levels:
//! - `exec` (rank 0) - Operational mode with `>` prompt
//! - `configuration` (rank 1) - Configuration mode with `#` prompt
//!
//! # Prompt Examples
//!
//! ```text
//! user@router>              # exec mode
//! user@router#              # configuration mode
//! {master:0}                # routing-engine banner printed above the prompt
//! ```
//!
//! The configuration is dumped in `set` form from operational mode, so a
//! session found in configuration mode is walked back down first.

use crate::platform::{LineClass, PlatformDefinition, PrivilegeLevel, ShowConfig};

/// Create the Juniper JUNOS platform definition.
pub fn platform() -> PlatformDefinition {
    let exec = PrivilegeLevel::new("exec", 0, r"(?m)^[\w.\-@:]+>[ \t]*\z").unwrap();

    let configuration = PrivilegeLevel::new("configuration", 1, r"(?m)^[\w.\-@:]+#[ \t]*\z")
        .unwrap()
        .with_escalate("configure")
        .with_deescalate("exit configuration-mode");

    PlatformDefinition::new(
        "juniper_junos",
        ShowConfig {
            rank: 0,
            command: "show configuration | display set".into(),
        },
    )
    .with_privilege(exec)
    .with_privilege(configuration)
    .with_failure_pattern("unknown command")
    .with_failure_pattern("syntax error")
    .with_on_open_command("set cli screen-length 0")
    .with_on_open_command("set cli screen-width 511")
    .with_line_filter(classify_line)
}

/// `#` comment lines delimit sections; routing-engine banners are noise.
pub fn classify_line(line: &str) -> LineClass {
    let trimmed = line.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        LineClass::Drop
    } else if line.contains('#') {
        LineClass::Separator
    } else {
        LineClass::Keep
    }
}
