//! Cisco IOS / IOS-XE platform definition.
//!
//! Privilege levels:
//! - `exec` (rank 0) - User EXEC mode with `>` prompt
//! - `privilege_exec` (rank 1) - Privileged EXEC mode with `#` prompt
//! - `configuration` (rank 2) - Configuration mode with `(config*)#` prompt
//!
//! # Prompt Examples
//!
//! ```text
//! router>                    # exec
//! router#                    # privilege_exec
//! router(config)#            # configuration
//! router(config-if)#         # configuration sub-mode
//! ```
//!
//! The running configuration is only readable from `privilege_exec`.

use crate::platform::{LineClass, PlatformDefinition, PrivilegeLevel, ShowConfig};

/// Create the Cisco IOS platform definition.
pub fn platform() -> PlatformDefinition {
    let exec = PrivilegeLevel::new("exec", 0, r"(?m)^[\w.\-@/:]{1,63}>[ \t]*\z").unwrap();

    // Hostnames never contain parentheses, config prompts always do.
    let privilege_exec =
        PrivilegeLevel::new("privilege_exec", 1, r"(?m)^[\w.\-@/:]{1,63}#[ \t]*\z")
            .unwrap()
            .with_escalate("enable")
            .with_deescalate("disable")
            .with_auth(r"(?mi)^password:[ \t]*\z")
            .unwrap()
            .with_not_contains("(config");

    let configuration = PrivilegeLevel::new(
        "configuration",
        2,
        r"(?m)^[\w.\-@/:]{1,63}\(config[\w.\-@/:+]{0,63}\)#[ \t]*\z",
    )
    .unwrap()
    .with_escalate("configure terminal")
    .with_deescalate("end");

    PlatformDefinition::new(
        "cisco_ios",
        ShowConfig {
            rank: 1,
            command: "show running-config view full".into(),
        },
    )
    .with_privilege(exec)
    .with_privilege(privilege_exec)
    .with_privilege(configuration)
    .with_failure_pattern("% Invalid input")
    .with_failure_pattern("% Incomplete command")
    .with_failure_pattern("% Ambiguous command")
    .with_failure_pattern("% Authorization failed")
    .with_on_open_command("terminal length 0")
    .with_on_open_command("terminal width 511")
    .with_line_filter(classify_line)
}

/// `!` lines delimit sections; the build banner is noise.
pub fn classify_line(line: &str) -> LineClass {
    if line.contains('!') {
        LineClass::Separator
    } else if line.contains("Building configuration") || line.contains("Current configuration") {
        LineClass::Drop
    } else {
        LineClass::Keep
    }
}
