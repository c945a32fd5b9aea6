//! MikroTik RouterOS platform definition.
//!
//! RouterOS has a single privilege level; what a user may do is decided by
//! the user's group, not by the session.
//!
//! # Prompt Examples
//!
//! ```text
//! [admin@MikroTik] >
//! [admin@MikroTik] /ip address>
//! ```

use crate::platform::{LineClass, PlatformDefinition, PrivilegeLevel, ShowConfig};

/// Create the MikroTik RouterOS platform definition.
pub fn platform() -> PlatformDefinition {
    let exec = PrivilegeLevel::new("exec", 0, r"(?m)^\[[^\]\n]+\][ \t]?[^>\n]*>[ \t]*\z").unwrap();

    PlatformDefinition::new(
        "mikrotik_routeros",
        ShowConfig {
            rank: 0,
            command: "/export".into(),
        },
    )
    .with_privilege(exec)
    .with_failure_pattern("bad command name")
    .with_failure_pattern("syntax error")
    .with_line_filter(classify_line)
}

/// `#` lines (export header, software id) delimit sections.
pub fn classify_line(line: &str) -> LineClass {
    if line.contains('#') {
        LineClass::Separator
    } else {
        LineClass::Keep
    }
}
