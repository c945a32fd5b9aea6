//! Privilege level management with rank-based navigation.

use std::cmp::Ordering;

use regex::bytes::Regex;

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Manages privilege level navigation for one session.
///
/// Levels form a chain ordered by rank; every transition moves exactly one
/// rank up or down. This manager handles:
/// - Determining current privilege from a prompt
/// - Picking the command for the next step towards a target rank
#[derive(Debug)]
pub struct PrivilegeManager<'a> {
    platform: &'a PlatformDefinition,

    /// Device-specific replacement for the escalate command.
    escalate_override: Option<&'a str>,
}

impl<'a> PrivilegeManager<'a> {
    pub fn new(platform: &'a PlatformDefinition, escalate_override: Option<&'a str>) -> Self {
        Self {
            platform,
            escalate_override,
        }
    }

    /// Determine the privilege level from a prompt string.
    pub fn determine_from_prompt(&self, prompt: &str) -> Option<&'a PrivilegeLevel> {
        self.platform
            .privilege_levels
            .values()
            .find(|level| level.matches(prompt))
    }

    /// Get the transition one rank from `from` towards `target`.
    ///
    /// Returns `None` when already there, or when the platform defines no
    /// command for the needed step.
    pub fn next_transition(&self, from: u8, target: u8) -> Option<TransitionInfo> {
        match from.cmp(&target) {
            Ordering::Equal => None,
            Ordering::Less => {
                // Escalating: use escalate_command from the level above
                let to_level = self.platform.level_by_rank(from.checked_add(1)?)?;
                let command = match (to_level.rank, self.escalate_override) {
                    (1, Some(command)) => command.to_string(),
                    _ => to_level.escalate_command.clone()?,
                };
                Some(TransitionInfo {
                    command,
                    to: to_level.rank,
                    auth_prompt: to_level.escalate_prompt.clone(),
                })
            }
            Ordering::Greater => {
                // De-escalating: use deescalate_command from current
                let from_level = self.platform.level_by_rank(from)?;
                let to_level = self.platform.level_by_rank(from.checked_sub(1)?)?;
                Some(TransitionInfo {
                    command: from_level.deescalate_command.clone()?,
                    to: to_level.rank,
                    auth_prompt: None,
                })
            }
        }
    }
}

/// Information about a privilege level transition.
#[derive(Debug, Clone)]
pub struct TransitionInfo {
    /// Command to execute for the transition.
    pub command: String,

    /// Rank the transition leads to.
    pub to: u8,

    /// Pattern to match for auth prompt. If `Some`, the device may ask for
    /// the elevation secret.
    pub auth_prompt: Option<Regex>,
}
