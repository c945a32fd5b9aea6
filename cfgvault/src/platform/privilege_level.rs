//! Privilege level definition.

use regex::bytes::Regex;

/// A privilege level on a network device.
///
/// Levels are ordered by `rank`: rank 0 is what an unprivileged login lands
/// in, each higher rank is reached from the one below it with the
/// level's `escalate_command` and left again with its `deescalate_command`.
#[derive(Debug, Clone)]
pub struct PrivilegeLevel {
    /// Name of this privilege level (e.g., "exec", "privilege_exec").
    pub name: String,

    /// Position in the privilege order.
    pub rank: u8,

    /// Regex matching the prompt of this level at the end of the output.
    pub pattern: Regex,

    /// Command to escalate TO this level from the rank below.
    pub escalate_command: Option<String>,

    /// Command to de-escalate FROM this level to the rank below.
    pub deescalate_command: Option<String>,

    /// Prompt asking for the elevation secret after `escalate_command`.
    pub escalate_prompt: Option<Regex>,

    /// Strings that must NOT be in the prompt for this level to match.
    /// Used for disambiguation (e.g., "#" matches both enable and config modes).
    pub not_contains: Vec<String>,
}

impl PrivilegeLevel {
    /// Create a new privilege level with minimal required fields.
    pub fn new(name: impl Into<String>, rank: u8, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            rank,
            pattern: Regex::new(pattern)?,
            escalate_command: None,
            deescalate_command: None,
            escalate_prompt: None,
            not_contains: vec![],
        })
    }

    /// Set the escalation command.
    pub fn with_escalate(mut self, command: impl Into<String>) -> Self {
        self.escalate_command = Some(command.into());
        self
    }

    /// Set the de-escalation command.
    pub fn with_deescalate(mut self, command: impl Into<String>) -> Self {
        self.deescalate_command = Some(command.into());
        self
    }

    /// Set that escalation asks for a secret.
    pub fn with_auth(mut self, prompt_pattern: &str) -> Result<Self, regex::Error> {
        self.escalate_prompt = Some(Regex::new(prompt_pattern)?);
        Ok(self)
    }

    /// Add a not_contains pattern.
    pub fn with_not_contains(mut self, pattern: impl Into<String>) -> Self {
        self.not_contains.push(pattern.into());
        self
    }

    /// Check if this privilege level matches a prompt.
    pub fn matches(&self, prompt: &str) -> bool {
        if self.not_contains.iter().any(|nc| prompt.contains(nc.as_str())) {
            return false;
        }
        self.pattern.is_match(prompt.as_bytes())
    }
}
