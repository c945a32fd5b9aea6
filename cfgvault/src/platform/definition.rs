//! Platform definition for vendor-specific configurations.

use indexmap::IndexMap;
use regex::bytes::Regex;

use super::filter::LineClass;
use super::privilege_level::PrivilegeLevel;

/// Lines at the head of a reply where a device prints its error message.
const FAILURE_REPLY_LINES: usize = 3;

/// The command that dumps the running configuration, and the rank it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowConfig {
    pub rank: u8,
    pub command: String,
}

/// Platform definition containing all vendor-specific protocol knowledge.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g., "cisco_ios", "juniper_junos").
    pub name: String,

    /// Privilege levels for this platform, in ascending rank.
    pub privilege_levels: IndexMap<String, PrivilegeLevel>,

    /// Command that dumps the configuration.
    pub show_config: ShowConfig,

    /// Patterns that indicate command failure.
    pub failed_when_contains: Vec<String>,

    /// Commands sent once the required privilege is reached (paging off etc).
    pub on_open_commands: Vec<String>,

    /// Classifies configuration lines for filtering.
    pub line_filter: fn(&str) -> LineClass,

    /// Alternation of every level's prompt pattern.
    prompt_pattern: Regex,
}

impl PlatformDefinition {
    /// Create a new platform definition with minimal required fields.
    pub fn new(name: impl Into<String>, show_config: ShowConfig) -> Self {
        Self {
            name: name.into(),
            privilege_levels: IndexMap::new(),
            show_config,
            failed_when_contains: vec![],
            on_open_commands: vec![],
            line_filter: |_| LineClass::Keep,
            prompt_pattern: Self::build_combined_pattern(&IndexMap::new()),
        }
    }

    /// Add a privilege level.
    pub fn with_privilege(mut self, level: PrivilegeLevel) -> Self {
        self.privilege_levels.insert(level.name.clone(), level);
        self.privilege_levels.sort_by(|_, a, _, b| a.rank.cmp(&b.rank));
        self.prompt_pattern = Self::build_combined_pattern(&self.privilege_levels);
        self
    }

    /// Add a failure pattern.
    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    /// Add an on_open command.
    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    /// Set the configuration line classifier.
    pub fn with_line_filter(mut self, filter: fn(&str) -> LineClass) -> Self {
        self.line_filter = filter;
        self
    }

    /// Regex matching the prompt of any privilege level.
    pub fn prompt_pattern(&self) -> &Regex {
        &self.prompt_pattern
    }

    /// Get the privilege level with the given rank.
    pub fn level_by_rank(&self, rank: u8) -> Option<&PrivilegeLevel> {
        self.privilege_levels.values().find(|l| l.rank == rank)
    }

    /// Return the failure pattern the device answered a command with.
    ///
    /// Only the head of the reply is checked, and a pattern must open a
    /// line (optionally after an `error:` tag), so configuration text that
    /// merely mentions an error string is not a failure.
    pub fn detect_failure(&self, output: &str) -> Option<&str> {
        output
            .lines()
            .take(FAILURE_REPLY_LINES)
            .map(|line| {
                let line = line.trim_start();
                line.strip_prefix("error:").map_or(line, str::trim_start)
            })
            .find_map(|line| {
                self.failed_when_contains
                    .iter()
                    .find(|p| line.starts_with(p.as_str()))
            })
            .map(String::as_str)
    }

    fn build_combined_pattern(levels: &IndexMap<String, PrivilegeLevel>) -> Regex {
        let combined = levels
            .values()
            .map(|level| format!("(?:{})", level.pattern.as_str()))
            .collect::<Vec<_>>()
            .join("|");

        match Regex::new(&combined) {
            Ok(pattern) if !levels.is_empty() => pattern,
            _ => Regex::new(r"[$#>][ \t]*\z").expect("fallback prompt pattern is valid"),
        }
    }
}
