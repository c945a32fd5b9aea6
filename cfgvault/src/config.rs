//! Application configuration.
//!
//! A TOML file with four tables:
//!
//! ```toml
//! [application]
//! devices_path = "devices.json"
//! configs_path = "backups"
//!
//! [logging]
//! level = "info"
//! file_path = "logs/cfgvault.log"
//!
//! [session]
//! max_concurrent = 100
//! connect_timeout_secs = 30
//! command_timeout_secs = 60
//! host_key_verification = "accept-new"
//!
//! [store]
//! author_name = "cfgvault"
//! author_email = "cfgvault@localhost"
//! ```
//!
//! Only `[application]` is required.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::LevelFilter;
use serde::Deserialize;

use crate::backup::{PoolOptions, default_max_concurrent};
use crate::error::ConfigError;
use crate::transport::{HostKeyVerification, SshOptions};

fn default_level() -> String {
    "info".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_command_timeout_secs() -> u64 {
    60
}

fn default_author_name() -> String {
    "cfgvault".to_string()
}

fn default_author_email() -> String {
    "cfgvault@localhost".to_string()
}

/// Parsed configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub application: ApplicationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Input and output locations.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationConfig {
    /// Device inventory (JSON); must exist.
    pub devices_path: PathBuf,
    /// Backup root; created if absent.
    pub configs_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// One of debug, info, warning, error, critical.
    #[serde(default = "default_level")]
    pub level: String,
    /// Append log output here instead of stderr.
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_path: None,
        }
    }
}

impl LoggingConfig {
    /// Map the configured level name to a filter; unknown names mean info.
    pub fn level_filter(&self) -> LevelFilter {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "warning" | "warn" => LevelFilter::Warn,
            "error" | "critical" => LevelFilter::Error,
            _ => LevelFilter::Info,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    #[serde(default)]
    pub host_key_verification: HostKeyVerification,
    #[serde(default)]
    pub known_hosts_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            connect_timeout_secs: default_connect_timeout_secs(),
            command_timeout_secs: default_command_timeout_secs(),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }
}

/// Commit identity for the versioned store.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_author_name")]
    pub author_name: String,
    #[serde(default = "default_author_email")]
    pub author_email: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            author_name: default_author_name(),
            author_email: default_author_email(),
        }
    }
}

impl AppConfig {
    /// Read, parse and validate the configuration file at `path`.
    ///
    /// Creates the backup root if it does not exist yet.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        config.prepare_paths()?;
        Ok(config)
    }

    /// Parse and check values, without touching the filesystem.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;

        if config.session.max_concurrent == 0 {
            return Err(ConfigError::Invalid {
                key: "session.max_concurrent",
                message: "must be at least 1".into(),
            });
        }
        if config.session.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "session.connect_timeout_secs",
                message: "must be at least 1".into(),
            });
        }
        if config.session.command_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "session.command_timeout_secs",
                message: "must be at least 1".into(),
            });
        }

        Ok(config)
    }

    /// Check the inventory exists and create the backup root.
    pub fn prepare_paths(&self) -> Result<(), ConfigError> {
        let devices = &self.application.devices_path;
        if !devices.exists() {
            return Err(ConfigError::MissingPath {
                key: "application.devices_path",
                path: devices.clone(),
            });
        }

        let configs = &self.application.configs_path;
        std::fs::create_dir_all(configs).map_err(|source| ConfigError::CreateDir {
            key: "application.configs_path",
            path: configs.clone(),
            source,
        })?;

        Ok(())
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_concurrent: self.session.max_concurrent,
            connect_timeout: Duration::from_secs(self.session.connect_timeout_secs),
            command_timeout: Duration::from_secs(self.session.command_timeout_secs),
        }
    }

    pub fn ssh_options(&self) -> SshOptions {
        SshOptions {
            connect_timeout: Duration::from_secs(self.session.connect_timeout_secs),
            host_key_verification: self.session.host_key_verification,
            known_hosts_path: self.session.known_hosts_path.clone(),
            ..SshOptions::default()
        }
    }
}
