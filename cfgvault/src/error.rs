//! Error types for cfgvault.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for cfgvault operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Device inventory errors
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Configuration file errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Versioned store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The persistence consumer task stopped abnormally
    #[error("Persistence consumer failed: {0}")]
    Consumer(String),
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host key differs from the one in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Host is not in known_hosts and strict checking is enabled
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// The server refused the PTY or shell request
    #[error("Shell request failed: {0}")]
    Shell(#[from] ChannelError),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Channel layer errors (prompt matching, shell I/O).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Failed to open the interactive shell
    #[error("Failed to open shell: {0}")]
    ShellOpenFailed(String),

    /// Pattern matching timed out
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// I/O error on the underlying stream
    #[error("Channel I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Device inventory loading errors.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// Inventory file could not be read
    #[error("Cannot read inventory {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Inventory is not valid JSON of the expected shape
    #[error("Malformed inventory: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration file errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file is not valid TOML of the expected shape
    #[error("Malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A path named in the config does not exist
    #[error("{key}: path {path} does not exist")]
    MissingPath { key: &'static str, path: PathBuf },

    /// A directory named in the config could not be created
    #[error("{key}: cannot create {path}: {source}")]
    CreateDir {
        key: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A value is out of range
    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Versioned store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store backend could not be invoked
    #[error("Cannot run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: io::Error,
    },

    /// A store command exited unsuccessfully
    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// Store I/O error
    #[error("Store I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias using cfgvault's Error.
pub type Result<T> = std::result::Result<T, Error>;
