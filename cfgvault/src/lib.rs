//! # cfgvault
//!
//! Concurrent configuration backup for multi-vendor network devices.
//!
//! cfgvault opens many SSH shell sessions at once under a concurrency cap,
//! walks each device to the privilege level its configuration dump needs,
//! and hands the output to a separate persistence task that filters it,
//! writes it to disk and commits it to a per-device git repository.
//!
//! ## Features
//!
//! - Async SSH sessions via russh
//! - Multi-vendor support (Cisco IOS, Juniper JUNOS, MikroTik RouterOS)
//! - Efficient pattern buffer matching (tail search over stripped output)
//! - Privilege detection and escalation from prompt text alone
//! - Bounded fan-out with a decoupled commit-on-change store
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cfgvault::{AppConfig, BackupRun, Inventory};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cfgvault::Error> {
//!     let config = AppConfig::load("config.toml")?;
//!     let inventory = Inventory::load(&config.application.devices_path)?;
//!
//!     let summary = BackupRun::from_config(&config).execute(inventory).await?;
//!     print!("{}", summary);
//!     Ok(())
//! }
//! ```

pub mod backup;
pub mod channel;
pub mod config;
pub mod device;
pub mod driver;
pub mod error;
pub mod inventory;
pub mod platform;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use backup::{BackupRun, DeviceReport, DeviceStatus, RunSummary};
pub use config::AppConfig;
pub use device::{Credentials, DeviceRecord, Privilege};
pub use driver::{FailureReason, SessionDriver, SessionOutcome};
pub use error::Error;
pub use inventory::{Inventory, Rejection};
pub use platform::{PlatformDefinition, PrivilegeLevel, Vendor};
pub use transport::{HostKeyVerification, SshConfig, SshConnector};
