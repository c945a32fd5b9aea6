//! SSH transport layer wrapping russh.
//!
//! This module provides connection setup, authentication and shell
//! creation, plus the [`Connector`] seam the session pool opens devices
//! through.

pub mod config;
mod ssh;

pub use config::{HostKeyVerification, SshConfig, SshOptions};
pub use ssh::{SshShell, SshTransport};

use std::future::Future;

use crate::channel::ShellChannel;
use crate::device::DeviceRecord;
use crate::error::TransportError;

/// Opens an interactive shell on a device.
///
/// The pool bounds every call with its own connect timeout.
pub trait Connector: Send + Sync + 'static {
    /// The shell handed to the session driver.
    type Shell: ShellChannel + 'static;

    /// Connect, authenticate and open an interactive shell.
    fn connect(
        &self,
        device: &DeviceRecord,
    ) -> impl Future<Output = Result<Self::Shell, TransportError>> + Send;
}

/// Production connector: SSH with a PTY shell.
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    options: SshOptions,
}

impl SshConnector {
    pub fn new(options: SshOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SshOptions {
        &self.options
    }
}

impl Connector for SshConnector {
    type Shell = SshShell;

    async fn connect(&self, device: &DeviceRecord) -> Result<SshShell, TransportError> {
        let config = self
            .options
            .for_host(&device.address, device.port, &device.username);
        let transport = SshTransport::connect(config, &device.credentials).await?;
        Ok(transport.open_shell().await?)
    }
}
