//! Persistence consumer: filter, write and commit each outcome.

use std::path::PathBuf;

use log::{debug, info, warn};
use tokio::sync::mpsc::UnboundedReceiver;

use super::report::{DeviceReport, DeviceStatus};
use super::store::VersionedStore;
use crate::device::DeviceRecord;
use crate::driver::{FailureReason, QueueItem, SessionOutcome};
use crate::error::StoreError;

/// Drains the outcome queue into backup artifacts.
///
/// The consumer is the only writer of the artifact tree and the store.
#[derive(Debug)]
pub struct PersistenceConsumer<S> {
    store: S,
    root: PathBuf,
}

impl<S: VersionedStore> PersistenceConsumer<S> {
    pub fn new(store: S, root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            root: root.into(),
        }
    }

    /// Process outcomes until the end-of-stream marker.
    ///
    /// Returns one report per outcome received.
    pub async fn run(self, mut rx: UnboundedReceiver<QueueItem>) -> Vec<DeviceReport> {
        let mut reports = Vec::new();

        loop {
            match rx.recv().await {
                Some(QueueItem::Outcome(outcome)) => reports.push(self.handle(outcome).await),
                Some(QueueItem::EndOfStream) => {
                    debug!("end of stream after {} outcomes", reports.len());
                    break;
                }
                None => {
                    warn!("outcome queue closed without end-of-stream marker");
                    break;
                }
            }
        }

        reports
    }

    async fn handle(&self, outcome: SessionOutcome) -> DeviceReport {
        let SessionOutcome { device, result } = outcome;

        let status = match result {
            Ok(raw) => match self.persist(&device, &raw).await {
                Ok(committed) => DeviceStatus::BackedUp { committed },
                Err(e) => {
                    warn!("{}: {}", device.address, e);
                    DeviceStatus::Failed(FailureReason::Persistence(e.to_string()))
                }
            },
            Err(reason) => {
                debug!("{}: nothing to persist ({})", device.address, reason);
                DeviceStatus::Failed(reason)
            }
        };

        DeviceReport {
            address: device.address.clone(),
            name: device.name.clone(),
            status,
        }
    }

    /// Write the filtered configuration and commit it if it changed.
    ///
    /// Returns whether a commit was made.
    pub async fn persist(&self, device: &DeviceRecord, raw: &str) -> Result<bool, StoreError> {
        let filtered = device.vendor.filter_config(raw);
        let dir = device.artifact_dir(&self.root);
        let file = device.artifact_file(&self.root);

        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(&file, filtered.as_bytes()).await?;
        debug!("{}: wrote {}", device.address, file.display());

        let repo = self.store.open_or_init(&dir).await?;
        self.store.stage(&repo, &file).await?;

        if !self.store.status(&repo).await?.has_changes() {
            info!("{}: configuration unchanged", device.address);
            return Ok(false);
        }

        self.store
            .commit(&repo, &format!("Commit {}", device.address))
            .await?;
        info!("{}: committed new configuration", device.address);
        Ok(true)
    }
}
