//! One backup run across the whole inventory.

use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::mpsc;

use super::consumer::PersistenceConsumer;
use super::pool::{PoolOptions, SessionPool};
use super::report::RunSummary;
use super::store::{GitStore, VersionedStore};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::inventory::Inventory;
use crate::transport::{Connector, SshConnector};

/// Wires the session pool to the persistence consumer for one run.
#[derive(Debug)]
pub struct BackupRun<C, S> {
    pool: SessionPool<C>,
    consumer: PersistenceConsumer<S>,
}

impl BackupRun<SshConnector, GitStore> {
    /// SSH sessions and git storage, as configured.
    pub fn from_config(config: &AppConfig) -> Self {
        let connector = SshConnector::new(config.ssh_options());
        let store = GitStore::new(&config.store.author_name, &config.store.author_email);
        Self::new(
            connector,
            store,
            config.application.configs_path.clone(),
            config.pool_options(),
        )
    }
}

impl<C: Connector, S: VersionedStore> BackupRun<C, S> {
    pub fn new(connector: C, store: S, root: impl Into<PathBuf>, options: PoolOptions) -> Self {
        Self {
            pool: SessionPool::new(connector, options),
            consumer: PersistenceConsumer::new(store, root),
        }
    }

    /// Back up every device in `inventory`.
    ///
    /// Per-device failures end up in the summary; only a consumer that
    /// stopped abnormally is an error.
    pub async fn execute(self, inventory: Inventory) -> Result<RunSummary> {
        let Inventory { devices, rejected } = inventory;
        for rejection in &rejected {
            warn!("{}: skipped: {}", rejection.address, rejection.reason);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let consumer = tokio::spawn(self.consumer.run(rx));

        let devices = devices.into_iter().map(Arc::new).collect();
        self.pool.run(devices, tx).await;

        let reports = consumer
            .await
            .map_err(|e| Error::Consumer(e.to_string()))?;

        let summary = RunSummary { reports, rejected };
        info!(
            "backup finished: {} of {} devices backed up, {} rejected",
            summary.succeeded(),
            summary.attempted(),
            summary.rejected.len()
        );
        Ok(summary)
    }
}
