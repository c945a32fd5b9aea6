//! Bounded-concurrency session pool.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::Semaphore;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinSet;

use crate::channel::{PtyChannel, ShellChannel};
use crate::device::DeviceRecord;
use crate::driver::{FailureReason, QueueItem, SessionDriver, SessionOutcome};
use crate::transport::Connector;

/// Sessions allowed per available CPU when no limit is configured.
const SESSIONS_PER_CPU: usize = 25;

/// Default cap on simultaneously open sessions.
pub fn default_max_concurrent() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        * SESSIONS_PER_CPU
}

/// Limits and timeouts for a pool run.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Maximum simultaneously open connections.
    pub max_concurrent: usize,

    /// Bound on opening one connection.
    pub connect_timeout: Duration,

    /// Bound on each prompt read inside a session.
    pub command_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            connect_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(60),
        }
    }
}

/// Runs one session per device under an admission limit.
#[derive(Debug)]
pub struct SessionPool<C> {
    connector: Arc<C>,
    options: PoolOptions,
}

impl<C: Connector> SessionPool<C> {
    pub fn new(connector: C, options: PoolOptions) -> Self {
        Self {
            connector: Arc::new(connector),
            options,
        }
    }

    pub fn options(&self) -> &PoolOptions {
        &self.options
    }

    /// Run every device and enqueue its outcome, then the end-of-stream
    /// marker.
    ///
    /// Exactly one outcome is enqueued per device, even when a session task
    /// panics. Returns the number of outcomes enqueued.
    pub async fn run(&self, devices: Vec<Arc<DeviceRecord>>, tx: UnboundedSender<QueueItem>) -> usize {
        let limiter = Arc::new(Semaphore::new(self.options.max_concurrent.max(1)));
        let mut tasks = JoinSet::new();
        let mut in_flight = HashMap::with_capacity(devices.len());

        info!(
            "starting {} sessions, at most {} at a time",
            devices.len(),
            self.options.max_concurrent.max(1)
        );

        for device in devices {
            let handle = tasks.spawn(run_session(
                self.connector.clone(),
                limiter.clone(),
                device.clone(),
                self.options.clone(),
                tx.clone(),
            ));
            in_flight.insert(handle.id(), device);
        }

        let mut enqueued = 0;
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, ())) => {
                    in_flight.remove(&id);
                    enqueued += 1;
                }
                Err(err) => {
                    let Some(device) = in_flight.remove(&err.id()) else {
                        continue;
                    };
                    error!("{}: session task aborted: {}", device.address, err);
                    let outcome = SessionOutcome::failure(
                        device,
                        FailureReason::Command(format!("session aborted: {err}")),
                    );
                    if tx.send(QueueItem::Outcome(outcome)).is_ok() {
                        enqueued += 1;
                    }
                }
            }
        }

        if tx.send(QueueItem::EndOfStream).is_err() {
            warn!("outcome queue closed before end of stream");
        }
        debug!("all {} sessions finished", enqueued);
        enqueued
    }
}

async fn run_session<C: Connector>(
    connector: Arc<C>,
    limiter: Arc<Semaphore>,
    device: Arc<DeviceRecord>,
    options: PoolOptions,
    tx: UnboundedSender<QueueItem>,
) {
    let outcome = match limiter.acquire_owned().await {
        Ok(permit) => {
            let outcome = open_and_drive(connector.as_ref(), device, &options).await;
            drop(permit);
            outcome
        }
        Err(_) => SessionOutcome::failure(
            device,
            FailureReason::Connection("admission limiter closed".into()),
        ),
    };

    if tx.send(QueueItem::Outcome(outcome)).is_err() {
        warn!("outcome queue closed, dropping outcome");
    }
}

async fn open_and_drive<C: Connector>(
    connector: &C,
    device: Arc<DeviceRecord>,
    options: &PoolOptions,
) -> SessionOutcome {
    debug!("{}: connecting on port {}", device.address, device.port);

    let shell = match tokio::time::timeout(options.connect_timeout, connector.connect(&device)).await {
        Ok(Ok(shell)) => shell,
        Ok(Err(e)) => {
            warn!("{}: {}", device.address, e);
            return SessionOutcome::failure(device, e.into());
        }
        Err(_) => {
            warn!(
                "{}: no connection within {:?}",
                device.address, options.connect_timeout
            );
            return SessionOutcome::failure(device, FailureReason::ConnectionTimeout);
        }
    };

    let mut channel = PtyChannel::new(shell, options.command_timeout);
    let outcome = SessionDriver::new(device.clone()).run(&mut channel).await;

    if let Err(e) = channel.into_inner().close().await {
        debug!("{}: close failed: {}", device.address, e);
    }
    outcome
}
