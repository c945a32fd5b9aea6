//! Backup pipeline: bounded session pool feeding a persistence consumer.
//!
//! The pool and the consumer run concurrently, joined by an unbounded
//! outcome queue that ends with a single end-of-stream marker.

pub mod consumer;
pub mod orchestrator;
pub mod pool;
pub mod report;
pub mod store;

pub use consumer::PersistenceConsumer;
pub use orchestrator::BackupRun;
pub use pool::{PoolOptions, SessionPool, default_max_concurrent};
pub use report::{DeviceReport, DeviceStatus, RunSummary};
pub use store::{GitStore, StagedChanges, StoreStatus, VersionedStore};
