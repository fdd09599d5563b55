//! # topicsync-core
//!
//! Declarative topic provisioning for Kafka-compatible brokers.
//!
//! Given an ordered list of desired topics (name, partitions, replication
//! factor), the synchronizer inspects live cluster metadata and performs the
//! minimum set of idempotent operations to converge on it:
//!
//! - missing topics are created (an "already exists" answer is benign, so
//!   the whole run is safe to repeat)
//! - partition counts are grown where the broker has fewer than declared
//! - partition decreases are reported, never attempted
//! - replication factor differences are reported as warnings, never applied
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use topicsync_core::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! let specs = TopicsFile::from_file("topics.yaml")?.into_specs();
//! let synchronizer = TopicSynchronizer::new(gateway);
//!
//! let summary = synchronizer.sync(&specs, &CancellationToken::new()).await?;
//! println!("{}", summary);
//! ```
//!
//! ## Modules
//!
//! - [`types`] - desired/observed topic state and the run summary
//! - [`config`] - desired-state file loading and validation
//! - [`gateway`] - the broker administration trait
//! - [`reconcile`] - the diff between desired and actual state
//! - [`executor`] - create/partition-increase execution with bounded retry
//! - [`retry`] - transient vs. terminal failure classification
//! - [`report`] - progress events
//! - [`sync`] - one full reconciliation pass
//! - [`error`] - error types

pub mod config;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod reconcile;
pub mod report;
pub mod retry;
pub mod sync;
pub mod types;

pub use config::{validate_specs, TopicsFile};
pub use error::{Error, GatewayError, GatewayErrorKind, Result};
pub use executor::{CreateOutcome, Executor, ExecutorConfig, ExecutorConfigBuilder};
pub use gateway::{AdminGateway, AdminRequestOptions};
pub use reconcile::{reconcile, Classification, ReconcilePlan};
pub use report::{NoopReporter, SyncEvent, SyncReporter, TracingReporter};
pub use retry::is_retryable;
pub use sync::{SyncMetrics, TopicSynchronizer};
pub use types::{
    ClusterSnapshot, PartitionMetadata, ReplicationMismatch, ResultCode, RunSummary,
    ScaleDownReport, TopicFailure, TopicMetadata, TopicResult, TopicSpec, UpdateDirective,
};

pub mod prelude {
    //! Re-exports for convenient usage
    pub use crate::config::TopicsFile;
    pub use crate::error::{Error, GatewayError, GatewayErrorKind, Result};
    pub use crate::executor::ExecutorConfig;
    pub use crate::gateway::{AdminGateway, AdminRequestOptions};
    pub use crate::report::{SyncEvent, SyncReporter};
    pub use crate::sync::TopicSynchronizer;
    pub use crate::types::{
        ClusterSnapshot, RunSummary, TopicMetadata, TopicResult, TopicSpec, UpdateDirective,
    };
}
