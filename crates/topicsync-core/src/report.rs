//! Sync progress events
//!
//! The engine and execution layer never print. They emit [`SyncEvent`]s to a
//! [`SyncReporter`], and the embedding application decides how to present
//! them (console, logs, nothing).

use crate::reconcile::Classification;
use crate::types::{ReplicationMismatch, RunSummary, ScaleDownReport};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Something noteworthy that happened during a sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Snapshot fetched
    SnapshotFetched { topics: usize },
    /// A desired topic was classified
    Planned(Classification),
    /// Declared replication factor differs from the broker's
    ReplicationMismatch(ReplicationMismatch),
    /// Declared partition count is lower than the broker's
    ScaleDownRefused(ScaleDownReport),
    /// A create batch is about to be sent
    CreateAttempt {
        attempt: u32,
        max_attempts: u32,
        topics: usize,
    },
    /// The create batch failed at the connection level and will be retried
    RetryScheduled {
        attempt: u32,
        delay: Duration,
        error: String,
    },
    TopicCreated { name: String },
    TopicAlreadyExists { name: String },
    TopicCreateFailed { name: String, reason: String },
    PartitionsIncreased { name: String, from: i32, to: i32 },
    PartitionIncreaseFailed { name: String, reason: String },
    /// The run finished (successfully or not)
    Completed(RunSummary),
}

/// Consumer of sync events
pub trait SyncReporter: Send + Sync {
    fn report(&self, event: &SyncEvent);
}

/// Reporter that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl SyncReporter for NoopReporter {
    fn report(&self, _event: &SyncEvent) {}
}

/// Reporter that forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl SyncReporter for TracingReporter {
    fn report(&self, event: &SyncEvent) {
        match event {
            SyncEvent::SnapshotFetched { topics } => {
                debug!(topics, "Fetched cluster metadata");
            }
            SyncEvent::Planned(classification) => {
                debug!(topic = %classification.topic(), ?classification, "Planned");
            }
            SyncEvent::ReplicationMismatch(m) => {
                warn!(
                    topic = %m.name,
                    current = m.current_replication,
                    desired = m.desired_replication,
                    "Replication factor mismatch (not applied)"
                );
            }
            SyncEvent::ScaleDownRefused(r) => {
                warn!(
                    topic = %r.name,
                    current = r.current_partitions,
                    desired = r.desired_partitions,
                    "Cannot decrease partition count"
                );
            }
            SyncEvent::CreateAttempt {
                attempt,
                max_attempts,
                topics,
            } => {
                info!(attempt, max_attempts, topics, "Creating topics");
            }
            SyncEvent::RetryScheduled {
                attempt,
                delay,
                error,
            } => {
                warn!(attempt, ?delay, error = %error, "Retrying topic creation");
            }
            SyncEvent::TopicCreated { name } => info!(topic = %name, "Topic created"),
            SyncEvent::TopicAlreadyExists { name } => {
                info!(topic = %name, "Topic already exists")
            }
            SyncEvent::TopicCreateFailed { name, reason } => {
                error!(topic = %name, reason = %reason, "Failed to create topic")
            }
            SyncEvent::PartitionsIncreased { name, from, to } => {
                info!(topic = %name, from, to, "Partitions increased")
            }
            SyncEvent::PartitionIncreaseFailed { name, reason } => {
                error!(topic = %name, reason = %reason, "Failed to increase partitions")
            }
            SyncEvent::Completed(summary) => {
                info!(
                    created = summary.created,
                    already_exists = summary.already_exists,
                    updated = summary.updated,
                    unchanged = summary.unchanged,
                    cannot_scale_down = summary.cannot_scale_down,
                    failed = summary.failed(),
                    "Topic sync finished"
                );
            }
        }
    }
}
