//! Desired and observed topic state
//!
//! Everything in here is created fresh for a single sync run and dropped once
//! the summary has been produced. The broker cluster is the only durable state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use validator::Validate;

// ============================================================================
// Desired state
// ============================================================================

/// A single topic as declared in the desired-state file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct TopicSpec {
    /// Topic name (non-empty, unique within a sync batch)
    #[validate(length(min = 1, message = "topic name cannot be empty"))]
    pub name: String,
    /// Number of partitions (> 0)
    #[validate(range(min = 1, message = "must have at least 1 partition"))]
    pub partitions: i32,
    /// Replication factor (> 0)
    #[validate(range(min = 1, message = "must have a replication factor of at least 1"))]
    pub replication_factor: i32,
    /// Free-text description, only used for listing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TopicSpec {
    /// Create a new topic spec without a description
    pub fn new(name: impl Into<String>, partitions: i32, replication_factor: i32) -> Self {
        Self {
            name: name.into(),
            partitions,
            replication_factor,
            description: None,
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// ============================================================================
// Observed state
// ============================================================================

/// Partition metadata as reported by the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionMetadata {
    /// Partition ID
    pub id: i32,
    /// Leader broker ID (-1 when leaderless)
    pub leader: i32,
    /// Assigned replica broker IDs
    pub replicas: Vec<i32>,
    /// In-sync replica broker IDs
    pub isr: Vec<i32>,
}

impl PartitionMetadata {
    /// Create partition metadata with the given replica set; the first replica leads
    pub fn new(id: i32, replicas: Vec<i32>) -> Self {
        Self {
            id,
            leader: replicas.first().copied().unwrap_or(-1),
            isr: replicas.clone(),
            replicas,
        }
    }
}

/// Topic metadata as reported by the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMetadata {
    /// Topic name
    pub name: String,
    /// Partitions, ordered by partition ID
    pub partitions: Vec<PartitionMetadata>,
    /// Error the broker attached to this topic's metadata, if any
    pub error: Option<String>,
}

impl TopicMetadata {
    /// Create topic metadata
    pub fn new(name: impl Into<String>, partitions: Vec<PartitionMetadata>) -> Self {
        Self {
            name: name.into(),
            partitions,
            error: None,
        }
    }

    /// Mark the metadata as incomplete with the broker's error
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Build metadata for a topic whose partitions all share the same replica set
    pub fn uniform(name: impl Into<String>, partitions: i32, replicas: &[i32]) -> Self {
        let partitions = (0..partitions)
            .map(|id| PartitionMetadata::new(id, replicas.to_vec()))
            .collect();
        Self::new(name, partitions)
    }

    /// Current partition count
    pub fn partition_count(&self) -> i32 {
        self.partitions.len() as i32
    }

    /// Observed replication factor.
    ///
    /// This is the largest replica set across all partitions rather than a
    /// single-partition sample, so a topic in the middle of a reassignment
    /// reports the widest assignment. A topic without partitions reports 0.
    pub fn replication_factor(&self) -> i32 {
        self.partitions
            .iter()
            .map(|p| p.replicas.len() as i32)
            .max()
            .unwrap_or(0)
    }
}

/// Topic metadata for the whole cluster, fetched in a single call
#[derive(Debug, Clone, Default)]
pub struct ClusterSnapshot {
    topics: HashMap<String, TopicMetadata>,
}

impl ClusterSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot keyed by each topic's own name
    pub fn from_topics(topics: impl IntoIterator<Item = TopicMetadata>) -> Self {
        Self {
            topics: topics.into_iter().map(|t| (t.name.clone(), t)).collect(),
        }
    }

    /// Insert or replace a topic
    pub fn insert(&mut self, topic: TopicMetadata) {
        self.topics.insert(topic.name.clone(), topic);
    }

    /// Look up a topic by name
    pub fn get(&self, name: &str) -> Option<&TopicMetadata> {
        self.topics.get(name)
    }

    /// Number of topics in the snapshot
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    /// Whether the snapshot has no topics
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Iterate over topics in arbitrary order
    pub fn topics(&self) -> impl Iterator<Item = &TopicMetadata> {
        self.topics.values()
    }
}

// ============================================================================
// Work items
// ============================================================================

/// Request to grow an existing topic to a new partition count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDirective {
    /// Topic name
    pub name: String,
    /// Partition count before the update
    pub current_partitions: i32,
    /// Target partition count
    pub desired_partitions: i32,
}

/// A topic that asks for fewer partitions than it has. Never executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleDownReport {
    pub name: String,
    pub current_partitions: i32,
    pub desired_partitions: i32,
}

/// A topic whose declared replication factor differs from the observed one.
/// Reported as a warning only; replication changes need a reassignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationMismatch {
    pub name: String,
    pub current_replication: i32,
    pub desired_replication: i32,
}

// ============================================================================
// Broker results
// ============================================================================

/// Per-topic result code of a batch admin operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultCode {
    /// The operation succeeded
    Success,
    /// The topic already exists (benign for creates)
    TopicAlreadyExists,
    /// Any other broker error, with the broker's description
    Rejected(String),
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultCode::Success => write!(f, "success"),
            ResultCode::TopicAlreadyExists => write!(f, "topic already exists"),
            ResultCode::Rejected(reason) => write!(f, "{}", reason),
        }
    }
}

/// Result of a batch admin operation for one topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicResult {
    pub name: String,
    pub code: ResultCode,
}

impl TopicResult {
    pub fn success(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: ResultCode::Success,
        }
    }

    pub fn already_exists(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: ResultCode::TopicAlreadyExists,
        }
    }

    pub fn rejected(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: ResultCode::Rejected(reason.into()),
        }
    }
}

// ============================================================================
// Summary
// ============================================================================

/// A topic that could not be created or updated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicFailure {
    pub name: String,
    pub reason: String,
}

/// Outcome of one sync run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Topics created in this run
    pub created: usize,
    /// Topics the broker reported as already existing at create time
    pub already_exists: usize,
    /// Topics whose partition count was increased
    pub updated: usize,
    /// Topics already matching the declared partition count
    pub unchanged: usize,
    /// Topics declaring fewer partitions than they have
    pub cannot_scale_down: usize,
    /// Topics with a replication factor mismatch (warning only)
    pub replication_mismatches: usize,
    /// Topics that failed to create or update
    pub failures: Vec<TopicFailure>,
}

impl RunSummary {
    /// Number of failed topics
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Whether every create and update succeeded
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} already exist, {} updated, {} unchanged, {} cannot scale down, {} failed",
            self.created,
            self.already_exists,
            self.updated,
            self.unchanged,
            self.cannot_scale_down,
            self.failed()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replication_factor_uses_widest_replica_set() {
        let topic = TopicMetadata::new(
            "orders",
            vec![
                PartitionMetadata::new(0, vec![1]),
                PartitionMetadata::new(1, vec![1, 2, 3]),
                PartitionMetadata::new(2, vec![2, 3]),
            ],
        );

        assert_eq!(topic.partition_count(), 3);
        assert_eq!(topic.replication_factor(), 3);
    }

    #[test]
    fn test_replication_factor_without_partitions() {
        let topic = TopicMetadata::new("empty", vec![]);
        assert_eq!(topic.replication_factor(), 0);
    }

    #[test]
    fn test_uniform_metadata() {
        let topic = TopicMetadata::uniform("events", 4, &[1, 2]);
        assert_eq!(topic.partition_count(), 4);
        assert_eq!(topic.partitions[3].id, 3);
        assert_eq!(topic.partitions[3].leader, 1);
        assert_eq!(topic.replication_factor(), 2);
    }

    #[test]
    fn test_snapshot_lookup() {
        let snapshot = ClusterSnapshot::from_topics(vec![
            TopicMetadata::uniform("a", 1, &[1]),
            TopicMetadata::uniform("b", 2, &[1]),
        ]);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("b").map(|t| t.partition_count()), Some(2));
        assert!(snapshot.get("c").is_none());
    }

    #[test]
    fn test_summary_display() {
        let summary = RunSummary {
            created: 1,
            updated: 1,
            unchanged: 1,
            failures: vec![TopicFailure {
                name: "x".to_string(),
                reason: "policy violation".to_string(),
            }],
            ..Default::default()
        };

        assert!(!summary.is_success());
        assert_eq!(summary.failed(), 1);
        assert!(summary.to_string().contains("1 created"));
        assert!(summary.to_string().contains("1 failed"));
    }
}
