//! Reconciliation engine
//!
//! Compares the desired topic list against a cluster snapshot and decides,
//! per topic, what (if anything) has to happen. Pure: no I/O beyond the
//! snapshot that was already fetched, and the snapshot is never refreshed
//! during a run.
//!
//! | Broker state                  | Classification         |
//! |-------------------------------|------------------------|
//! | topic missing                 | `Create`               |
//! | fewer partitions than desired | `IncreasePartitions`   |
//! | more partitions than desired  | `CannotScaleDown`      |
//! | same partition count          | `Unchanged`            |
//!
//! Replication factor differences are collected on the side as warnings and
//! never change the classification. A desired topic whose snapshot entry has
//! no partitions or carries a broker error is a malformed snapshot.

use crate::error::{Error, Result};
use crate::types::{
    ClusterSnapshot, ReplicationMismatch, ScaleDownReport, TopicMetadata, TopicSpec,
    UpdateDirective,
};
use std::cmp::Ordering;
use tracing::debug;

/// What the engine decided for a single desired topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No topic with this name exists
    Create(TopicSpec),
    /// Topic exists with fewer partitions than desired
    IncreasePartitions(UpdateDirective),
    /// Topic exists with more partitions than desired; nothing is executed
    CannotScaleDown(ScaleDownReport),
    /// Topic exists with the desired partition count
    Unchanged { name: String, partitions: i32 },
}

impl Classification {
    /// Name of the classified topic
    pub fn topic(&self) -> &str {
        match self {
            Classification::Create(spec) => &spec.name,
            Classification::IncreasePartitions(d) => &d.name,
            Classification::CannotScaleDown(r) => &r.name,
            Classification::Unchanged { name, .. } => name,
        }
    }
}

/// Work lists produced by a reconciliation pass, each in desired-list order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Every classification, one per desired topic
    pub classifications: Vec<Classification>,
    /// Topics to create
    pub to_create: Vec<TopicSpec>,
    /// Topics whose partition count must grow
    pub to_update: Vec<UpdateDirective>,
    /// Topics asking for a partition decrease (reported only)
    pub cannot_scale_down: Vec<ScaleDownReport>,
    /// Topics already at the desired partition count
    pub unchanged: usize,
    /// Replication factor differences (warnings only)
    pub replication_mismatches: Vec<ReplicationMismatch>,
}

impl ReconcilePlan {
    /// Whether the plan requires any mutating broker call
    pub fn has_work(&self) -> bool {
        !self.to_create.is_empty() || !self.to_update.is_empty()
    }
}

/// Classify one desired topic against the snapshot
pub fn classify(spec: &TopicSpec, snapshot: &ClusterSnapshot) -> Classification {
    let existing = match snapshot.get(&spec.name) {
        Some(existing) => existing,
        None => return Classification::Create(spec.clone()),
    };

    let current = existing.partition_count();
    match spec.partitions.cmp(&current) {
        Ordering::Greater => Classification::IncreasePartitions(UpdateDirective {
            name: spec.name.clone(),
            current_partitions: current,
            desired_partitions: spec.partitions,
        }),
        Ordering::Less => Classification::CannotScaleDown(ScaleDownReport {
            name: spec.name.clone(),
            current_partitions: current,
            desired_partitions: spec.partitions,
        }),
        Ordering::Equal => Classification::Unchanged {
            name: spec.name.clone(),
            partitions: current,
        },
    }
}

/// Detect a replication factor difference for an existing topic
pub fn replication_mismatch(
    spec: &TopicSpec,
    snapshot: &ClusterSnapshot,
) -> Option<ReplicationMismatch> {
    let existing = snapshot.get(&spec.name)?;
    let current = existing.replication_factor();

    // A topic without partitions carries no replica information.
    if current == 0 || current == spec.replication_factor {
        return None;
    }

    Some(ReplicationMismatch {
        name: spec.name.clone(),
        current_replication: current,
        desired_replication: spec.replication_factor,
    })
}

/// A described topic must carry partitions and no broker error
fn check_usable(topic: &TopicMetadata) -> Result<()> {
    if let Some(ref error) = topic.error {
        return Err(Error::InvalidArgument(format!(
            "cluster snapshot has no usable metadata for topic '{}': {}",
            topic.name, error
        )));
    }
    if topic.partitions.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "cluster snapshot lists topic '{}' without partitions",
            topic.name
        )));
    }
    Ok(())
}

/// Compute the diff between desired and actual topic state
pub fn reconcile(desired: &[TopicSpec], snapshot: &ClusterSnapshot) -> Result<ReconcilePlan> {
    if let Some(bad) = snapshot.topics().find(|t| t.name.is_empty()) {
        return Err(Error::InvalidArgument(format!(
            "cluster snapshot contains a topic without a name ({} partitions)",
            bad.partition_count()
        )));
    }

    let mut plan = ReconcilePlan::default();

    for spec in desired {
        if let Some(existing) = snapshot.get(&spec.name) {
            check_usable(existing)?;
        }

        let classification = classify(spec, snapshot);

        match &classification {
            Classification::Create(spec) => {
                debug!(topic = %spec.name, partitions = spec.partitions, "Topic missing, will create");
                plan.to_create.push(spec.clone());
            }
            Classification::IncreasePartitions(directive) => {
                debug!(
                    topic = %directive.name,
                    current = directive.current_partitions,
                    desired = directive.desired_partitions,
                    "Topic needs more partitions"
                );
                plan.to_update.push(directive.clone());
            }
            Classification::CannotScaleDown(report) => {
                debug!(
                    topic = %report.name,
                    current = report.current_partitions,
                    desired = report.desired_partitions,
                    "Partition count cannot be decreased"
                );
                plan.cannot_scale_down.push(report.clone());
            }
            Classification::Unchanged { name, partitions } => {
                debug!(topic = %name, partitions, "Topic already up to date");
                plan.unchanged += 1;
            }
        }

        if let Some(mismatch) = replication_mismatch(spec, snapshot) {
            debug!(
                topic = %mismatch.name,
                current = mismatch.current_replication,
                desired = mismatch.desired_replication,
                "Replication factor differs; replication changes are not applied"
            );
            plan.replication_mismatches.push(mismatch);
        }

        plan.classifications.push(classification);
    }

    Ok(plan)
}
