//! Top-level sync orchestration
//!
//! One pass: validate desired state, fetch a snapshot, classify, report the
//! informational findings, create missing topics, grow partition counts, and
//! summarize. The pass runs on a single logical thread of control; no two
//! broker calls are ever in flight at the same time.

use crate::config::validate_specs;
use crate::error::{Error, Result};
use crate::executor::{Executor, ExecutorConfig};
use crate::gateway::AdminGateway;
use crate::reconcile::reconcile;
use crate::report::{SyncEvent, SyncReporter, TracingReporter};
use crate::types::{RunSummary, TopicFailure, TopicSpec};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Metrics recorded by the synchronizer
#[derive(Clone)]
pub struct SyncMetrics {
    /// Counter for sync runs
    pub runs: metrics::Counter,
    /// Counter for created topics
    pub created: metrics::Counter,
    /// Counter for topics whose partition count was increased
    pub updated: metrics::Counter,
    /// Counter for topics that failed to create or update
    pub failures: metrics::Counter,
    /// Histogram for sync duration
    pub duration: metrics::Histogram,
}

impl SyncMetrics {
    /// Create new sync metrics
    pub fn new() -> Self {
        Self {
            runs: metrics::counter!("topicsync_sync_runs_total"),
            created: metrics::counter!("topicsync_topics_created_total"),
            updated: metrics::counter!("topicsync_topics_updated_total"),
            failures: metrics::counter!("topicsync_topic_failures_total"),
            duration: metrics::histogram!("topicsync_sync_duration_seconds"),
        }
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Converges cluster topics toward a declared list
pub struct TopicSynchronizer<G> {
    gateway: G,
    config: ExecutorConfig,
    reporter: Arc<dyn SyncReporter>,
    metrics: Option<SyncMetrics>,
}

impl<G: AdminGateway> TopicSynchronizer<G> {
    /// Create a synchronizer with default configuration and a tracing reporter
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            config: ExecutorConfig::default(),
            reporter: Arc::new(TracingReporter),
            metrics: Some(SyncMetrics::new()),
        }
    }

    /// Use a custom execution configuration
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Send progress events to a custom reporter
    pub fn with_reporter(mut self, reporter: Arc<dyn SyncReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Disable metrics recording
    pub fn without_metrics(mut self) -> Self {
        self.metrics = None;
        self
    }

    /// Run one reconciliation pass.
    ///
    /// Returns the summary when every create and update succeeded. When any
    /// topic failed, returns [`Error::SyncFailed`] carrying the itemized
    /// summary. Connection-level failures that exhaust retries abort the pass
    /// with [`Error::Gateway`]; cancellation yields [`Error::Cancelled`]. A
    /// cancel between partition increases still emits the partial summary.
    #[instrument(skip(self, desired, cancel), fields(topics = desired.len()))]
    pub async fn sync(
        &self,
        desired: &[TopicSpec],
        cancel: &CancellationToken,
    ) -> Result<RunSummary> {
        let start = Instant::now();

        if let Some(ref metrics) = self.metrics {
            metrics.runs.increment(1);
        }

        let result = self.run(desired, cancel).await;

        if let Some(ref metrics) = self.metrics {
            metrics.duration.record(start.elapsed().as_secs_f64());
        }

        result
    }

    async fn run(&self, desired: &[TopicSpec], cancel: &CancellationToken) -> Result<RunSummary> {
        validate_specs(desired)?;

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let snapshot = self
            .gateway
            .fetch_metadata(self.config.metadata_timeout)
            .await
            .map_err(Error::Metadata)?;
        self.reporter.report(&SyncEvent::SnapshotFetched {
            topics: snapshot.len(),
        });

        let plan = reconcile(desired, &snapshot)?;

        for classification in &plan.classifications {
            self.reporter
                .report(&SyncEvent::Planned(classification.clone()));
        }

        // Informational findings go out before any mutating call so they are
        // visible even when execution fails.
        for mismatch in &plan.replication_mismatches {
            self.reporter
                .report(&SyncEvent::ReplicationMismatch(mismatch.clone()));
        }
        for report in &plan.cannot_scale_down {
            self.reporter
                .report(&SyncEvent::ScaleDownRefused(report.clone()));
        }

        if !plan.has_work() {
            info!("Cluster already matches the declared topics");
        }

        info!(
            create = plan.to_create.len(),
            update = plan.to_update.len(),
            unchanged = plan.unchanged,
            cannot_scale_down = plan.cannot_scale_down.len(),
            "Reconciliation plan computed"
        );

        let mut summary = RunSummary {
            unchanged: plan.unchanged,
            cannot_scale_down: plan.cannot_scale_down.len(),
            replication_mismatches: plan.replication_mismatches.len(),
            ..Default::default()
        };

        let executor = Executor::new(&self.gateway, &self.config, self.reporter.as_ref(), cancel);

        let created = executor.create_topics(&plan.to_create).await?;
        summary.created = created.created.len();
        summary.already_exists = created.already_exists.len();
        summary.failures.extend(created.failed);

        for directive in &plan.to_update {
            match executor.increase_partitions(directive).await {
                Ok(()) => {
                    self.reporter.report(&SyncEvent::PartitionsIncreased {
                        name: directive.name.clone(),
                        from: directive.current_partitions,
                        to: directive.desired_partitions,
                    });
                    summary.updated += 1;
                }
                Err(Error::Cancelled) => {
                    // Report what was applied before the cancel
                    self.finish(&summary);
                    return Err(Error::Cancelled);
                }
                Err(e) => {
                    let reason = match &e {
                        Error::TopicRejected { reason, .. } => reason.clone(),
                        other => other.to_string(),
                    };
                    self.reporter.report(&SyncEvent::PartitionIncreaseFailed {
                        name: directive.name.clone(),
                        reason: reason.clone(),
                    });
                    summary.failures.push(TopicFailure {
                        name: directive.name.clone(),
                        reason,
                    });
                }
            }
        }

        self.finish(&summary);

        if summary.is_success() {
            Ok(summary)
        } else {
            warn!(failed = summary.failed(), "Topic sync finished with failures");
            Err(Error::SyncFailed {
                failed: summary.failed(),
                total: desired.len(),
                summary: Box::new(summary),
            })
        }
    }

    fn finish(&self, summary: &RunSummary) {
        if let Some(ref metrics) = self.metrics {
            metrics.created.increment(summary.created as u64);
            metrics.updated.increment(summary.updated as u64);
            metrics.failures.increment(summary.failed() as u64);
        }

        self.reporter.report(&SyncEvent::Completed(summary.clone()));
    }
}
