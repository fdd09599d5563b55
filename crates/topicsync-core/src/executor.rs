//! Execution layer: applies planned creates and partition increases
//!
//! # Create path
//!
//! The whole batch goes out in one gateway call. Only a failure of the call
//! itself (connection level) is retried, with a linear `attempt × unit`
//! backoff, up to `max_attempts` calls in total. Once the call succeeds, each
//! per-topic result is inspected on its own: success counts as created,
//! "already exists" is benign, anything else is a failure for that topic
//! that never stops its siblings and is never retried.
//!
//! # Partition-increase path
//!
//! Single shot, one directive per call, no retry.
//!
//! Cancellation is cooperative: the token is checked before every gateway
//! call and races every backoff sleep. In-flight calls are not interrupted.

use crate::error::{Error, GatewayError, Result};
use crate::gateway::{AdminGateway, AdminRequestOptions};
use crate::report::{SyncEvent, SyncReporter};
use crate::retry::is_retryable;
use crate::types::{ResultCode, TopicFailure, TopicResult, TopicSpec, UpdateDirective};
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the execution layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Total number of create attempts (first call included)
    pub max_attempts: u32,
    /// Backoff unit; the wait after attempt `n` is `n × backoff_unit`
    pub backoff_unit: Duration,
    /// Timeout forwarded to admin requests
    pub operation_timeout: Duration,
    /// Timeout for the metadata fetch
    pub metadata_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff_unit: Duration::from_secs(1),
            operation_timeout: Duration::from_secs(30),
            metadata_timeout: Duration::from_secs(10),
        }
    }
}

impl ExecutorConfig {
    /// Create a new builder
    pub fn builder() -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::default()
    }

    /// Backoff before the attempt following `attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(attempt)
    }

    fn request_options(&self) -> AdminRequestOptions {
        AdminRequestOptions {
            operation_timeout: self.operation_timeout,
        }
    }
}

/// Builder for ExecutorConfig
#[derive(Default)]
pub struct ExecutorConfigBuilder {
    config: ExecutorConfig,
}

impl ExecutorConfigBuilder {
    /// Set the total number of create attempts (at least 1)
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts.max(1);
        self
    }

    /// Set the linear backoff unit
    pub fn backoff_unit(mut self, unit: Duration) -> Self {
        self.config.backoff_unit = unit;
        self
    }

    /// Set the admin operation timeout
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.config.operation_timeout = timeout;
        self
    }

    /// Set the metadata fetch timeout
    pub fn metadata_timeout(mut self, timeout: Duration) -> Self {
        self.config.metadata_timeout = timeout;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ExecutorConfig {
        self.config
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Per-topic outcome of a create batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOutcome {
    /// Gateway calls made (including the successful one)
    pub attempts: u32,
    pub created: Vec<String>,
    pub already_exists: Vec<String>,
    pub failed: Vec<TopicFailure>,
}

impl CreateOutcome {
    /// Whether no topic in the batch failed
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

// ============================================================================
// Executor
// ============================================================================

/// Applies create and partition-increase operations through a gateway
pub struct Executor<'a, G: ?Sized> {
    gateway: &'a G,
    config: &'a ExecutorConfig,
    reporter: &'a dyn SyncReporter,
    cancel: &'a CancellationToken,
}

impl<'a, G: AdminGateway + ?Sized> Executor<'a, G> {
    pub fn new(
        gateway: &'a G,
        config: &'a ExecutorConfig,
        reporter: &'a dyn SyncReporter,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            gateway,
            config,
            reporter,
            cancel,
        }
    }

    /// Create a batch of topics with bounded retry on connection failures
    #[instrument(skip(self, specs), fields(topics = specs.len()))]
    pub async fn create_topics(&self, specs: &[TopicSpec]) -> Result<CreateOutcome> {
        if specs.is_empty() {
            return Ok(CreateOutcome::default());
        }

        let max_attempts = self.config.max_attempts.max(1);
        let options = self.config.request_options();
        let mut attempt = 0;

        let results = loop {
            attempt += 1;

            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            self.reporter.report(&SyncEvent::CreateAttempt {
                attempt,
                max_attempts,
                topics: specs.len(),
            });

            match self.gateway.create_topics(specs, &options).await {
                Ok(results) => break results,
                Err(e) => {
                    warn!(attempt, error = %e, "Create topics call failed");

                    if attempt < max_attempts && is_retryable(Some(&e)) {
                        let delay = self.config.backoff(attempt);
                        self.reporter.report(&SyncEvent::RetryScheduled {
                            attempt,
                            delay,
                            error: e.to_string(),
                        });
                        metrics::counter!("topicsync_create_retries_total").increment(1);

                        tokio::select! {
                            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                            _ = tokio::time::sleep(delay) => {}
                        }
                        continue;
                    }

                    return Err(Error::Gateway {
                        operation: "create topics",
                        attempt,
                        source: e,
                    });
                }
            }
        };

        Ok(self.classify_create_results(specs, results, attempt))
    }

    /// Sort per-topic results into created / already-exists / failed
    fn classify_create_results(
        &self,
        specs: &[TopicSpec],
        results: Vec<TopicResult>,
        attempts: u32,
    ) -> CreateOutcome {
        let mut outcome = CreateOutcome {
            attempts,
            ..Default::default()
        };

        let requested: HashSet<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        let mut answered: HashSet<&str> = HashSet::with_capacity(specs.len());

        for result in &results {
            if !requested.contains(result.name.as_str()) {
                debug!(topic = %result.name, "Ignoring result for a topic that was not requested");
                continue;
            }
            if !answered.insert(result.name.as_str()) {
                debug!(topic = %result.name, "Ignoring duplicate result");
                continue;
            }

            match &result.code {
                ResultCode::Success => {
                    self.reporter.report(&SyncEvent::TopicCreated {
                        name: result.name.clone(),
                    });
                    outcome.created.push(result.name.clone());
                }
                ResultCode::TopicAlreadyExists => {
                    self.reporter.report(&SyncEvent::TopicAlreadyExists {
                        name: result.name.clone(),
                    });
                    outcome.already_exists.push(result.name.clone());
                }
                ResultCode::Rejected(reason) => {
                    self.reporter.report(&SyncEvent::TopicCreateFailed {
                        name: result.name.clone(),
                        reason: reason.clone(),
                    });
                    outcome.failed.push(TopicFailure {
                        name: result.name.clone(),
                        reason: reason.clone(),
                    });
                }
            }
        }

        // A requested topic the broker did not answer for cannot be assumed created.
        for spec in specs {
            if !answered.contains(spec.name.as_str()) {
                let reason = "no result returned by broker".to_string();
                self.reporter.report(&SyncEvent::TopicCreateFailed {
                    name: spec.name.clone(),
                    reason: reason.clone(),
                });
                outcome.failed.push(TopicFailure {
                    name: spec.name.clone(),
                    reason,
                });
            }
        }

        debug!(
            created = outcome.created.len(),
            already_exists = outcome.already_exists.len(),
            failed = outcome.failed.len(),
            "Create batch classified"
        );

        outcome
    }

    /// Grow one topic's partition count. Single shot; any non-success result
    /// code is terminal for this topic.
    #[instrument(skip(self, directive), fields(topic = %directive.name, to = directive.desired_partitions))]
    pub async fn increase_partitions(&self, directive: &UpdateDirective) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let options = self.config.request_options();
        let results = self
            .gateway
            .increase_partitions(std::slice::from_ref(directive), &options)
            .await
            .map_err(|e: GatewayError| Error::Gateway {
                operation: "increase partitions",
                attempt: 1,
                source: e,
            })?;

        let code = results
            .into_iter()
            .find(|r| r.name == directive.name)
            .map(|r| r.code)
            .unwrap_or_else(|| ResultCode::Rejected("no result returned by broker".to_string()));

        match code {
            ResultCode::Success => Ok(()),
            other => Err(Error::TopicRejected {
                operation: "partition increase",
                topic: directive.name.clone(),
                reason: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::NoopReporter;
    use crate::types::ClusterSnapshot;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Gateway that replays scripted create responses
    struct ScriptedGateway {
        create_responses: Mutex<VecDeque<std::result::Result<Vec<TopicResult>, GatewayError>>>,
        increase_response: std::result::Result<Vec<TopicResult>, GatewayError>,
        create_calls: AtomicU32,
        increase_calls: AtomicU32,
    }

    impl ScriptedGateway {
        fn new(
            create_responses: Vec<std::result::Result<Vec<TopicResult>, GatewayError>>,
        ) -> Self {
            Self {
                create_responses: Mutex::new(create_responses.into()),
                increase_response: Ok(vec![]),
                create_calls: AtomicU32::new(0),
                increase_calls: AtomicU32::new(0),
            }
        }

        fn with_increase_response(
            mut self,
            response: std::result::Result<Vec<TopicResult>, GatewayError>,
        ) -> Self {
            self.increase_response = response;
            self
        }
    }

    #[async_trait]
    impl AdminGateway for ScriptedGateway {
        async fn fetch_metadata(
            &self,
            _timeout: Duration,
        ) -> std::result::Result<ClusterSnapshot, GatewayError> {
            Ok(ClusterSnapshot::new())
        }

        async fn create_topics(
            &self,
            _specs: &[TopicSpec],
            _options: &AdminRequestOptions,
        ) -> std::result::Result<Vec<TopicResult>, GatewayError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            self.create_responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GatewayError::terminal("script exhausted")))
        }

        async fn increase_partitions(
            &self,
            _directives: &[UpdateDirective],
            _options: &AdminRequestOptions,
        ) -> std::result::Result<Vec<TopicResult>, GatewayError> {
            self.increase_calls.fetch_add(1, Ordering::SeqCst);
            self.increase_response.clone()
        }
    }

    fn directive(name: &str, from: i32, to: i32) -> UpdateDirective {
        UpdateDirective {
            name: name.to_string(),
            current_partitions: from,
            desired_partitions: to,
        }
    }

    #[test]
    fn test_config_builder() {
        let config = ExecutorConfig::builder()
            .max_attempts(5)
            .backoff_unit(Duration::from_millis(250))
            .operation_timeout(Duration::from_secs(5))
            .metadata_timeout(Duration::from_secs(3))
            .build();

        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.backoff_unit, Duration::from_millis(250));
        assert_eq!(config.operation_timeout, Duration::from_secs(5));
        assert_eq!(config.metadata_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_default_config() {
        let config = ExecutorConfig::default();
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.backoff_unit, Duration::from_secs(1));
    }

    #[test]
    fn test_linear_backoff() {
        let config = ExecutorConfig::default();
        assert_eq!(config.backoff(1), Duration::from_secs(1));
        assert_eq!(config.backoff(2), Duration::from_secs(2));
        assert_eq!(config.backoff(3), Duration::from_secs(3));
    }

    #[test]
    fn test_max_attempts_floor() {
        let config = ExecutorConfig::builder().max_attempts(0).build();
        assert_eq!(config.max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_then_success() {
        let gateway = ScriptedGateway::new(vec![
            Err(GatewayError::unclassified("dial tcp: connection refused")),
            Ok(vec![TopicResult::success("orders")]),
        ]);
        let config = ExecutorConfig::default();
        let cancel = CancellationToken::new();
        let executor = Executor::new(&gateway, &config, &NoopReporter, &cancel);

        let outcome = executor
            .create_topics(&[TopicSpec::new("orders", 3, 1)])
            .await
            .unwrap();

        assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.created, vec!["orders".to_string()]);
        assert!(outcome.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_ceiling() {
        let gateway = ScriptedGateway::new(vec![
            Err(GatewayError::unclassified("connection reset by peer")),
            Err(GatewayError::unclassified("connection reset by peer")),
            Err(GatewayError::unclassified("connection reset by peer")),
        ]);
        let config = ExecutorConfig::default();
        let cancel = CancellationToken::new();
        let executor = Executor::new(&gateway, &config, &NoopReporter, &cancel);

        let err = executor
            .create_topics(&[TopicSpec::new("orders", 3, 1)])
            .await
            .unwrap_err();

        assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 2);
        assert!(matches!(err, Error::Gateway { attempt: 2, .. }));
    }

    #[tokio::test]
    async fn test_terminal_error_is_not_retried() {
        let gateway = ScriptedGateway::new(vec![
            Err(GatewayError::unclassified("invalid configuration")),
            Ok(vec![TopicResult::success("orders")]),
        ]);
        let config = ExecutorConfig::default();
        let cancel = CancellationToken::new();
        let executor = Executor::new(&gateway, &config, &NoopReporter, &cancel);

        let err = executor
            .create_topics(&[TopicSpec::new("orders", 3, 1)])
            .await
            .unwrap_err();

        assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, Error::Gateway { attempt: 1, .. }));
    }

    #[tokio::test]
    async fn test_per_topic_results_are_classified_independently() {
        let gateway = ScriptedGateway::new(vec![Ok(vec![
            TopicResult::success("new"),
            TopicResult::already_exists("old"),
            TopicResult::rejected("bad", "Broker: Invalid replication factor"),
        ])]);
        let config = ExecutorConfig::default();
        let cancel = CancellationToken::new();
        let executor = Executor::new(&gateway, &config, &NoopReporter, &cancel);

        let outcome = executor
            .create_topics(&[
                TopicSpec::new("new", 1, 1),
                TopicSpec::new("old", 1, 1),
                TopicSpec::new("bad", 1, 9),
            ])
            .await
            .unwrap();

        // Per-topic failures are not retried.
        assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.created, vec!["new".to_string()]);
        assert_eq!(outcome.already_exists, vec!["old".to_string()]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].name, "bad");
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_missing_result_counts_as_failure() {
        let gateway = ScriptedGateway::new(vec![Ok(vec![TopicResult::success("a")])]);
        let config = ExecutorConfig::default();
        let cancel = CancellationToken::new();
        let executor = Executor::new(&gateway, &config, &NoopReporter, &cancel);

        let outcome = executor
            .create_topics(&[TopicSpec::new("a", 1, 1), TopicSpec::new("b", 1, 1)])
            .await
            .unwrap();

        assert_eq!(outcome.created, vec!["a".to_string()]);
        assert_eq!(outcome.failed[0].name, "b");
    }

    #[tokio::test]
    async fn test_duplicate_and_unrequested_results_are_ignored() {
        let gateway = ScriptedGateway::new(vec![Ok(vec![
            TopicResult::success("a"),
            TopicResult::success("a"),
            TopicResult::success("stray"),
            TopicResult::already_exists("b"),
        ])]);
        let config = ExecutorConfig::default();
        let cancel = CancellationToken::new();
        let executor = Executor::new(&gateway, &config, &NoopReporter, &cancel);

        let outcome = executor
            .create_topics(&[TopicSpec::new("a", 1, 1), TopicSpec::new("b", 1, 1)])
            .await
            .unwrap();

        assert_eq!(outcome.created, vec!["a".to_string()]);
        assert_eq!(outcome.already_exists, vec!["b".to_string()]);
        assert!(outcome.failed.is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_skips_gateway() {
        let gateway = ScriptedGateway::new(vec![]);
        let config = ExecutorConfig::default();
        let cancel = CancellationToken::new();
        let executor = Executor::new(&gateway, &config, &NoopReporter, &cancel);

        let outcome = executor.create_topics(&[]).await.unwrap();

        assert_eq!(outcome, CreateOutcome::default());
        assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_call() {
        let gateway = ScriptedGateway::new(vec![Ok(vec![TopicResult::success("a")])]);
        let config = ExecutorConfig::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let executor = Executor::new(&gateway, &config, &NoopReporter, &cancel);

        let err = executor
            .create_topics(&[TopicSpec::new("a", 1, 1)])
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_aborts_retry() {
        let gateway = ScriptedGateway::new(vec![
            Err(GatewayError::transient("all brokers down")),
            Ok(vec![TopicResult::success("a")]),
        ]);
        let config = ExecutorConfig::builder()
            .backoff_unit(Duration::from_secs(60))
            .build();
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            canceller.cancel();
        });

        let executor = Executor::new(&gateway, &config, &NoopReporter, &cancel);
        let err = executor
            .create_topics(&[TopicSpec::new("a", 1, 1)])
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_increase_partitions_success() {
        let gateway =
            ScriptedGateway::new(vec![]).with_increase_response(Ok(vec![TopicResult::success("a")]));
        let config = ExecutorConfig::default();
        let cancel = CancellationToken::new();
        let executor = Executor::new(&gateway, &config, &NoopReporter, &cancel);

        executor
            .increase_partitions(&directive("a", 1, 3))
            .await
            .unwrap();
        assert_eq!(gateway.increase_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_increase_partitions_rejected() {
        let gateway = ScriptedGateway::new(vec![]).with_increase_response(Ok(vec![
            TopicResult::rejected("a", "Broker: Invalid partitions"),
        ]));
        let config = ExecutorConfig::default();
        let cancel = CancellationToken::new();
        let executor = Executor::new(&gateway, &config, &NoopReporter, &cancel);

        let err = executor
            .increase_partitions(&directive("a", 1, 3))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::TopicRejected { ref topic, .. } if topic == "a"));
    }

    #[tokio::test]
    async fn test_increase_partitions_cancelled_before_call() {
        let gateway =
            ScriptedGateway::new(vec![]).with_increase_response(Ok(vec![TopicResult::success("a")]));
        let config = ExecutorConfig::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let executor = Executor::new(&gateway, &config, &NoopReporter, &cancel);

        let err = executor
            .increase_partitions(&directive("a", 1, 3))
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(gateway.increase_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_increase_partitions_is_single_shot() {
        let gateway = ScriptedGateway::new(vec![])
            .with_increase_response(Err(GatewayError::transient("connection refused")));
        let config = ExecutorConfig::default();
        let cancel = CancellationToken::new();
        let executor = Executor::new(&gateway, &config, &NoopReporter, &cancel);

        let err = executor
            .increase_partitions(&directive("a", 1, 3))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Gateway { .. }));
        assert_eq!(gateway.increase_calls.load(Ordering::SeqCst), 1);
    }
}
