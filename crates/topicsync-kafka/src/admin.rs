//! Admin gateway over librdkafka
//!
//! Wraps an `rdkafka` [`AdminClient`] and translates between its result
//! types and the sync engine's gateway contract. Call-level failures become
//! [`GatewayError`]s with a kind derived from the librdkafka error code;
//! per-topic failures stay per-topic.

use crate::config::KafkaConfig;
use crate::error::Result;
use async_trait::async_trait;
use rdkafka::admin::{
    AdminClient, AdminOptions, NewPartitions, NewTopic, TopicReplication,
    TopicResult as RdTopicResult,
};
use rdkafka::client::DefaultClientContext;
use rdkafka::error::{KafkaError as RdKafkaError, RDKafkaErrorCode};
use rdkafka::metadata::Metadata;
use std::sync::Arc;
use std::time::Duration;
use topicsync_core::{
    AdminGateway, AdminRequestOptions, ClusterSnapshot, GatewayError, PartitionMetadata,
    TopicMetadata, TopicResult, TopicSpec, UpdateDirective,
};
use tracing::{debug, info, warn};

/// [`AdminGateway`] backed by a librdkafka admin client
#[derive(Clone)]
pub struct KafkaAdminGateway {
    client: Arc<AdminClient<DefaultClientContext>>,
}

impl KafkaAdminGateway {
    /// Build the admin client from connection settings.
    ///
    /// librdkafka connects lazily, so this succeeds even when no broker is
    /// reachable; connectivity problems surface on the first call.
    pub fn new(config: &KafkaConfig) -> Result<Self> {
        let client: AdminClient<DefaultClientContext> = config.to_client_config().create()?;

        info!(
            servers = %config.bootstrap_servers,
            protocol = %config.resolved_security_protocol(),
            "Admin client created"
        );

        Ok(Self {
            client: Arc::new(client),
        })
    }

    fn admin_options(options: &AdminRequestOptions) -> AdminOptions {
        AdminOptions::new().operation_timeout(Some(options.operation_timeout))
    }
}

#[async_trait]
impl AdminGateway for KafkaAdminGateway {
    async fn fetch_metadata(
        &self,
        timeout: Duration,
    ) -> std::result::Result<ClusterSnapshot, GatewayError> {
        let client = Arc::clone(&self.client);

        // librdkafka's metadata request blocks the calling thread
        let metadata = tokio::task::spawn_blocking(move || {
            client.inner().fetch_metadata(None, timeout)
        })
        .await
        .map_err(|e| GatewayError::terminal(format!("metadata task failed: {e}")))?
        .map_err(|e| classify_kafka_error(&e))?;

        let snapshot = snapshot_from_metadata(&metadata);
        debug!(
            topics = snapshot.len(),
            brokers = metadata.brokers().len(),
            "Fetched cluster metadata"
        );
        Ok(snapshot)
    }

    async fn create_topics(
        &self,
        specs: &[TopicSpec],
        options: &AdminRequestOptions,
    ) -> std::result::Result<Vec<TopicResult>, GatewayError> {
        let new_topics: Vec<NewTopic<'_>> = specs
            .iter()
            .map(|spec| {
                NewTopic::new(
                    &spec.name,
                    spec.partitions,
                    TopicReplication::Fixed(spec.replication_factor),
                )
            })
            .collect();

        let results = self
            .client
            .create_topics(new_topics.iter(), &Self::admin_options(options))
            .await
            .map_err(|e| classify_kafka_error(&e))?;

        Ok(results.into_iter().map(convert_topic_result).collect())
    }

    async fn increase_partitions(
        &self,
        directives: &[UpdateDirective],
        options: &AdminRequestOptions,
    ) -> std::result::Result<Vec<TopicResult>, GatewayError> {
        let mut new_partitions = Vec::with_capacity(directives.len());
        for directive in directives {
            let count = usize::try_from(directive.desired_partitions).map_err(|_| {
                GatewayError::terminal(format!(
                    "invalid partition count {} for topic '{}'",
                    directive.desired_partitions, directive.name
                ))
            })?;
            new_partitions.push(NewPartitions::new(&directive.name, count));
        }

        let results = self
            .client
            .create_partitions(new_partitions.iter(), &Self::admin_options(options))
            .await
            .map_err(|e| classify_kafka_error(&e))?;

        Ok(results.into_iter().map(convert_topic_result).collect())
    }
}

// ============================================================================
// Conversions
// ============================================================================

/// How a topic's metadata-level error code is treated
#[derive(Debug, Clone, PartialEq, Eq)]
enum TopicStatus {
    /// Fully described
    Described,
    /// The broker does not know the topic; it is left out of the snapshot
    Missing,
    /// Listed but not usable; kept with the broker's error attached
    Errored(String),
}

fn topic_status(code: Option<RDKafkaErrorCode>) -> TopicStatus {
    match code {
        None | Some(RDKafkaErrorCode::NoError) => TopicStatus::Described,
        Some(RDKafkaErrorCode::UnknownTopicOrPartition) => TopicStatus::Missing,
        Some(code) => TopicStatus::Errored(code.to_string()),
    }
}

fn snapshot_from_metadata(metadata: &Metadata) -> ClusterSnapshot {
    ClusterSnapshot::from_topics(metadata.topics().iter().filter_map(|topic| {
        let status = topic_status(topic.error().map(RDKafkaErrorCode::from));
        if status == TopicStatus::Missing {
            debug!(topic = %topic.name(), "Topic listed as unknown, treating as missing");
            return None;
        }

        let mut partitions: Vec<PartitionMetadata> = topic
            .partitions()
            .iter()
            .map(|p| PartitionMetadata {
                id: p.id(),
                leader: p.leader(),
                replicas: p.replicas().to_vec(),
                isr: p.isr().to_vec(),
            })
            .collect();
        partitions.sort_by_key(|p| p.id);

        let described = TopicMetadata::new(topic.name(), partitions);
        Some(match status {
            TopicStatus::Errored(error) => {
                warn!(topic = %topic.name(), error = %error, "Topic metadata returned an error");
                described.with_error(error)
            }
            _ => described,
        })
    }))
}

/// Map a per-topic admin result onto the gateway's result codes
fn convert_topic_result(result: RdTopicResult) -> TopicResult {
    match result {
        Ok(name) => TopicResult::success(name),
        Err((name, RDKafkaErrorCode::NoError)) => TopicResult::success(name),
        Err((name, RDKafkaErrorCode::TopicAlreadyExists)) => TopicResult::already_exists(name),
        Err((name, code)) => TopicResult::rejected(name, code.to_string()),
    }
}

/// Classify a call-level librdkafka failure.
///
/// Codes that mean "the broker could not be reached" are transient, auth and
/// argument errors are terminal, and everything else is left to the message
/// heuristic.
fn classify_kafka_error(error: &RdKafkaError) -> GatewayError {
    let message = error.to_string();

    match error.rdkafka_error_code() {
        Some(
            RDKafkaErrorCode::BrokerTransportFailure
            | RDKafkaErrorCode::AllBrokersDown
            | RDKafkaErrorCode::Resolve
            | RDKafkaErrorCode::OperationTimedOut
            | RDKafkaErrorCode::RequestTimedOut
            | RDKafkaErrorCode::NetworkException
            | RDKafkaErrorCode::BrokerNotAvailable,
        ) => GatewayError::transient(message),
        Some(
            RDKafkaErrorCode::InvalidArgument
            | RDKafkaErrorCode::Authentication
            | RDKafkaErrorCode::SaslAuthenticationFailed
            | RDKafkaErrorCode::ClusterAuthorizationFailed,
        ) => GatewayError::terminal(message),
        _ => GatewayError::unclassified(message),
    }
}
