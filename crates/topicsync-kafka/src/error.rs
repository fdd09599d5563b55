//! Error types for the Kafka admin gateway

use thiserror::Error;

/// Errors raised while configuring or constructing the admin client.
///
/// Failures of individual admin calls are not represented here; those are
/// handed to the sync engine as [`topicsync_core::GatewayError`].
#[derive(Debug, Error)]
pub enum KafkaError {
    /// Configuration value is invalid
    #[error("Configuration invalid for {var}: {reason}")]
    ConfigInvalid { var: String, reason: String },

    /// librdkafka refused to build the client
    #[error("Failed to create admin client: {0}")]
    Client(#[from] rdkafka::error::KafkaError),
}

/// Result type for the Kafka gateway crate
pub type Result<T> = std::result::Result<T, KafkaError>;
