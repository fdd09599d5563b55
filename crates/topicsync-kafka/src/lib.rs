//! # topicsync-kafka
//!
//! [`AdminGateway`](topicsync_core::AdminGateway) implementation for Apache
//! Kafka and Kafka-compatible brokers, built on librdkafka.
//!
//! ```rust,ignore
//! use topicsync_kafka::{KafkaAdminGateway, KafkaConfig};
//!
//! let config = KafkaConfig::builder()
//!     .bootstrap_servers("broker:9092")
//!     .build()?;
//! let gateway = KafkaAdminGateway::new(&config)?;
//! ```

pub mod admin;
pub mod config;
pub mod error;

pub use admin::KafkaAdminGateway;
pub use config::{
    resolve_security_protocol, ConnectionSummary, KafkaConfig, KafkaConfigBuilder,
    SecurityProtocol,
};
pub use error::{KafkaError, Result};
