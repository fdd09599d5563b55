//! Admin Gateway abstraction
//!
//! The gateway is the only thing that talks to the broker. The surrounding
//! application builds it (connection, TLS, SASL) and hands it to the
//! synchronizer; the engine never knows which transport sits behind it.

use crate::error::GatewayError;
use crate::types::{ClusterSnapshot, TopicResult, TopicSpec, UpdateDirective};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Options forwarded to batch admin requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminRequestOptions {
    /// How long the broker may take to complete the operation
    pub operation_timeout: Duration,
}

impl Default for AdminRequestOptions {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(30),
        }
    }
}

/// Broker administration capabilities required by the synchronizer
#[async_trait]
pub trait AdminGateway: Send + Sync {
    /// Fetch metadata for every topic in the cluster in a single call
    async fn fetch_metadata(&self, timeout: Duration) -> Result<ClusterSnapshot, GatewayError>;

    /// Create topics; returns one result per requested topic
    async fn create_topics(
        &self,
        specs: &[TopicSpec],
        options: &AdminRequestOptions,
    ) -> Result<Vec<TopicResult>, GatewayError>;

    /// Grow partition counts; returns one result per directive
    async fn increase_partitions(
        &self,
        directives: &[UpdateDirective],
        options: &AdminRequestOptions,
    ) -> Result<Vec<TopicResult>, GatewayError>;
}

#[async_trait]
impl<G: AdminGateway + ?Sized> AdminGateway for Arc<G> {
    async fn fetch_metadata(&self, timeout: Duration) -> Result<ClusterSnapshot, GatewayError> {
        (**self).fetch_metadata(timeout).await
    }

    async fn create_topics(
        &self,
        specs: &[TopicSpec],
        options: &AdminRequestOptions,
    ) -> Result<Vec<TopicResult>, GatewayError> {
        (**self).create_topics(specs, options).await
    }

    async fn increase_partitions(
        &self,
        directives: &[UpdateDirective],
        options: &AdminRequestOptions,
    ) -> Result<Vec<TopicResult>, GatewayError> {
        (**self).increase_partitions(directives, options).await
    }
}
