//! Error types for topic synchronization

use crate::types::RunSummary;
use std::fmt;
use thiserror::Error;

/// How a gateway classifies its own failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Transient network-level failure, safe to retry
    Transient,
    /// Permanent failure, retrying will not help
    Terminal,
    /// The transport could not tell; the message heuristic decides
    Unclassified,
}

/// Failure of an Admin Gateway call as a whole (not a per-topic result)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: GatewayErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self {
            kind: GatewayErrorKind::Terminal,
            message: message.into(),
        }
    }

    pub fn unclassified(message: impl Into<String>) -> Self {
        Self {
            kind: GatewayErrorKind::Unclassified,
            message: message.into(),
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for GatewayError {}

/// Errors that can occur while loading desired state or syncing topics
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed desired-state record
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Caller contract violation (e.g. a malformed snapshot)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Gateway call failed at the connection level
    #[error("Failed to {operation} on attempt {attempt}: {source}")]
    Gateway {
        operation: &'static str,
        attempt: u32,
        #[source]
        source: GatewayError,
    },

    /// Cluster metadata could not be fetched
    #[error("Failed to fetch cluster metadata: {0}")]
    Metadata(#[source] GatewayError),

    /// The broker rejected an operation for a single topic
    #[error("Broker rejected {operation} for topic '{topic}': {reason}")]
    TopicRejected {
        operation: &'static str,
        topic: String,
        reason: String,
    },

    /// The run was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// One or more topics failed; the summary itemizes what succeeded
    #[error("Topic sync failed: {failed} of {total} topics could not be applied ({summary})")]
    SyncFailed {
        failed: usize,
        total: usize,
        summary: Box<RunSummary>,
    },

    /// IO error while reading the desired-state file
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Desired-state file is not valid YAML for the expected schema
    #[error("Failed to parse {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Result type for topic synchronization
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Whether this error came from a cancellation request
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Whether the underlying gateway failure is worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Gateway { source, .. } | Error::Metadata(source) => {
                crate::retry::is_retryable(Some(source))
            }
            _ => false,
        }
    }

    /// The run summary attached to a partial failure, if any
    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            Error::SyncFailed { summary, .. } => Some(&**summary),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Gateway {
            operation: "create topics",
            attempt: 2,
            source: GatewayError::transient("connection refused"),
        };
        assert_eq!(
            err.to_string(),
            "Failed to create topics on attempt 2: connection refused"
        );

        let err = Error::TopicRejected {
            operation: "partition increase",
            topic: "orders".to_string(),
            reason: "policy violation".to_string(),
        };
        assert!(err.to_string().contains("orders"));
        assert!(err.to_string().contains("policy violation"));
    }

    #[test]
    fn test_retryable_errors() {
        let err = Error::Gateway {
            operation: "create topics",
            attempt: 1,
            source: GatewayError::unclassified("Broker: timeout"),
        };
        assert!(err.is_retryable());

        let err = Error::Metadata(GatewayError::terminal("authentication failed"));
        assert!(!err.is_retryable());

        assert!(!Error::InvalidInput("empty name".to_string()).is_retryable());
        assert!(!Error::Cancelled.is_retryable());
    }

    #[test]
    fn test_cancelled() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::InvalidArgument("x".to_string()).is_cancelled());
    }

    #[test]
    fn test_sync_failed_carries_summary() {
        let summary = RunSummary {
            created: 2,
            ..Default::default()
        };
        let err = Error::SyncFailed {
            failed: 1,
            total: 3,
            summary: Box::new(summary),
        };
        assert_eq!(err.summary().map(|s| s.created), Some(2));
        assert!(err.to_string().contains("1 of 3"));
    }
}
