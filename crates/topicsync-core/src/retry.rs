//! Retry classification for gateway failures
//!
//! Gateways that can tell transient from terminal failures say so through
//! [`GatewayErrorKind`]. Only [`GatewayErrorKind::Unclassified`] errors fall
//! back to matching the lower-cased message against known network-level
//! phrases. The fallback is conservative: transient failures worded
//! differently by a transport are not retried.

use crate::error::{GatewayError, GatewayErrorKind};

/// Message fragments that mark a network-level, transient failure
const RETRYABLE_MESSAGES: &[&str] = &[
    "connection refused",
    "connection closed",
    "timeout",
    "network is unreachable",
    "network unreachable",
    "no such host",
    "connection reset by peer",
    "broken pipe",
];

/// Determine if a gateway error should trigger a retry
pub fn is_retryable(error: Option<&GatewayError>) -> bool {
    match error {
        None => false,
        Some(e) => match e.kind {
            GatewayErrorKind::Transient => true,
            GatewayErrorKind::Terminal => false,
            GatewayErrorKind::Unclassified => is_retryable_message(&e.message),
        },
    }
}

/// Substring heuristic over an error message
pub fn is_retryable_message(message: &str) -> bool {
    let message = message.to_lowercase();
    RETRYABLE_MESSAGES.iter().any(|m| message.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_heuristic() {
        assert!(is_retryable_message("dial tcp: connection refused"));
        assert!(is_retryable_message("Local: Timeout"));
        assert!(is_retryable_message("write: Broken pipe"));
        assert!(is_retryable_message("lookup kafka-0: no such host"));
        assert!(!is_retryable_message("invalid configuration"));
        assert!(!is_retryable_message(""));
    }

    #[test]
    fn test_none_is_not_retryable() {
        assert!(!is_retryable(None));
    }

    #[test]
    fn test_unclassified_falls_back_to_message() {
        let err = GatewayError::unclassified("dial tcp: connection refused");
        assert!(is_retryable(Some(&err)));

        let err = GatewayError::unclassified("invalid configuration");
        assert!(!is_retryable(Some(&err)));
    }

    #[test]
    fn test_structured_kind_wins_over_message() {
        let err = GatewayError::terminal("request timeout exceeded quota");
        assert!(!is_retryable(Some(&err)));

        let err = GatewayError::transient("all brokers down");
        assert!(is_retryable(Some(&err)));
    }
}
