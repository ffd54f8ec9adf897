//! Error taxonomy for the client.
//!
//! # Responsibilities
//! - Distinguish retryable bring-up failures (connection, timeout) from
//!   terminal ones (precondition violations, invalid transactions)
//! - Chain transport-level causes so callers can inspect the original error
//!
//! All retry logic lives in the connection-establishment state machine and
//! the commit-confirmation loop; no other layer swallows errors.

use std::time::Duration;

use thiserror::Error;

use crate::tx::TxId;

/// Result type for all client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by the client and its transports.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Certificate/trust failure or network unreachable. Retried while the
    /// client is still establishing its first connection, terminal afterward.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation-level deadline exceeded.
    #[error("operation timed out")]
    TimedOut,

    /// Malformed caller input. Never retried, surfaced immediately.
    #[error("{0}")]
    Precondition(String),

    /// The transaction is confirmed to never commit. Never retried.
    #[error("transaction {tx_id} is marked invalid and will never be committed")]
    TransactionInvalid { tx_id: TxId },

    /// Commit confirmation did not arrive within the wait budget. Carries
    /// the most recently observed commit and consensus state for diagnostics.
    #[error(
        "timed out after {waited:?} waiting for commit of {tx_id}; commit: {last_commit}; consensus: {last_consensus}"
    )]
    CommitTimeout {
        tx_id: TxId,
        waited: Duration,
        last_commit: String,
        last_consensus: String,
    },

    /// Response body does not match the requested interpretation. Surfaced
    /// at the point of access, not at request time.
    #[error("decoding failed: {0}")]
    Decoding(String),

    /// Signature verification failed.
    #[error("bad signature")]
    BadSignature,

    /// Key material could not be loaded or used for signing.
    #[error("signing error: {0}")]
    Signing(String),

    /// Any other transport failure, with the original cause attached.
    #[error("transport failure: {context}")]
    Transport {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ClientError {
    pub(crate) fn transport(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ClientError::Transport {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn transport_msg(context: impl Into<String>) -> Self {
        ClientError::Transport {
            context: context.into(),
            source: None,
        }
    }

    /// True for failures that are retried while the first connection to a
    /// node is still being established.
    pub fn is_connection_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::ConnectionFailed { .. } | ClientError::TimedOut
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let err = ClientError::ConnectionFailed {
            message: "refused".to_string(),
            source: None,
        };
        assert!(err.is_connection_retryable());
        assert!(ClientError::TimedOut.is_connection_retryable());
        assert!(!ClientError::Precondition("bad path".to_string()).is_connection_retryable());
        assert!(!ClientError::transport_msg("boom").is_connection_retryable());
    }

    #[test]
    fn test_invalid_transaction_display() {
        let err = ClientError::TransactionInvalid {
            tx_id: TxId::new(3, 17),
        };
        assert_eq!(
            err.to_string(),
            "transaction 3.17 is marked invalid and will never be committed"
        );
    }
}
