//! Chain-specific types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export ChainConfig from config module to avoid duplication
pub use crate::config::schema::ChainConfig;

/// Errors that can occur while talking to the ledger indexer.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// Transport-level failure (connect, TLS, body read).
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded its deadline.
    #[error("Chain request timed out after {0} seconds")]
    Timeout(u64),

    /// The indexer answered with a non-success status.
    #[error("Indexer returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// The node rejected the transaction.
    #[error("Submission rejected: {0}")]
    Submission(String),

    /// Client disabled or not configured.
    #[error("Chain not available: {0}")]
    NotAvailable(String),
}

impl ChainError {
    /// Whether an idempotent lookup may be retried after this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChainError::Network(_) | ChainError::Timeout(_) => true,
            ChainError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// Inclusion state of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatus {
    /// Included in a block.
    pub confirmed: bool,
    pub block_hash: Option<String>,
    pub block_height: Option<u64>,
}

impl TransactionStatus {
    pub fn unconfirmed() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ChainError::Network("reset".into()).is_retryable());
        assert!(ChainError::Timeout(5).is_retryable());
        assert!(ChainError::Status { status: 503, message: String::new() }.is_retryable());
        assert!(ChainError::Status { status: 429, message: String::new() }.is_retryable());
        assert!(!ChainError::Status { status: 400, message: String::new() }.is_retryable());
        assert!(!ChainError::Submission("bad".into()).is_retryable());
        assert!(!ChainError::Decode("x".into()).is_retryable());
    }
}
