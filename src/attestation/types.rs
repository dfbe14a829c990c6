//! Attestation outcomes and errors.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::chain::ChainError;
use crate::crypto::CryptoError;
use crate::ledger::TxBuildError;
use crate::store::StoredRecord;

/// Why a record was not anchored.
///
/// Never returned to callers as an error; it is logged and carried in the
/// [`AnchorOutcome`].
#[derive(Debug, Clone, Error)]
pub enum AnchorError {
    #[error("Anchoring is disabled")]
    Disabled,

    /// No chain client or no company wallet.
    #[error("Anchoring not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Transaction build failed: {0}")]
    Build(#[from] TxBuildError),

    #[error("Chain request failed: {0}")]
    Chain(#[from] ChainError),

    #[error("Anchoring timed out after {0} seconds")]
    Timeout(u64),
}

impl AnchorError {
    /// Metric label for this failure.
    pub fn outcome(&self) -> &'static str {
        match self {
            AnchorError::Disabled | AnchorError::NotConfigured(_) => "skipped",
            AnchorError::Build(_) => "build_failed",
            AnchorError::Chain(_) => "chain_failed",
            AnchorError::Timeout(_) => "timeout",
        }
    }
}

/// Result of the best-effort anchoring step.
#[derive(Debug, Clone, Default)]
pub struct AnchorOutcome {
    /// Lowercase hex id of the submitted transaction.
    pub transaction_id: Option<String>,
    pub error: Option<AnchorError>,
}

impl AnchorOutcome {
    pub fn anchored(transaction_id: String) -> Self {
        Self {
            transaction_id: Some(transaction_id),
            error: None,
        }
    }

    pub fn failed(error: AnchorError) -> Self {
        Self {
            transaction_id: None,
            error: Some(error),
        }
    }

    pub fn is_anchored(&self) -> bool {
        self.transaction_id.is_some()
    }
}

/// Errors surfaced by the attestation service.
#[derive(Debug, Error)]
pub enum AttestationError {
    /// Every field problem found, in field order.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Invalid signature")]
    SignatureInvalid,

    #[error("Invalid public key format: {0}")]
    KeyFormat(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    /// The record could not be stored. When anchoring already succeeded the
    /// transaction id is kept so the on-chain entry can be reconciled.
    #[error("Failed to persist record: {message}")]
    Persistence {
        transaction_id: Option<String>,
        message: String,
    },

    #[error("Key generation failed: {0}")]
    Crypto(#[from] CryptoError),
}

/// Successful submission.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub record: StoredRecord,
    pub anchor: AnchorOutcome,
}

/// What to verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyTarget {
    RecordId(u64),
    TransactionId(String),
}

/// Result of re-verifying a stored record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    #[serde(skip)]
    pub record: StoredRecord,
    /// `None` for unsigned records.
    pub signature_valid: Option<bool>,
    /// A transaction id was stored with the record.
    pub blockchain_indexed: bool,
    /// The transaction is confirmed on chain.
    pub blockchain_valid: bool,
    pub transaction_id: Option<String>,
    /// Metadata under the harvest label, as returned by the indexer.
    pub metadata: Option<Value>,
    /// Whether the anchored metadata matches the stored fields. `None` when
    /// no metadata could be fetched.
    pub metadata_matches: Option<bool>,
    pub mismatched_fields: Vec<String>,
    /// Indexer error, if a chain lookup failed.
    pub chain_error: Option<String>,
}

impl VerificationReport {
    /// Metric label for this report.
    pub fn outcome(&self) -> &'static str {
        if self.signature_valid == Some(false) || self.metadata_matches == Some(false) {
            "mismatch"
        } else if self.blockchain_valid {
            "confirmed"
        } else {
            "unanchored"
        }
    }
}

/// A freshly generated farmer identity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmerIdentity {
    pub farmer_id: String,
    pub public_key: String,
    pub farmer_address: String,
    /// Signature over the supplied harvest data, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Only present when explicitly requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}
