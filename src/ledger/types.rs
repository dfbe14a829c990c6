//! Ledger-specific types and error definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while building a transaction.
///
/// None of these are retried inside the builder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxBuildError {
    /// No spendable input, or change would fall below the minimum UTxO value.
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Protocol parameters could not be fetched.
    #[error("Protocol parameters unavailable: {0}")]
    ProtocolParameterUnavailable(String),

    /// Metadata could not be encoded or does not fit in a transaction.
    #[error("Metadata encoding error: {0}")]
    MetadataEncoding(String),

    /// The company key could not produce a valid witness.
    #[error("Signing failure: {0}")]
    SigningFailure(String),

    /// A UTxO reference is malformed.
    #[error("Invalid UTxO: {0}")]
    InvalidUtxo(String),
}

/// Result type for transaction building.
pub type TxBuildResult<T> = Result<T, TxBuildError>;

/// An unspent output owned by the company wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Hex transaction id (32 bytes).
    pub tx_id: String,
    pub output_index: u32,
    /// Lovelace.
    pub amount: u64,
}

impl Utxo {
    pub fn new(tx_id: impl Into<String>, output_index: u32, amount: u64) -> Self {
        Self {
            tx_id: tx_id.into(),
            output_index,
            amount,
        }
    }

    /// Decoded transaction id.
    pub fn tx_id_bytes(&self) -> TxBuildResult<[u8; 32]> {
        self.tx_id
            .parse::<TxId>()
            .map(|id| id.0)
            .map_err(|e| TxBuildError::InvalidUtxo(format!("{}#{}: {}", self.tx_id, self.output_index, e)))
    }
}

/// Fee and size parameters of the current epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParameters {
    /// Lovelace per transaction byte.
    pub min_fee_a: u64,
    /// Constant fee component in lovelace.
    pub min_fee_b: u64,
    pub max_tx_size: u32,
    pub coins_per_utxo_byte: u64,
}

impl Default for ProtocolParameters {
    fn default() -> Self {
        Self {
            min_fee_a: 44,
            min_fee_b: 155_381,
            max_tx_size: 16_384,
            coins_per_utxo_byte: 4_310,
        }
    }
}

/// Blake2b-256 hash of a transaction body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxId(pub [u8; 32]);

impl TxId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for TxId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| format!("not hex: {}", e))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| format!("expected 32 bytes, got {}", v.len()))?;
        Ok(Self(arr))
    }
}

/// Whether `s` looks like a transaction id (64 hex characters).
pub fn is_tx_id(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}
