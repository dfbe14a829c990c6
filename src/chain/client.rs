//! The chain client seam.

use async_trait::async_trait;
use serde_json::Value;

use crate::chain::types::{ChainResult, TransactionStatus};
use crate::ledger::{ProtocolParameters, Utxo};

/// Read and write access to the ledger, as needed for anchoring and
/// verification.
///
/// Lookups are idempotent and may be retried by implementations.
/// [`ChainClient::submit`] must be attempted at most once per call.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Lovelace-only outputs at `address`. An unknown address has none.
    async fn list_utxos(&self, address: &str) -> ChainResult<Vec<Utxo>>;

    async fn fetch_protocol_parameters(&self) -> ChainResult<ProtocolParameters>;

    /// Submit a hex-encoded signed transaction, returning the id the node
    /// reports.
    async fn submit(&self, tx_cbor_hex: &str) -> ChainResult<String>;

    /// Unknown transactions are reported as unconfirmed.
    async fn get_transaction_status(&self, tx_id: &str) -> ChainResult<TransactionStatus>;

    /// JSON metadata stored under `label`, if the transaction exists and has any.
    async fn get_transaction_metadata(&self, tx_id: &str, label: u64) -> ChainResult<Option<Value>>;

    /// Cheap reachability check.
    async fn is_healthy(&self) -> bool {
        self.fetch_protocol_parameters().await.is_ok()
    }
}
