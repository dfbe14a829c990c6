//! Ledger transaction construction.
//!
//! # State Machine
//! ```text
//! TxBuilder<Empty>
//!     → select_inputs (CoinSelector)          → TxBuilder<InputsSelected>
//!     → attach_metadata (label 721)           → TxBuilder<MetadataAttached>
//!     → hash (fee, change, body, tx id)       → HashedTransaction
//!     → sign (company vkey witness)           → SignedTransaction
//!     → serialize                             → SerializedTransaction (hex for submission)
//! ```
//!
//! # Design Decisions
//! - The wire format is encoded explicitly with `minicbor`; only the subset
//!   needed for a single-witness metadata transaction is produced
//! - The transaction id is the Blake2b-256 of the exact body bytes that are
//!   embedded in the serialized transaction
//! - Every stage is synchronous and pure; chain I/O happens before and after

pub mod encoding;
pub mod metadata;
pub mod selection;
pub mod transaction;
pub mod types;

pub use metadata::{
    chunk_str, metadata_from_transaction, MetadataPayload, Metadatum, HARVEST_METADATA_LABEL,
    METADATA_CHUNK_SIZE,
};
pub use selection::{CoinSelector, FirstAvailable, LargestFirst};
pub use transaction::{
    HashedTransaction, SerializedTransaction, SignedTransaction, TransactionSigner, TxBuilder,
    UnsignedTransactionDraft,
};
pub use types::{is_tx_id, ProtocolParameters, TxBuildError, TxBuildResult, TxId, Utxo};

use crate::address::WalletAddress;

/// Run the whole builder pipeline for one payload.
pub fn build_attestation_transaction(
    utxos: &[Utxo],
    params: ProtocolParameters,
    change_address: WalletAddress,
    selector: &dyn CoinSelector,
    payload: &MetadataPayload,
    signer: &dyn TransactionSigner,
) -> TxBuildResult<SerializedTransaction> {
    TxBuilder::new(params, change_address)
        .select_inputs(utxos, selector)?
        .attach_metadata(payload)?
        .hash()?
        .sign(signer)?
        .serialize()
}
