//! CBOR wire format of Shelley-era transactions.
//!
//! ```text
//! transaction  = [body, witness_set, true, auxiliary_data]
//! body         = {0: [[tx_id, index], ...], 1: [[address, coin]], 2: fee, 7: aux_hash}
//! witness_set  = {0: [[vkey, signature]]}
//! ```
//!
//! Inputs are sorted so that equal input sets always hash identically.

use minicbor::Encoder;

use crate::ledger::types::{TxBuildError, TxBuildResult};

/// Minimum-UTxO constant overhead in bytes.
pub const UTXO_ENTRY_OVERHEAD: u64 = 160;

/// A resolved input reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InputRef {
    pub tx_id: [u8; 32],
    pub index: u32,
}

/// Everything that goes into a transaction body.
#[derive(Debug, Clone)]
pub struct BodyFields<'a> {
    pub inputs: &'a [InputRef],
    pub change_address: &'a [u8],
    pub change: u64,
    pub fee: u64,
    pub auxiliary_data_hash: [u8; 32],
}

fn encoding_error<E: std::fmt::Display>(e: E) -> TxBuildError {
    TxBuildError::MetadataEncoding(format!("CBOR encoding failed: {}", e))
}

pub fn encode_body(fields: &BodyFields<'_>) -> TxBuildResult<Vec<u8>> {
    let mut inputs = fields.inputs.to_vec();
    inputs.sort();

    let mut e = Encoder::new(Vec::new());
    e.map(4).map_err(encoding_error)?;

    e.u8(0).and_then(|e| e.array(inputs.len() as u64)).map_err(encoding_error)?;
    for input in &inputs {
        e.array(2)
            .and_then(|e| e.bytes(&input.tx_id))
            .and_then(|e| e.u32(input.index))
            .map_err(encoding_error)?;
    }

    e.u8(1)
        .and_then(|e| e.array(1))
        .and_then(|e| e.array(2))
        .and_then(|e| e.bytes(fields.change_address))
        .and_then(|e| e.u64(fields.change))
        .map_err(encoding_error)?;

    e.u8(2).and_then(|e| e.u64(fields.fee)).map_err(encoding_error)?;

    e.u8(7)
        .and_then(|e| e.bytes(&fields.auxiliary_data_hash))
        .map_err(encoding_error)?;

    Ok(e.into_writer())
}

/// Encoded size of the single change output `[address, coin]`.
pub fn output_size(change_address: &[u8], change: u64) -> TxBuildResult<usize> {
    let mut e = Encoder::new(Vec::new());
    e.array(2)
        .and_then(|e| e.bytes(change_address))
        .and_then(|e| e.u64(change))
        .map_err(encoding_error)?;
    Ok(e.into_writer().len())
}

pub fn encode_witness_set(vkey: &[u8; 32], signature: &[u8; 64]) -> TxBuildResult<Vec<u8>> {
    let mut e = Encoder::new(Vec::new());
    e.map(1)
        .and_then(|e| e.u8(0))
        .and_then(|e| e.array(1))
        .and_then(|e| e.array(2))
        .and_then(|e| e.bytes(vkey))
        .and_then(|e| e.bytes(signature))
        .map_err(encoding_error)?;
    Ok(e.into_writer())
}

/// Assemble `[body, witness_set, true, auxiliary_data]` from pre-encoded parts.
///
/// The body bytes are embedded verbatim so the transaction id stays valid.
pub fn encode_transaction(body: &[u8], witness_set: &[u8], auxiliary_data: &[u8]) -> TxBuildResult<Vec<u8>> {
    let mut e = Encoder::new(Vec::with_capacity(
        1 + body.len() + witness_set.len() + 1 + auxiliary_data.len(),
    ));
    e.array(4).map_err(encoding_error)?;
    let mut out = e.into_writer();
    out.extend_from_slice(body);
    out.extend_from_slice(witness_set);

    let mut e = Encoder::new(out);
    e.bool(true).map_err(encoding_error)?;
    let mut out = e.into_writer();
    out.extend_from_slice(auxiliary_data);
    Ok(out)
}
