//! Typestate transaction builder.
//!
//! Each stage consumes the previous one, so a transaction cannot be signed
//! before it is hashed or serialized before it is signed.

use ed25519_dalek::{Signature, VerifyingKey};

use crate::address::WalletAddress;
use crate::crypto::digest::blake2b_256;
use crate::ledger::encoding::{
    encode_body, encode_transaction, encode_witness_set, output_size, BodyFields, InputRef,
    UTXO_ENTRY_OVERHEAD,
};
use crate::ledger::metadata::{encode_auxiliary_data, Metadatum, MetadataPayload, HARVEST_METADATA_LABEL};
use crate::ledger::selection::CoinSelector;
use crate::ledger::types::{ProtocolParameters, TxBuildError, TxBuildResult, TxId, Utxo};

/// Produces vkey witnesses for transaction bodies.
pub trait TransactionSigner: Send + Sync {
    /// Raw 32-byte verification key placed in the witness.
    fn verification_key(&self) -> [u8; 32];

    fn sign(&self, message: &[u8]) -> TxBuildResult<[u8; 64]>;
}

/// Builder state: nothing chosen yet.
#[derive(Debug)]
pub struct Empty;

/// Builder state: funding inputs chosen.
#[derive(Debug)]
pub struct InputsSelected {
    inputs: Vec<InputRef>,
    total_input: u64,
}

/// Builder state: inputs and auxiliary data in place.
#[derive(Debug)]
pub struct MetadataAttached {
    inputs: Vec<InputRef>,
    total_input: u64,
    auxiliary_data: Vec<u8>,
}

/// Transaction under construction.
#[derive(Debug)]
pub struct TxBuilder<S> {
    params: ProtocolParameters,
    change_address: WalletAddress,
    state: S,
}

/// A fully-attached draft, ready for fee computation and hashing.
pub type UnsignedTransactionDraft = TxBuilder<MetadataAttached>;

impl TxBuilder<Empty> {
    /// Change always returns to `change_address`, so only a wallet address
    /// is accepted here.
    pub fn new(params: ProtocolParameters, change_address: WalletAddress) -> Self {
        Self {
            params,
            change_address,
            state: Empty,
        }
    }

    pub fn select_inputs(
        self,
        utxos: &[Utxo],
        selector: &dyn CoinSelector,
    ) -> TxBuildResult<TxBuilder<InputsSelected>> {
        let selected = selector.select(utxos)?;
        if selected.is_empty() {
            return Err(TxBuildError::InsufficientFunds(format!(
                "{} selected no inputs",
                selector.name()
            )));
        }

        let mut inputs = Vec::with_capacity(selected.len());
        let mut total_input: u64 = 0;
        for utxo in &selected {
            inputs.push(InputRef {
                tx_id: utxo.tx_id_bytes()?,
                index: utxo.output_index,
            });
            total_input = total_input
                .checked_add(utxo.amount)
                .ok_or_else(|| TxBuildError::InvalidUtxo("input total overflows".to_string()))?;
        }

        tracing::debug!(
            selector = selector.name(),
            inputs = inputs.len(),
            total_input,
            "Inputs selected"
        );

        Ok(TxBuilder {
            params: self.params,
            change_address: self.change_address,
            state: InputsSelected { inputs, total_input },
        })
    }
}

impl TxBuilder<InputsSelected> {
    /// Attach a harvest payload under label 721.
    pub fn attach_metadata(self, payload: &MetadataPayload) -> TxBuildResult<TxBuilder<MetadataAttached>> {
        self.attach_auxiliary(HARVEST_METADATA_LABEL, &payload.to_metadatum())
    }

    /// Attach an arbitrary metadatum under `label`.
    pub fn attach_auxiliary(self, label: u64, metadatum: &Metadatum) -> TxBuildResult<TxBuilder<MetadataAttached>> {
        let auxiliary_data = encode_auxiliary_data(label, metadatum)?;
        if auxiliary_data.len() > self.params.max_tx_size as usize {
            return Err(TxBuildError::MetadataEncoding(format!(
                "auxiliary data is {} bytes, max transaction size is {}",
                auxiliary_data.len(),
                self.params.max_tx_size
            )));
        }

        Ok(TxBuilder {
            params: self.params,
            change_address: self.change_address,
            state: MetadataAttached {
                inputs: self.state.inputs,
                total_input: self.state.total_input,
                auxiliary_data,
            },
        })
    }
}

impl TxBuilder<MetadataAttached> {
    /// Compute fee and change, then fix the body and its hash.
    ///
    /// The fee is priced on a size estimate that uses maximal fee and change
    /// fields plus one dummy witness, so the real body is never larger than
    /// what was paid for.
    pub fn hash(self) -> TxBuildResult<HashedTransaction> {
        let MetadataAttached {
            inputs,
            total_input,
            auxiliary_data,
        } = self.state;
        let params = self.params;
        let address = self.change_address.bytes();
        let auxiliary_data_hash = blake2b_256(&auxiliary_data);

        let estimate_body = encode_body(&BodyFields {
            inputs: &inputs,
            change_address: address,
            change: u64::MAX,
            fee: u64::MAX,
            auxiliary_data_hash,
        })?;
        let dummy_witnesses = encode_witness_set(&[0u8; 32], &[0u8; 64])?;
        let estimated_size =
            encode_transaction(&estimate_body, &dummy_witnesses, &auxiliary_data)?.len() as u64;

        let fee = params
            .min_fee_a
            .saturating_mul(estimated_size)
            .saturating_add(params.min_fee_b);

        let change = total_input.checked_sub(fee).ok_or_else(|| {
            TxBuildError::InsufficientFunds(format!(
                "inputs of {} lovelace do not cover fee of {}",
                total_input, fee
            ))
        })?;

        let min_utxo = (UTXO_ENTRY_OVERHEAD + output_size(address, change)? as u64)
            .saturating_mul(params.coins_per_utxo_byte);
        if change < min_utxo {
            return Err(TxBuildError::InsufficientFunds(format!(
                "change of {} lovelace is below the minimum UTxO value {}",
                change, min_utxo
            )));
        }

        let body = encode_body(&BodyFields {
            inputs: &inputs,
            change_address: address,
            change,
            fee,
            auxiliary_data_hash,
        })?;
        let tx_id = TxId(blake2b_256(&body));

        tracing::debug!(
            tx_id = %tx_id,
            fee,
            change,
            estimated_size,
            "Transaction body hashed"
        );

        Ok(HashedTransaction {
            body,
            auxiliary_data,
            tx_id,
            fee,
            change,
            max_tx_size: params.max_tx_size,
        })
    }
}

/// A body whose fee, change and id are final.
#[derive(Debug, Clone)]
pub struct HashedTransaction {
    body: Vec<u8>,
    auxiliary_data: Vec<u8>,
    tx_id: TxId,
    fee: u64,
    change: u64,
    max_tx_size: u32,
}

impl HashedTransaction {
    pub fn tx_id(&self) -> TxId {
        self.tx_id
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    pub fn change(&self) -> u64 {
        self.change
    }

    /// Exact body bytes the id was computed over.
    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Witness the body hash. The witness is verified before it is accepted.
    pub fn sign(self, signer: &dyn TransactionSigner) -> TxBuildResult<SignedTransaction> {
        let vkey = signer.verification_key();
        let signature = signer.sign(self.tx_id.as_bytes())?;

        let verifying_key = VerifyingKey::from_bytes(&vkey)
            .map_err(|e| TxBuildError::SigningFailure(format!("unusable verification key: {}", e)))?;
        verifying_key
            .verify_strict(self.tx_id.as_bytes(), &Signature::from_bytes(&signature))
            .map_err(|_| TxBuildError::SigningFailure("witness does not verify".to_string()))?;

        Ok(SignedTransaction {
            hashed: self,
            vkey,
            signature,
        })
    }
}

/// A hashed body plus its vkey witness.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    hashed: HashedTransaction,
    vkey: [u8; 32],
    signature: [u8; 64],
}

impl SignedTransaction {
    pub fn tx_id(&self) -> TxId {
        self.hashed.tx_id
    }

    pub fn serialize(self) -> TxBuildResult<SerializedTransaction> {
        let witnesses = encode_witness_set(&self.vkey, &self.signature)?;
        let bytes = encode_transaction(&self.hashed.body, &witnesses, &self.hashed.auxiliary_data)?;

        if bytes.len() > self.hashed.max_tx_size as usize {
            return Err(TxBuildError::MetadataEncoding(format!(
                "transaction is {} bytes, max is {}",
                bytes.len(),
                self.hashed.max_tx_size
            )));
        }

        Ok(SerializedTransaction {
            tx_id: self.hashed.tx_id,
            fee: self.hashed.fee,
            bytes,
        })
    }
}

/// Wire-ready transaction.
#[derive(Debug, Clone)]
pub struct SerializedTransaction {
    tx_id: TxId,
    fee: u64,
    bytes: Vec<u8>,
}

impl SerializedTransaction {
    pub fn tx_id(&self) -> TxId {
        self.tx_id
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
