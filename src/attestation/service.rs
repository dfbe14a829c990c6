//! The attestation service.

use std::sync::Arc;
use std::time::Duration;

use crate::address::{derive_farmer_address, CompanyWallet, Network};
use crate::attestation::types::{
    AnchorError, AnchorOutcome, AttestationError, FarmerIdentity, SubmissionReceipt, VerificationReport,
    VerifyTarget,
};
use crate::chain::ChainClient;
use crate::config::AnchoringConfig;
use crate::crypto::digest::sha256;
use crate::crypto::{generate_keypair, is_valid_public_key_encoding, sign_and_verify, verify, verify_detailed};
use crate::ledger::{
    build_attestation_transaction, CoinSelector, FirstAvailable, MetadataPayload, TxBuildError,
    HARVEST_METADATA_LABEL,
};
use crate::observability::metrics;
use crate::record::{canonicalize, HarvestRecord, RecordValidator, StrictValidator, SubmissionRequest};
use crate::store::{NewRecord, RecordStore, StoreError, StoredRecord};

/// Hex characters of the seed digest used as a generated farmer id.
const FARMER_ID_HEX_LEN: usize = 16;

/// Accepts, anchors, stores and re-verifies harvest records.
///
/// Cheap to share behind an `Arc`; every collaborator is itself shared.
pub struct AttestationService {
    store: Arc<dyn RecordStore>,
    chain: Option<Arc<dyn ChainClient>>,
    wallet: Option<Arc<CompanyWallet>>,
    validator: Arc<dyn RecordValidator>,
    selector: Arc<dyn CoinSelector>,
    anchoring: AnchoringConfig,
    network: Network,
}

impl AttestationService {
    /// A service that stores records but does not anchor them until a chain
    /// client and wallet are attached.
    pub fn new(store: Arc<dyn RecordStore>, network: Network) -> Self {
        Self {
            store,
            chain: None,
            wallet: None,
            validator: Arc::new(StrictValidator),
            selector: Arc::new(FirstAvailable),
            anchoring: AnchoringConfig::default(),
            network,
        }
    }

    pub fn with_chain(mut self, chain: Arc<dyn ChainClient>) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn with_wallet(mut self, wallet: Arc<CompanyWallet>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn RecordValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_selector(mut self, selector: Arc<dyn CoinSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_anchoring(mut self, anchoring: AnchoringConfig) -> Self {
        self.anchoring = anchoring;
        self
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn chain(&self) -> Option<&Arc<dyn ChainClient>> {
        self.chain.as_ref()
    }

    pub fn wallet(&self) -> Option<&Arc<CompanyWallet>> {
        self.wallet.as_ref()
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Anchoring will be attempted for new submissions.
    pub fn anchoring_enabled(&self) -> bool {
        self.anchoring.enabled && self.chain.is_some() && self.wallet.is_some()
    }

    /// Accept a harvest submission.
    ///
    /// Validation and signature checks happen before any chain or store
    /// work. Anchoring is best effort: its failure is reported in the
    /// receipt, never as an error.
    pub async fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionReceipt, AttestationError> {
        let validated = self.validator.validate(request).map_err(|errors| {
            metrics::record_submission("rejected");
            tracing::debug!(errors = errors.len(), "Submission failed validation");
            AttestationError::Validation(errors)
        })?;

        if !is_valid_public_key_encoding(&validated.public_key) {
            metrics::record_submission("rejected");
            return Err(AttestationError::KeyFormat(
                "public key is not a valid Ed25519 key".to_string(),
            ));
        }

        if let Some(signature) = &validated.signature {
            let outcome = verify_detailed(&canonicalize(&validated.record), signature, &validated.public_key);
            if !outcome.is_valid() {
                metrics::record_submission("rejected");
                tracing::warn!(
                    farmer_id = %validated.record.farmer_id,
                    outcome = ?outcome,
                    "Submission signature did not verify"
                );
                return Err(AttestationError::SignatureInvalid);
            }
        } else {
            tracing::info!(farmer_id = %validated.record.farmer_id, "Accepting unsigned submission");
        }

        let farmer_address = self.derive_farmer_address(&validated.public_key)?;

        let anchor = self.anchor(&validated.record, &validated.public_key).await;

        let new_record = NewRecord {
            record: validated.record,
            transaction_id: anchor.transaction_id.clone(),
            public_key: validated.public_key,
            farmer_address,
            signature: validated.signature,
        };

        let stored = self.store.insert(new_record).await.map_err(|e| {
            metrics::record_submission("persistence_failed");
            if let Some(tx) = &anchor.transaction_id {
                tracing::error!(transaction_id = %tx, error = %e, "Anchored record could not be persisted");
            } else {
                tracing::error!(error = %e, "Record could not be persisted");
            }
            AttestationError::Persistence {
                transaction_id: anchor.transaction_id.clone(),
                message: e.to_string(),
            }
        })?;

        metrics::record_submission("accepted");
        tracing::info!(
            record_id = stored.id,
            farmer_id = %stored.record.farmer_id,
            anchored = anchor.is_anchored(),
            "Harvest record accepted"
        );

        Ok(SubmissionReceipt { record: stored, anchor })
    }

    /// Display address for a farmer public key on this service's network.
    pub fn derive_farmer_address(&self, public_key_hex: &str) -> Result<String, AttestationError> {
        derive_farmer_address(public_key_hex, self.network)
            .map(|a| a.to_string())
            .map_err(|e| AttestationError::KeyFormat(e.to_string()))
    }

    async fn anchor(&self, record: &HarvestRecord, public_key: &str) -> AnchorOutcome {
        if !self.anchoring.enabled {
            metrics::record_anchor(AnchorError::Disabled.outcome());
            return AnchorOutcome::failed(AnchorError::Disabled);
        }

        let payload = MetadataPayload::from_record(record, public_key);
        let limit = self.anchoring.timeout_secs;

        let result = match tokio::time::timeout(
            Duration::from_secs(limit),
            self.build_and_submit_attestation(&payload),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AnchorError::Timeout(limit)),
        };

        match result {
            Ok(transaction_id) => {
                metrics::record_anchor("anchored");
                AnchorOutcome::anchored(transaction_id)
            }
            Err(e) => {
                metrics::record_anchor(e.outcome());
                tracing::warn!(farmer_id = %record.farmer_id, error = %e, "Anchoring failed, storing record without transaction");
                AnchorOutcome::failed(e)
            }
        }
    }

    /// Build, sign and submit a metadata transaction for `payload`,
    /// returning its id.
    pub async fn build_and_submit_attestation(&self, payload: &MetadataPayload) -> Result<String, AnchorError> {
        let chain = self.chain.as_ref().ok_or(AnchorError::NotConfigured("no chain client"))?;
        let wallet = self.wallet.as_ref().ok_or(AnchorError::NotConfigured("no company wallet"))?;

        let params = chain
            .fetch_protocol_parameters()
            .await
            .map_err(|e| TxBuildError::ProtocolParameterUnavailable(e.to_string()))?;
        let utxos = chain.list_utxos(wallet.address().as_str()).await?;

        let tx = build_attestation_transaction(
            &utxos,
            params,
            wallet.address().clone(),
            self.selector.as_ref(),
            payload,
            wallet.as_ref(),
        )?;
        let expected = tx.tx_id().to_hex();

        tracing::debug!(
            transaction_id = %expected,
            fee = tx.fee(),
            size = tx.len(),
            selector = self.selector.name(),
            "Submitting attestation transaction"
        );

        let reported = chain.submit(&tx.to_hex()).await?;
        if !reported.eq_ignore_ascii_case(&expected) {
            tracing::error!(
                expected = %expected,
                reported = %reported,
                "Node reported a different transaction id"
            );
        }

        tracing::info!(transaction_id = %expected, fee = tx.fee(), "Attestation transaction submitted");
        Ok(expected)
    }

    /// Re-check a stored record against its signature and, when anchored,
    /// against the chain. Indexer failures are reported, not raised.
    pub async fn verify_stored_record(&self, stored: &StoredRecord) -> VerificationReport {
        let signature_valid = stored
            .signature
            .as_deref()
            .map(|sig| verify(&canonicalize(&stored.record), sig, &stored.public_key));

        let mut report = VerificationReport {
            record: stored.clone(),
            signature_valid,
            blockchain_indexed: stored.indexed_on_chain,
            blockchain_valid: false,
            transaction_id: stored.transaction_id.clone(),
            metadata: None,
            metadata_matches: None,
            mismatched_fields: Vec::new(),
            chain_error: None,
        };

        match (&stored.transaction_id, &self.chain) {
            (Some(tx), Some(chain)) => {
                if let Err(e) = self.check_on_chain(chain.as_ref(), tx, stored, &mut report).await {
                    tracing::warn!(transaction_id = %tx, error = %e, "Chain lookup failed during verification");
                    report.chain_error = Some(e.to_string());
                }
            }
            (Some(tx), None) => {
                tracing::debug!(transaction_id = %tx, "Skipping chain check, no chain client");
                report.chain_error = Some("chain client not configured".to_string());
            }
            (None, _) => {}
        }

        metrics::record_verification(report.outcome());
        report
    }

    async fn check_on_chain(
        &self,
        chain: &dyn ChainClient,
        tx: &str,
        stored: &StoredRecord,
        report: &mut VerificationReport,
    ) -> Result<(), crate::chain::ChainError> {
        let status = chain.get_transaction_status(tx).await?;
        report.blockchain_valid = status.confirmed;
        if !status.confirmed {
            return Ok(());
        }

        let Some(metadata) = chain.get_transaction_metadata(tx, HARVEST_METADATA_LABEL).await? else {
            return Ok(());
        };

        match MetadataPayload::from_json(&metadata) {
            Some(anchored) => {
                report.mismatched_fields = anchored.mismatches(&stored.record, &stored.public_key);
                report.metadata_matches = Some(report.mismatched_fields.is_empty());
            }
            None => {
                report.metadata_matches = Some(false);
                report.mismatched_fields = vec!["agridatum".to_string()];
            }
        }
        if report.metadata_matches == Some(false) {
            tracing::warn!(
                transaction_id = %tx,
                fields = ?report.mismatched_fields,
                "Anchored metadata does not match stored record"
            );
        }
        report.metadata = Some(metadata);
        Ok(())
    }

    /// Look a record up by id or transaction id and verify it.
    pub async fn verify(&self, target: &VerifyTarget) -> Result<VerificationReport, AttestationError> {
        let found = match target {
            VerifyTarget::RecordId(id) => self.store.get(*id).await,
            VerifyTarget::TransactionId(tx) => self.store.find_by_transaction(tx).await,
        }
        .map_err(read_error)?;

        let stored = found.ok_or_else(|| {
            metrics::record_verification("not_found");
            AttestationError::NotFound(match target {
                VerifyTarget::RecordId(id) => format!("record {}", id),
                VerifyTarget::TransactionId(tx) => format!("transaction {}", tx),
            })
        })?;

        Ok(self.verify_stored_record(&stored).await)
    }

    /// Generate a fresh farmer identity.
    ///
    /// The farmer id is derived from `seed_input`; the keypair is random.
    /// When `harvest` is given it is signed with the new key. The private key
    /// is dropped unless `include_private_key` is set.
    pub fn generate_identity(
        &self,
        seed_input: &str,
        harvest: Option<&HarvestRecord>,
        include_private_key: bool,
    ) -> Result<FarmerIdentity, AttestationError> {
        if seed_input.is_empty() {
            return Err(AttestationError::Validation(vec!["seedInput is required".to_string()]));
        }

        let keypair = generate_keypair()?;
        let mut farmer_id = hex::encode(sha256(seed_input.as_bytes()));
        farmer_id.truncate(FARMER_ID_HEX_LEN);

        let farmer_address = derive_farmer_address(keypair.public_key(), Network::Testnet)
            .map_err(|e| AttestationError::KeyFormat(e.to_string()))?
            .to_string();

        let signature = match harvest {
            Some(record) => match sign_and_verify(record, &keypair) {
                Ok(sig) => Some(sig),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to sign harvest data for new identity");
                    None
                }
            },
            None => None,
        };

        Ok(FarmerIdentity {
            farmer_id,
            public_key: keypair.public_key().to_string(),
            farmer_address,
            signature,
            private_key: include_private_key.then(|| keypair.private_key().to_string()),
        })
    }
}

fn read_error(e: StoreError) -> AttestationError {
    AttestationError::Persistence {
        transaction_id: None,
        message: e.to_string(),
    }
}
