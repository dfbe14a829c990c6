//! Startup orchestration.
//!
//! # Responsibilities
//! - Open the record store
//! - Connect the chain client and load the company wallet when configured
//! - Assemble the attestation service
//!
//! # Design Decisions
//! - Only a broken store is fatal; a missing wallet or indexer disables
//!   anchoring with a warning
//! - Subsystems initialize in order, not concurrently

use std::sync::Arc;
use thiserror::Error;

use crate::address::CompanyWallet;
use crate::attestation::AttestationService;
use crate::chain::{BlockfrostClient, ChainClient};
use crate::config::AgriConfig;
use crate::store::{MemoryStore, RecordStore, StoreError};

/// Balance below which startup warns that anchoring will soon fail.
pub const LOW_BALANCE_LOVELACE: u64 = 10_000_000;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to open record store: {0}")]
    Store(#[from] StoreError),
}

/// Build the attestation service described by `config`.
pub async fn build_service(config: &AgriConfig) -> Result<AttestationService, StartupError> {
    let store: Arc<dyn RecordStore> = match &config.storage.path {
        Some(path) => Arc::new(MemoryStore::open(path).await?),
        None => {
            tracing::warn!("No storage path configured, records are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let network = config.chain.resolved_network();
    let mut service = AttestationService::new(store, network).with_anchoring(config.anchoring.clone());

    if !config.chain.enabled {
        tracing::warn!("Chain integration disabled, records will not be anchored");
        return Ok(service);
    }

    let chain: Arc<dyn ChainClient> = match BlockfrostClient::new(&config.chain) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!(error = %e, "Chain client unavailable, records will not be anchored");
            return Ok(service);
        }
    };
    service = service.with_chain(chain.clone());

    match CompanyWallet::from_env(network) {
        Ok(wallet) => {
            report_balance(chain.as_ref(), &wallet).await;
            service = service.with_wallet(Arc::new(wallet));
        }
        Err(e) => {
            tracing::warn!(error = %e, "Company wallet not loaded, chain submissions will fail");
        }
    }

    Ok(service)
}

async fn report_balance(chain: &dyn ChainClient, wallet: &CompanyWallet) {
    match chain.list_utxos(wallet.address().as_str()).await {
        Ok(utxos) => {
            let lovelace: u64 = utxos.iter().map(|u| u.amount).sum();
            tracing::info!(
                address = %wallet.address(),
                lovelace,
                utxos = utxos.len(),
                "Company wallet balance"
            );
            if lovelace < LOW_BALANCE_LOVELACE {
                tracing::warn!(lovelace, "Low company wallet balance, fund it from a faucet or treasury");
            }
        }
        Err(e) => tracing::warn!(error = %e, "Could not read company wallet balance"),
    }
}
