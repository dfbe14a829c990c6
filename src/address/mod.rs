//! Address derivation subsystem.
//!
//! # Data Flow
//! ```text
//! Farmer public key (SPKI / raw hex)
//!     → farmer.rs (SHA-256 → bech32, display only, never spendable)
//!
//! COMPANY_WALLET_MNEMONIC (environment only)
//!     → hd.rs (BIP-39 entropy → Icarus master key → BIP32-Ed25519 path)
//!     → wallet.rs (payment key, base address, transaction witness signer)
//! ```
//!
//! # Security Constraints
//! - The mnemonic is read ONLY from the environment and never logged
//! - Farmer addresses and wallet addresses are distinct types; only a
//!   [`WalletAddress`] can fund a transaction or receive change

pub mod farmer;
pub mod hd;
pub mod wallet;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use farmer::{derive_farmer_address, FarmerAddress};
pub use wallet::{CompanyWallet, WalletAddress};

/// Target ledger network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Public test networks (preprod, preview).
    #[default]
    #[serde(alias = "preprod", alias = "preview")]
    Testnet,
    Mainnet,
}

impl Network {
    /// Network id carried in the Shelley address header.
    pub fn network_id(self) -> u8 {
        match self {
            Network::Testnet => 0,
            Network::Mainnet => 1,
        }
    }

    /// Infer the network from a Blockfrost project id, whose prefix names the
    /// network it was issued for.
    pub fn from_project_id(project_id: &str) -> Self {
        if project_id.starts_with("preprod") || project_id.starts_with("preview") {
            Network::Testnet
        } else {
            Network::Mainnet
        }
    }

    pub fn is_testnet(self) -> bool {
        matches!(self, Network::Testnet)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Testnet => write!(f, "testnet"),
            Network::Mainnet => write!(f, "mainnet"),
        }
    }
}

/// Errors raised while deriving addresses or wallet keys.
#[derive(Debug, Error)]
pub enum AddressError {
    /// Public key could not be decoded.
    #[error("Invalid public key: {0}")]
    InvalidKey(String),

    /// Bech32 encoding or decoding failed.
    #[error("Bech32 error: {0}")]
    Bech32(String),

    /// Mnemonic missing or malformed.
    #[error("Invalid mnemonic: {0}")]
    Mnemonic(String),

    /// Key derivation failed.
    #[error("Derivation error: {0}")]
    Derivation(String),
}

/// Result type for address operations.
pub type AddressResult<T> = Result<T, AddressError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_from_project_id() {
        assert_eq!(Network::from_project_id("preprodAbc123"), Network::Testnet);
        assert_eq!(Network::from_project_id("previewXyz"), Network::Testnet);
        assert_eq!(Network::from_project_id("mainnetAbc"), Network::Mainnet);
    }

    #[test]
    fn test_network_serde_aliases() {
        let n: Network = serde_json::from_str("\"preprod\"").unwrap();
        assert_eq!(n, Network::Testnet);
        let n: Network = serde_json::from_str("\"mainnet\"").unwrap();
        assert_eq!(n, Network::Mainnet);
        assert_eq!(Network::Mainnet.network_id(), 1);
    }
}
