//! Company wallet management and transaction witness signing.
//!
//! # Security
//! - The mnemonic is loaded ONLY from the environment
//! - Neither the mnemonic nor derived private keys are logged or serialized
//! - Key material is zeroized on drop

use bech32::{Bech32, Hrp};
use bip39::Mnemonic;
use serde::Serialize;
use std::fmt;
use zeroize::Zeroizing;

use crate::address::hd::{ExtendedPrivateKey, PAYMENT_KEY_PATH};
use crate::address::{AddressError, AddressResult, Network};
use crate::crypto::digest::blake2b_224;
use crate::ledger::{TransactionSigner, TxBuildError};

/// Environment variable holding the company wallet mnemonic.
pub const COMPANY_MNEMONIC_ENV_VAR: &str = "COMPANY_WALLET_MNEMONIC";

/// Shortest accepted mnemonic.
pub const MIN_MNEMONIC_WORDS: usize = 15;

/// Base address with key payment and key stake credentials.
const BASE_ADDRESS_KEY_KEY: u8 = 0b0000_0000;

const ADDR_TESTNET_HRP: Hrp = Hrp::parse_unchecked("addr_test");
const ADDR_MAINNET_HRP: Hrp = Hrp::parse_unchecked("addr");

/// A spendable Shelley base address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletAddress {
    bech32: String,
    #[serde(skip)]
    bytes: Vec<u8>,
}

impl WalletAddress {
    /// Build a base address whose payment and stake credentials are both the
    /// hash of `payment_key`.
    pub fn base(payment_key: &[u8; 32], network: Network) -> AddressResult<Self> {
        let key_hash = blake2b_224(payment_key);

        let mut bytes = Vec::with_capacity(1 + 28 + 28);
        bytes.push(BASE_ADDRESS_KEY_KEY | network.network_id());
        bytes.extend_from_slice(&key_hash);
        bytes.extend_from_slice(&key_hash);

        let hrp = match network {
            Network::Testnet => ADDR_TESTNET_HRP,
            Network::Mainnet => ADDR_MAINNET_HRP,
        };
        let bech32 = bech32::encode::<Bech32>(hrp, &bytes)
            .map_err(|e| AddressError::Bech32(e.to_string()))?;

        Ok(Self { bech32, bytes })
    }

    pub fn as_str(&self) -> &str {
        &self.bech32
    }

    /// Raw address bytes as carried in transaction outputs.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.bech32)
    }
}

/// The company wallet that funds and signs attestation transactions.
pub struct CompanyWallet {
    payment_key: ExtendedPrivateKey,
    public_key: [u8; 32],
    address: WalletAddress,
    network: Network,
}

impl CompanyWallet {
    /// Derive the wallet from a BIP-39 mnemonic of at least 15 words.
    ///
    /// # Security
    /// The phrase is never logged. Error messages name the problem without
    /// echoing any word of it.
    pub fn from_mnemonic(phrase: &str, network: Network) -> AddressResult<Self> {
        let phrase = Zeroizing::new(phrase.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase());
        let words = phrase.split(' ').filter(|w| !w.is_empty()).count();
        if words < MIN_MNEMONIC_WORDS {
            return Err(AddressError::Mnemonic(format!(
                "expected at least {} words, got {}",
                MIN_MNEMONIC_WORDS, words
            )));
        }

        let mnemonic = Mnemonic::parse(phrase.as_str())
            .map_err(|e| AddressError::Mnemonic(format!("phrase rejected: {}", e)))?;
        let entropy = Zeroizing::new(mnemonic.to_entropy());

        let root = ExtendedPrivateKey::from_bip39_entropy(&entropy, b"");
        let payment_key = root.derive_path(&PAYMENT_KEY_PATH)?;
        let public_key = payment_key.public_key_bytes();
        let address = WalletAddress::base(&public_key, network)?;

        tracing::info!(
            address = %address,
            network = %network,
            "Company wallet initialized"
        );

        Ok(Self {
            payment_key,
            public_key,
            address,
            network,
        })
    }

    /// Load the wallet from `COMPANY_WALLET_MNEMONIC`.
    pub fn from_env(network: Network) -> AddressResult<Self> {
        let phrase = Zeroizing::new(std::env::var(COMPANY_MNEMONIC_ENV_VAR).map_err(|_| {
            AddressError::Mnemonic(format!(
                "Environment variable {} not set",
                COMPANY_MNEMONIC_ENV_VAR
            ))
        })?);

        Self::from_mnemonic(&phrase, network)
    }

    pub fn address(&self) -> &WalletAddress {
        &self.address
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Raw payment verification key.
    pub fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }

    /// Blake2b-224 hash of the payment key.
    pub fn key_hash(&self) -> [u8; 28] {
        blake2b_224(&self.public_key)
    }
}

impl fmt::Debug for CompanyWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompanyWallet")
            .field("address", &self.address.as_str())
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

impl TransactionSigner for CompanyWallet {
    fn verification_key(&self) -> [u8; 32] {
        self.public_key
    }

    fn sign(&self, message: &[u8]) -> Result<[u8; 64], TxBuildError> {
        self.payment_key
            .sign(message)
            .map_err(|e| TxBuildError::SigningFailure(e.to_string()))
    }
}
