//! Farmer display addresses.
//!
//! A farmer address is a stable, human-shareable identity string derived
//! from the farmer's public key. It carries no spending credential.

use bech32::{Bech32, Hrp};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::{AddressError, AddressResult, Network};
use crate::crypto::digest::sha256;
use crate::crypto::keys::parse_public_key;

const FARMER_TESTNET_HRP: Hrp = Hrp::parse_unchecked("farmer_test");
const FARMER_MAINNET_HRP: Hrp = Hrp::parse_unchecked("farmer");

/// Bech32 farmer address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FarmerAddress(String);

impl FarmerAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FarmerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the display address for a hex-encoded public key.
///
/// SPKI and raw encodings of the same key yield the same address.
pub fn derive_farmer_address(public_key_hex: &str, network: Network) -> AddressResult<FarmerAddress> {
    let key = parse_public_key(public_key_hex).map_err(|e| AddressError::InvalidKey(e.to_string()))?;
    address_for_key(&key, network)
}

/// Derive the display address for a decoded key.
pub fn address_for_key(key: &VerifyingKey, network: Network) -> AddressResult<FarmerAddress> {
    let hrp = match network {
        Network::Testnet => FARMER_TESTNET_HRP,
        Network::Mainnet => FARMER_MAINNET_HRP,
    };
    let digest = sha256(key.as_bytes());

    bech32::encode::<Bech32>(hrp, &digest)
        .map(FarmerAddress)
        .map_err(|e| AddressError::Bech32(e.to_string()))
}
