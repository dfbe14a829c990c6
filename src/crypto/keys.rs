//! Ed25519 key generation and decoding.
//!
//! Public keys travel as SPKI DER hex (88 hex chars) and private keys as
//! PKCS#8 DER hex. Raw 32-byte hex keys are accepted on input as well.

use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::{SigningKey, VerifyingKey, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::{CryptoError, CryptoResult};

/// An Ed25519 keypair in its exported (hex DER) form.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    public_key: String,
    private_key: String,
}

impl KeyPair {
    /// Wrap an existing signing key.
    pub fn from_signing_key(signing_key: &SigningKey) -> CryptoResult<Self> {
        let public_der = signing_key
            .verifying_key()
            .to_public_key_der()
            .map_err(|e| CryptoError::InvalidKeyFormat(format!("SPKI encoding failed: {}", e)))?;
        let private_der = signing_key
            .to_pkcs8_der()
            .map_err(|e| CryptoError::InvalidKeyFormat(format!("PKCS#8 encoding failed: {}", e)))?;

        Ok(Self {
            public_key: hex::encode(public_der.as_bytes()),
            private_key: hex::encode(private_der.as_bytes()),
        })
    }

    /// SPKI DER, hex encoded.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// PKCS#8 DER, hex encoded. Keep it in-process.
    pub fn private_key(&self) -> &str {
        &self.private_key
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Generate a fresh keypair from the OS random source.
pub fn generate_keypair() -> CryptoResult<KeyPair> {
    let mut seed = Zeroizing::new([0u8; SECRET_KEY_LENGTH]);
    OsRng
        .try_fill_bytes(seed.as_mut())
        .map_err(|e| CryptoError::EntropyUnavailable(e.to_string()))?;

    KeyPair::from_signing_key(&SigningKey::from_bytes(&seed))
}

/// Decode a public key from SPKI DER hex or raw 32-byte hex.
pub fn parse_public_key(public_key_hex: &str) -> CryptoResult<VerifyingKey> {
    let bytes = hex::decode(public_key_hex)
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("public key is not hex: {}", e)))?;

    if bytes.len() == PUBLIC_KEY_LENGTH {
        let mut raw = [0u8; PUBLIC_KEY_LENGTH];
        raw.copy_from_slice(&bytes);
        return VerifyingKey::from_bytes(&raw)
            .map_err(|e| CryptoError::InvalidKeyFormat(format!("invalid Ed25519 point: {}", e)));
    }

    VerifyingKey::from_public_key_der(&bytes)
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("invalid SPKI public key: {}", e)))
}

/// Decode a private key from PKCS#8 DER hex or a raw 32-byte seed in hex.
pub fn parse_private_key(private_key_hex: &str) -> CryptoResult<SigningKey> {
    let bytes = Zeroizing::new(
        hex::decode(private_key_hex)
            .map_err(|e| CryptoError::InvalidKeyFormat(format!("private key is not hex: {}", e)))?,
    );

    if bytes.len() == SECRET_KEY_LENGTH {
        let mut seed = Zeroizing::new([0u8; SECRET_KEY_LENGTH]);
        seed.copy_from_slice(&bytes);
        return Ok(SigningKey::from_bytes(&seed));
    }

    SigningKey::from_pkcs8_der(&bytes)
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("invalid PKCS#8 private key: {}", e)))
}
