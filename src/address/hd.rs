//! BIP32-Ed25519 hierarchical key derivation (Icarus / CIP-1852 flavour).
//!
//! # State
//! An extended private key is `kL || kR || chain_code`, 32 bytes each. `kL`
//! is a little-endian scalar, `kR` the nonce prefix used when signing.
//!
//! # Derivation
//! ```text
//! hardened i:  Z = HMAC512(cc, 0x00 || kL || kR || i_le)   c = HMAC512(cc, 0x01 || ...)
//! soft i:      Z = HMAC512(cc, 0x02 || A || i_le)          c = HMAC512(cc, 0x03 || ...)
//! kL' = kL + 8 * Z[0..28]     kR' = kR + Z[32..64]     cc' = c[32..64]
//! ```

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use ed25519_dalek::hazmat::{raw_sign, ExpandedSecretKey};
use ed25519_dalek::VerifyingKey;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::address::{AddressError, AddressResult};

type HmacSha512 = Hmac<Sha512>;

/// Index offset for hardened derivation.
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// PBKDF2 rounds for the Icarus master key.
const PBKDF2_ROUNDS: u32 = 4096;

/// CIP-1852 purpose.
pub const PURPOSE: u32 = 1852;
/// SLIP-44 coin type for ADA.
pub const COIN_TYPE: u32 = 1815;

/// Path of the first external payment key of account 0.
pub const PAYMENT_KEY_PATH: [u32; 5] = [
    harden(PURPOSE),
    harden(COIN_TYPE),
    harden(0),
    0,
    0,
];

/// Harden a derivation index.
pub const fn harden(index: u32) -> u32 {
    index | HARDENED_OFFSET
}

/// Extended Ed25519 private key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ExtendedPrivateKey {
    kl: [u8; 32],
    kr: [u8; 32],
    chain_code: [u8; 32],
}

impl ExtendedPrivateKey {
    /// Icarus master key from BIP-39 entropy and an optional passphrase.
    pub fn from_bip39_entropy(entropy: &[u8], passphrase: &[u8]) -> Self {
        let mut out = [0u8; 96];
        pbkdf2::pbkdf2_hmac::<Sha512>(passphrase, entropy, PBKDF2_ROUNDS, &mut out);

        out[0] &= 0b1111_1000;
        out[31] &= 0b0001_1111;
        out[31] |= 0b0100_0000;

        let mut key = Self {
            kl: [0u8; 32],
            kr: [0u8; 32],
            chain_code: [0u8; 32],
        };
        key.kl.copy_from_slice(&out[..32]);
        key.kr.copy_from_slice(&out[32..64]);
        key.chain_code.copy_from_slice(&out[64..]);
        out.zeroize();
        key
    }

    /// Derive a single child.
    pub fn derive(&self, index: u32) -> AddressResult<Self> {
        let index_le = index.to_le_bytes();
        let hardened = index >= HARDENED_OFFSET;

        let mut z_mac = self.mac()?;
        let mut c_mac = self.mac()?;
        if hardened {
            z_mac.update(&[0x00]);
            z_mac.update(&self.kl);
            z_mac.update(&self.kr);
            c_mac.update(&[0x01]);
            c_mac.update(&self.kl);
            c_mac.update(&self.kr);
        } else {
            let public = self.public_key_bytes();
            z_mac.update(&[0x02]);
            z_mac.update(&public);
            c_mac.update(&[0x03]);
            c_mac.update(&public);
        }
        z_mac.update(&index_le);
        c_mac.update(&index_le);

        let mut z = z_mac.finalize().into_bytes();
        let mut c = c_mac.finalize().into_bytes();

        let child = Self {
            kl: add_28_mul8(&self.kl, &z[..28]),
            kr: add_256(&self.kr, &z[32..64]),
            chain_code: {
                let mut cc = [0u8; 32];
                cc.copy_from_slice(&c[32..64]);
                cc
            },
        };
        z.as_mut_slice().zeroize();
        c.as_mut_slice().zeroize();
        Ok(child)
    }

    /// Walk a full derivation path.
    pub fn derive_path(&self, path: &[u32]) -> AddressResult<Self> {
        let mut key = self.clone();
        for &index in path {
            key = key.derive(index)?;
        }
        Ok(key)
    }

    /// Public key `A = kL·B`.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        EdwardsPoint::mul_base(&self.scalar()).compress().to_bytes()
    }

    pub fn verifying_key(&self) -> AddressResult<VerifyingKey> {
        VerifyingKey::from_bytes(&self.public_key_bytes())
            .map_err(|e| AddressError::Derivation(format!("invalid public point: {}", e)))
    }

    /// Ed25519 signature using the extended key (nonce prefix `kR`).
    pub fn sign(&self, message: &[u8]) -> AddressResult<[u8; 64]> {
        let verifying_key = self.verifying_key()?;
        let expanded = ExpandedSecretKey {
            scalar: self.scalar(),
            hash_prefix: self.kr,
        };
        Ok(raw_sign::<Sha512>(&expanded, message, &verifying_key).to_bytes())
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    fn scalar(&self) -> Scalar {
        Scalar::from_bytes_mod_order(self.kl)
    }

    fn mac(&self) -> AddressResult<HmacSha512> {
        HmacSha512::new_from_slice(&self.chain_code)
            .map_err(|e| AddressError::Derivation(format!("HMAC init failed: {}", e)))
    }
}

/// `x + 8·y` over the low 28 bytes of `y`, carried into 32 bytes.
fn add_28_mul8(x: &[u8; 32], y: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut carry: u16 = 0;
    for i in 0..28 {
        let r = x[i] as u16 + ((y[i] as u16) << 3) + carry;
        out[i] = (r & 0xff) as u8;
        carry = r >> 8;
    }
    for i in 28..32 {
        let r = x[i] as u16 + carry;
        out[i] = (r & 0xff) as u8;
        carry = r >> 8;
    }
    out
}

/// `x + y mod 2^256`, little-endian.
fn add_256(x: &[u8; 32], y: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut carry: u16 = 0;
    for i in 0..32 {
        let r = x[i] as u16 + y[i] as u16 + carry;
        out[i] = r as u8;
        carry = r >> 8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};

    fn master() -> ExtendedPrivateKey {
        ExtendedPrivateKey::from_bip39_entropy(&[7u8; 32], b"")
    }

    #[test]
    fn test_master_key_is_clamped() {
        let key = master();
        assert_eq!(key.kl[0] & 0b0000_0111, 0);
        assert_eq!(key.kl[31] & 0b1110_0000, 0);
        assert_eq!(key.kl[31] & 0b0100_0000, 0b0100_0000);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = master().derive_path(&PAYMENT_KEY_PATH).unwrap();
        let b = master().derive_path(&PAYMENT_KEY_PATH).unwrap();
        assert_eq!(a.public_key_bytes(), b.public_key_bytes());
        assert_eq!(a.chain_code(), b.chain_code());
    }

    #[test]
    fn test_hardened_and_soft_children_differ() {
        let key = master();
        let soft = key.derive(0).unwrap();
        let hard = key.derive(harden(0)).unwrap();
        assert_ne!(soft.public_key_bytes(), hard.public_key_bytes());
    }

    #[test]
    fn test_passphrase_changes_master() {
        let plain = ExtendedPrivateKey::from_bip39_entropy(&[7u8; 32], b"");
        let salted = ExtendedPrivateKey::from_bip39_entropy(&[7u8; 32], b"pass");
        assert_ne!(plain.public_key_bytes(), salted.public_key_bytes());
    }

    #[test]
    fn test_child_signature_verifies() {
        let key = master().derive_path(&PAYMENT_KEY_PATH).unwrap();
        let message = [42u8; 32];
        let sig = key.sign(&message).unwrap();
        let vk = key.verifying_key().unwrap();
        assert!(vk.verify(&message, &Signature::from_bytes(&sig)).is_ok());
        assert!(vk.verify(&[0u8; 32], &Signature::from_bytes(&sig)).is_err());
    }

    #[test]
    fn test_add_28_mul8_carries() {
        let x = [0xffu8; 32];
        let mut y = [0u8; 32];
        y[0] = 1;
        let out = add_28_mul8(&x, &y);
        // 0xff + 8 = 0x107 → low byte 0x07, carry ripples through the 0xff bytes
        assert_eq!(out[0], 0x07);
        assert_eq!(out[1], 0x00);
    }

    #[test]
    fn test_payment_key_matches_cip19_vector() {
        let mnemonic =
            bip39::Mnemonic::parse("test walk nut penalty hip pave soap entry language right filter choice")
                .unwrap();
        let key = ExtendedPrivateKey::from_bip39_entropy(&mnemonic.to_entropy(), b"")
            .derive_path(&PAYMENT_KEY_PATH)
            .unwrap();
        assert_eq!(
            hex::encode(crate::crypto::digest::blake2b_224(&key.public_key_bytes())),
            "9493315cd92eb5d8c4304e67b7e16ae36d61d34502694657811a2c8e"
        );
    }

    #[test]
    fn test_harden() {
        assert_eq!(harden(1852), 0x8000_073c);
        assert_eq!(PAYMENT_KEY_PATH[3], 0);
    }
}
