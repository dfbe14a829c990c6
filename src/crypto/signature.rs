//! Signing and verification of canonical payloads.

use ed25519_dalek::{Signature, Signer, Verifier, SIGNATURE_LENGTH};

use crate::crypto::digest::sha256;
use crate::crypto::keys::{parse_private_key, parse_public_key, KeyPair};
use crate::crypto::{CryptoError, CryptoResult};
use crate::record::{canonicalize, HarvestRecord};

/// Three-valued verification result.
///
/// Callers that only care about pass/fail use [`VerifyOutcome::is_valid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Valid,
    Invalid,
    /// The signature or key could not be decoded.
    MalformedInput,
}

impl VerifyOutcome {
    pub fn is_valid(self) -> bool {
        matches!(self, VerifyOutcome::Valid)
    }
}

/// Sign `payload` with a hex-encoded private key, returning the signature as hex.
pub fn sign(payload: &[u8], private_key_hex: &str) -> CryptoResult<String> {
    let signing_key = parse_private_key(private_key_hex)?;
    Ok(hex::encode(signing_key.sign(payload).to_bytes()))
}

/// Verify `signature_hex` over `payload`. Malformed input yields `false`.
pub fn verify(payload: &[u8], signature_hex: &str, public_key_hex: &str) -> bool {
    verify_detailed(payload, signature_hex, public_key_hex).is_valid()
}

/// Verify with a diagnostic outcome.
pub fn verify_detailed(payload: &[u8], signature_hex: &str, public_key_hex: &str) -> VerifyOutcome {
    let verifying_key = match parse_public_key(public_key_hex) {
        Ok(key) => key,
        Err(_) => return VerifyOutcome::MalformedInput,
    };

    let sig_bytes = match hex::decode(signature_hex) {
        Ok(bytes) if bytes.len() == SIGNATURE_LENGTH => bytes,
        _ => return VerifyOutcome::MalformedInput,
    };

    let signature = match Signature::from_slice(&sig_bytes) {
        Ok(sig) => sig,
        Err(_) => return VerifyOutcome::MalformedInput,
    };

    match verifying_key.verify(payload, &signature) {
        Ok(()) => VerifyOutcome::Valid,
        Err(_) => VerifyOutcome::Invalid,
    }
}

/// Syntactic and structural check of a public key: hex alphabet, minimum
/// length, and decodable as an Ed25519 key.
pub fn is_valid_public_key_encoding(public_key_hex: &str) -> bool {
    public_key_hex.len() >= 64
        && public_key_hex.chars().all(|c| c.is_ascii_hexdigit())
        && parse_public_key(public_key_hex).is_ok()
}

/// Sign the canonical form of `record` and confirm the signature verifies
/// under the pair's own public key before handing it out.
pub fn sign_and_verify(record: &HarvestRecord, keypair: &KeyPair) -> CryptoResult<String> {
    let payload = canonicalize(record);
    let signature = sign(&payload, keypair.private_key())?;

    if !verify(&payload, &signature, keypair.public_key()) {
        return Err(CryptoError::SelfCheckFailed);
    }
    Ok(signature)
}

/// SHA-256 of the canonical payload, hex encoded.
pub fn hash_record(record: &HarvestRecord) -> String {
    hex::encode(sha256(&canonicalize(record)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::generate_keypair;
    use crate::record::WeightKg;

    fn make_test_record() -> HarvestRecord {
        HarvestRecord {
            farmer_id: "f1".into(),
            phone_number: "+15551234567".into(),
            plot_location: "Plot A".into(),
            crop_type: "maize".into(),
            weight_kg: WeightKg::new(120.5).unwrap(),
            timestamp: "2024-03-01T12:00:00Z".into(),
        }
    }

    #[test]
    fn test_sign_and_verify_round_trip() {
        let pair = generate_keypair().unwrap();
        let record = make_test_record();

        let signature = sign_and_verify(&record, &pair).unwrap();
        assert_eq!(signature.len(), 128);
        assert!(verify(&canonicalize(&record), &signature, pair.public_key()));
    }

    #[test]
    fn test_tampered_weight_fails() {
        let pair = generate_keypair().unwrap();
        let mut record = make_test_record();
        let signature = sign(&canonicalize(&record), pair.private_key()).unwrap();

        record.weight_kg = WeightKg::new(120.6).unwrap();
        assert_eq!(
            verify_detailed(&canonicalize(&record), &signature, pair.public_key()),
            VerifyOutcome::Invalid
        );
    }

    #[test]
    fn test_wrong_key_fails() {
        let signer = generate_keypair().unwrap();
        let other = generate_keypair().unwrap();
        let payload = canonicalize(&make_test_record());

        let signature = sign(&payload, signer.private_key()).unwrap();
        assert!(!verify(&payload, &signature, other.public_key()));
    }

    #[test]
    fn test_malformed_input_never_errors() {
        let pair = generate_keypair().unwrap();
        let payload = canonicalize(&make_test_record());

        assert_eq!(
            verify_detailed(&payload, "not-hex", pair.public_key()),
            VerifyOutcome::MalformedInput
        );
        assert_eq!(
            verify_detailed(&payload, &"00".repeat(10), pair.public_key()),
            VerifyOutcome::MalformedInput
        );
        assert_eq!(
            verify_detailed(&payload, &"00".repeat(64), "abcd"),
            VerifyOutcome::MalformedInput
        );
        assert!(!verify(&payload, &"00".repeat(64), pair.public_key()));
    }

    #[test]
    fn test_sign_rejects_bad_private_key() {
        let result = sign(b"payload", "1234");
        assert!(matches!(result, Err(CryptoError::InvalidKeyFormat(_))));
    }

    #[test]
    fn test_public_key_encoding_check() {
        let pair = generate_keypair().unwrap();
        assert!(is_valid_public_key_encoding(pair.public_key()));
        assert!(!is_valid_public_key_encoding("abc"));
        assert!(!is_valid_public_key_encoding(&"g".repeat(64)));
        assert!(!is_valid_public_key_encoding(&"00".repeat(40)));
    }

    #[test]
    fn test_hash_record_is_stable() {
        let record = make_test_record();
        assert_eq!(hash_record(&record), hash_record(&record));
        assert_eq!(hash_record(&record).len(), 64);
    }
}
