//! Signature engine.
//!
//! # Data Flow
//! ```text
//! generate_keypair (OS entropy)
//!     → keys.rs (Ed25519 keys as SPKI / PKCS#8 DER hex)
//!     → signature.rs (sign / verify canonical payloads)
//! digest.rs: SHA-256 and Blake2b helpers shared with address and ledger code
//! ```
//!
//! # Security Constraints
//! - Private keys are never logged; `KeyPair` redacts them in `Debug`
//! - Verification never errors: malformed input is a failed verification
//! - No I/O and no shared state; every function is safe to call concurrently

pub mod digest;
pub mod keys;
pub mod signature;

use thiserror::Error;

pub use keys::{generate_keypair, parse_private_key, parse_public_key, KeyPair};
pub use signature::{
    hash_record, is_valid_public_key_encoding, sign, sign_and_verify, verify, verify_detailed,
    VerifyOutcome,
};

/// Errors raised by key handling and signing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key material could not be decoded.
    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// The OS random source failed.
    #[error("Entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    /// A freshly produced signature did not verify against its own key.
    #[error("Signature self-check failed")]
    SelfCheckFailed,
}

/// Result type for signature engine operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
