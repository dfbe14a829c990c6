//! Attestation orchestration.
//!
//! # Data Flow
//! ```text
//! SubmissionRequest
//!     → RecordValidator (all field errors at once)
//!     → public key check, signature check over the canonical payload
//!     → farmer display address
//!     → anchoring under a timeout (params + UTxOs → TxBuilder → submit)
//!     → RecordStore insert (transaction id attached when anchored)
//! ```
//!
//! # Design Decisions
//! - Anchoring failures are merged into the receipt, never returned as errors
//! - A record is stored only after every check has passed
//! - Verification reports indexer failures inside the report

pub mod service;
pub mod types;

pub use service::AttestationService;
pub use types::{
    AnchorError, AnchorOutcome, AttestationError, FarmerIdentity, SubmissionReceipt, VerificationReport,
    VerifyTarget,
};
