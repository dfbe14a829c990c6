//! Harvest record model and canonical encoding.
//!
//! # Data Flow
//! ```text
//! SubmissionRequest (untyped, from the wire)
//!     → validation.rs (RecordValidator: shape checks, all errors at once)
//!     → types.rs (HarvestRecord, WeightKg)
//!     → canonical.rs (fixed-order bytes, signed by the farmer)
//! ```
//!
//! # Invariants
//! - Exactly six fields participate in the canonical payload
//! - Field order is written by hand, never by iterating a map
//! - Weight is rendered as the shortest round-trip decimal

pub mod canonical;
pub mod types;
pub mod validation;

pub use canonical::{canonicalize, CANONICAL_FIELDS};
pub use types::{HarvestRecord, WeightInput, WeightKg};
pub use validation::{RecordValidator, StrictValidator, SubmissionRequest, ValidatedSubmission};
