//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Idempotent chain lookup:
//!     → per-call timeout (chain client)
//!     → On failure: retries.rs (check if retryable, retry with backoff.rs delays)
//!
//! Transaction submission:
//!     → per-call timeout only; never retried
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retries only for idempotent lookups

pub mod backoff;
pub mod retries;

pub use backoff::{calculate_backoff, RetryPolicy};
pub use retries::retry_idempotent;
