//! Ledger indexer integration.
//!
//! # Data Flow
//! ```text
//! attestation service
//!     → client.rs (ChainClient trait: UTxOs, parameters, submit, lookups)
//!     → blockfrost.rs (REST over reqwest, failover + retry + timeouts)
//! ```
//!
//! # Design Decisions
//! - The service depends on the trait only; tests substitute an in-memory client
//! - A failing or slow indexer never fails a harvest submission

pub mod blockfrost;
pub mod client;
pub mod types;

pub use blockfrost::BlockfrostClient;
pub use client::ChainClient;
pub use types::{ChainError, ChainResult, TransactionStatus};
