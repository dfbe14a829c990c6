//! Record persistence.
//!
//! # Data Flow
//! ```text
//! attestation service
//!     → RecordStore trait (insert, lookups, listings, stats)
//!     → memory.rs (DashMap indexes, optional JSON file snapshot)
//! ```
//!
//! # Invariants
//! - A transaction id is attached to at most one record
//! - `indexed_on_chain` is true exactly when a transaction id is present
//! - Listings are ordered newest harvest timestamp first

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::HarvestRecord;

pub use memory::MemoryStore;

/// Errors raised by a record store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Another record already carries this transaction id.
    #[error("Transaction {0} is already attached to a record")]
    DuplicateTransaction(String),

    /// Backing file could not be read or written.
    #[error("Storage I/O error: {0}")]
    Io(String),

    /// Backing file content is not a valid snapshot.
    #[error("Storage format error: {0}")]
    Format(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A record ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub record: HarvestRecord,
    pub transaction_id: Option<String>,
    pub public_key: String,
    pub farmer_address: String,
    pub signature: Option<String>,
}

/// A persisted harvest record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub id: u64,
    #[serde(flatten)]
    pub record: HarvestRecord,
    pub transaction_id: Option<String>,
    pub public_key: String,
    pub farmer_address: String,
    /// `None` for unsigned submissions.
    pub signature: Option<String>,
    pub indexed_on_chain: bool,
    pub created_at: DateTime<Utc>,
}

impl StoredRecord {
    /// Parsed harvest instant, if the stored timestamp is well formed.
    pub fn harvested_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.record.timestamp).ok()
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Matches before paging.
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Filters for the all-records listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFilter {
    pub crop_type: Option<String>,
    /// Inclusive lower bound on the harvest timestamp.
    pub start: Option<DateTime<FixedOffset>>,
    /// Inclusive upper bound on the harvest timestamp.
    pub end: Option<DateTime<FixedOffset>>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self {
            crop_type: None,
            start: None,
            end: None,
            limit: 100,
            offset: 0,
        }
    }
}

/// Which end of a day a bare date stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayBound {
    Start,
    End,
}

/// Parse an RFC 3339 instant or a `YYYY-MM-DD` date (UTC).
pub fn parse_bound(input: &str, bound: DayBound) -> Option<DateTime<FixedOffset>> {
    let input = input.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
        return Some(instant);
    }
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()?;
    let naive = match bound {
        DayBound::Start => date.and_hms_opt(0, 0, 0)?,
        DayBound::End => date.and_hms_milli_opt(23, 59, 59, 999)?,
    };
    Some(naive.and_utc().fixed_offset())
}

/// Aggregates over one farmer's records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmerStats {
    pub farmer_id: String,
    pub total_records: usize,
    pub total_weight_kg: f64,
    /// Distinct crop types.
    pub crop_types: usize,
    /// Latest harvest timestamp, as submitted.
    pub last_harvest: Option<String>,
}

/// Persistence seam for harvest records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist atomically, assigning an id and creation time.
    async fn insert(&self, record: NewRecord) -> StoreResult<StoredRecord>;

    async fn get(&self, id: u64) -> StoreResult<Option<StoredRecord>>;

    async fn find_by_transaction(&self, transaction_id: &str) -> StoreResult<Option<StoredRecord>>;

    async fn list_by_farmer(&self, farmer_id: &str, limit: usize, offset: usize) -> StoreResult<Page<StoredRecord>>;

    async fn list(&self, filter: &RecordFilter) -> StoreResult<Page<StoredRecord>>;

    async fn farmer_stats(&self, farmer_id: &str) -> StoreResult<FarmerStats>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bound_forms() {
        let start = parse_bound("2024-03-01", DayBound::Start).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-03-01T00:00:00+00:00");

        let end = parse_bound("2024-03-01", DayBound::End).unwrap();
        assert!(end > start);

        let exact = parse_bound("2024-03-01T12:00:00+02:00", DayBound::Start).unwrap();
        assert_eq!(exact.offset().local_minus_utc(), 7200);

        assert!(parse_bound("March 1st", DayBound::Start).is_none());
    }
}
