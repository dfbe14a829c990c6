//! In-memory record store with optional JSON file persistence.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::store::{
    FarmerStats, NewRecord, Page, RecordFilter, RecordStore, StoreError, StoreResult, StoredRecord,
};

/// A thread-safe record store.
///
/// Reads go straight to the maps. Writes are serialized so that the
/// uniqueness check, the insert and the file snapshot happen as one step.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<DashMap<u64, StoredRecord>>,
    /// Lowercased transaction id → record id.
    by_transaction: Arc<DashMap<String, u64>>,
    next_id: Arc<AtomicU64>,
    write_lock: Arc<Mutex<()>>,
    persistence_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(AtomicU64::new(1)),
            ..Self::default()
        }
    }

    /// Open a store backed by `path`, loading it if the file exists.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut store = Self::new();
        store.persistence_path = Some(path.clone());

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let records: Vec<StoredRecord> =
                    serde_json::from_slice(&bytes).map_err(|e| StoreError::Format(e.to_string()))?;
                let mut max_id = 0;
                for record in records {
                    max_id = max_id.max(record.id);
                    if let Some(tx) = &record.transaction_id {
                        if store.by_transaction.insert(tx.to_lowercase(), record.id).is_some() {
                            return Err(StoreError::Format(format!(
                                "transaction {} appears on more than one record",
                                tx
                            )));
                        }
                    }
                    store.records.insert(record.id, record);
                }
                store.next_id.store(max_id + 1, Ordering::SeqCst);
                tracing::info!(
                    path = %path.display(),
                    records = store.records.len(),
                    "Loaded records from file"
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No record file yet, starting empty");
            }
            Err(e) => return Err(StoreError::Io(e.to_string())),
        }

        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write a snapshot to a sibling temp file, then rename over the target.
    async fn save(&self, path: &Path) -> StoreResult<()> {
        let mut snapshot: Vec<StoredRecord> = self.records.iter().map(|r| r.value().clone()).collect();
        snapshot.sort_by_key(|r| r.id);
        let bytes = serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Format(e.to_string()))?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;

        tracing::debug!(path = %path.display(), records = snapshot.len(), "Saved records to file");
        Ok(())
    }

    /// Newest harvest first; ties broken by newest id. Records whose
    /// timestamp does not parse sort last.
    fn sorted(mut records: Vec<StoredRecord>) -> Vec<StoredRecord> {
        records.sort_by_cached_key(|r| Reverse((r.harvested_at(), r.id)));
        records
    }

    fn page(records: Vec<StoredRecord>, limit: usize, offset: usize) -> Page<StoredRecord> {
        let total = records.len();
        let items = Self::sorted(records).into_iter().skip(offset).take(limit).collect();
        Page {
            items,
            total,
            limit,
            offset,
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, new: NewRecord) -> StoreResult<StoredRecord> {
        let _guard = self.write_lock.lock().await;

        let tx_key = new.transaction_id.as_ref().map(|t| t.to_lowercase());
        if let Some(key) = &tx_key {
            if self.by_transaction.contains_key(key) {
                return Err(StoreError::DuplicateTransaction(key.clone()));
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = StoredRecord {
            id,
            indexed_on_chain: new.transaction_id.is_some(),
            record: new.record,
            transaction_id: new.transaction_id,
            public_key: new.public_key,
            farmer_address: new.farmer_address,
            signature: new.signature,
            created_at: Utc::now(),
        };

        self.records.insert(id, stored.clone());
        if let Some(key) = &tx_key {
            self.by_transaction.insert(key.clone(), id);
        }

        if let Some(path) = &self.persistence_path {
            if let Err(e) = self.save(path).await {
                self.records.remove(&id);
                if let Some(key) = &tx_key {
                    self.by_transaction.remove(key);
                }
                tracing::error!(record_id = id, error = %e, "Record not persisted, rolled back");
                return Err(e);
            }
        }

        Ok(stored)
    }

    async fn get(&self, id: u64) -> StoreResult<Option<StoredRecord>> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_transaction(&self, transaction_id: &str) -> StoreResult<Option<StoredRecord>> {
        let id = match self.by_transaction.get(&transaction_id.to_lowercase()) {
            Some(entry) => *entry.value(),
            None => return Ok(None),
        };
        self.get(id).await
    }

    async fn list_by_farmer(&self, farmer_id: &str, limit: usize, offset: usize) -> StoreResult<Page<StoredRecord>> {
        let matching = self
            .records
            .iter()
            .filter(|r| r.value().record.farmer_id == farmer_id)
            .map(|r| r.value().clone())
            .collect();
        Ok(Self::page(matching, limit, offset))
    }

    async fn list(&self, filter: &RecordFilter) -> StoreResult<Page<StoredRecord>> {
        let matching = self
            .records
            .iter()
            .map(|r| r.value().clone())
            .filter(|r| {
                filter
                    .crop_type
                    .as_ref()
                    .map_or(true, |crop| r.record.crop_type.eq_ignore_ascii_case(crop))
            })
            .filter(|r| match (filter.start, filter.end) {
                (None, None) => true,
                (start, end) => r.harvested_at().is_some_and(|at| {
                    start.map_or(true, |s| at >= s) && end.map_or(true, |e| at <= e)
                }),
            })
            .collect();
        Ok(Self::page(matching, filter.limit, filter.offset))
    }

    async fn farmer_stats(&self, farmer_id: &str) -> StoreResult<FarmerStats> {
        let records: Vec<StoredRecord> = self
            .records
            .iter()
            .filter(|r| r.value().record.farmer_id == farmer_id)
            .map(|r| r.value().clone())
            .collect();

        let crops: HashSet<&str> = records.iter().map(|r| r.record.crop_type.as_str()).collect();
        let total_weight: f64 = records.iter().map(|r| r.record.weight_kg.value()).sum();
        let last_harvest = records
            .iter()
            .max_by_key(|r| r.harvested_at())
            .map(|r| r.record.timestamp.clone());

        Ok(FarmerStats {
            farmer_id: farmer_id.to_string(),
            total_records: records.len(),
            // sums of two-decimal weights, rounded back to cents
            total_weight_kg: (total_weight * 100.0).round() / 100.0,
            crop_types: crops.len(),
            last_harvest,
        })
    }
}
