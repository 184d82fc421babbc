use crate::cache_validator::ValidatedCacheEntry;
use crate::models::ProfileRecord;
use moka::future::Cache;
use moka::policy::EvictionPolicy;

/// Bounded per-handle history of merged profiles.
///
/// Keyed by identity key: a new lookup of the same handle replaces the
/// previous entry. Once `capacity` is reached the least recently used
/// handle is evicted.
#[derive(Clone)]
pub struct HistoryStore {
    entries: Cache<String, ValidatedCacheEntry>,
}

impl HistoryStore {
    pub fn new(capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self { entries }
    }

    /// Insert or replace the entry for `record.id`.
    pub async fn put(&self, record: &ProfileRecord) {
        match ValidatedCacheEntry::seal(record) {
            Ok(entry) => {
                self.entries.insert(record.id.clone(), entry).await;
                tracing::debug!("History updated for {}", record.id);
            }
            Err(e) => tracing::error!("Failed to serialize history entry {}: {}", record.id, e),
        }
    }

    pub async fn get(&self, id: &str) -> Option<ProfileRecord> {
        let entry = self.entries.get(id).await?;
        let record = entry.open();
        if record.is_none() {
            self.entries.invalidate(id).await;
        }
        record
    }

    /// All valid entries, most recently fetched first.
    pub async fn get_all(&self) -> Vec<ProfileRecord> {
        let mut records: Vec<ProfileRecord> = self
            .entries
            .iter()
            .filter_map(|(_, entry)| entry.open())
            .collect();
        records.sort_by(|a, b| b.last_fetched.cmp(&a.last_fetched));
        records
    }

    /// Returns true if an entry was removed.
    pub async fn remove(&self, id: &str) -> bool {
        self.entries.remove(id).await.is_some()
    }

    /// Approximate entry count after pending maintenance has run.
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
