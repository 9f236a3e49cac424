//! In-Memory Backend Module
//!
//! A process-local `Backend` with backend-side TTL expiration and numeric
//! secondary indexes. Backs the demo server and the test suite.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{Backend, BackendError, BackendResult, Filter, IndexType, Statement};
use super::entry::StoredEntry;
use super::policy::{ReadPolicy, RecordExistsAction, ScanPolicy, WritePolicy};
use super::record::{Bin, FieldValue, Record, RecordKey};

/// `(namespace, partition, bin)` an index covers.
type IndexTarget = (String, String, String);

#[derive(Debug, Clone)]
struct IndexDef {
    name: String,
    index_type: IndexType,
}

// == Memory Backend ==
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: RwLock<HashMap<RecordKey, StoredEntry>>,
    indexes: RwLock<HashMap<IndexTarget, IndexDef>>,
    /// When set every call fails with `Connection`
    unavailable: AtomicBool,
    /// Artificial delay added to every call
    latency_ms: AtomicU64,
}

impl MemoryBackend {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Fault Injection ==
    /// Simulates losing (or regaining) the connection.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Delays every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    async fn check(&self) -> BackendResult<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Connection(
                "in-memory backend marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    // == Cleanup Expired ==
    /// Removes all expired records.
    ///
    /// Returns the number of records removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, entry| !entry.is_expired_at(now));
        before - records.len()
    }

    // == Length ==
    /// Number of stored records, including expired ones not yet reaped.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn live<'a>(
        records: &'a HashMap<RecordKey, StoredEntry>,
        key: &RecordKey,
    ) -> Option<&'a StoredEntry> {
        records.get(key).filter(|entry| !entry.is_expired())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn exists(&self, _policy: &ReadPolicy, key: &RecordKey) -> BackendResult<bool> {
        self.check().await?;
        let records = self.records.read().await;
        Ok(Self::live(&records, key).is_some())
    }

    async fn get(&self, _policy: &ReadPolicy, key: &RecordKey) -> BackendResult<Option<Record>> {
        self.check().await?;
        let records = self.records.read().await;
        Ok(Self::live(&records, key).map(StoredEntry::to_record))
    }

    async fn put(&self, policy: &WritePolicy, key: &RecordKey, bins: &[Bin]) -> BackendResult<()> {
        self.check().await?;
        if bins.is_empty() {
            return Err(BackendError::InvalidArgument(format!(
                "no bins to write for {}",
                key
            )));
        }

        let mut records = self.records.write().await;
        if records.get(key).is_some_and(StoredEntry::is_expired) {
            records.remove(key);
        }

        let emptied = match (records.get_mut(key), policy.exists) {
            (Some(_), RecordExistsAction::CreateOnly) => {
                return Err(BackendError::RecordExists(key.to_string()));
            }
            (None, RecordExistsAction::UpdateOnly) => {
                return Err(BackendError::RecordNotFound(key.to_string()));
            }
            (Some(entry), _) => {
                entry.apply(bins);
                if let Some(ttl) = policy.expiration {
                    entry.refresh(ttl);
                }
                entry.bins.is_empty()
            }
            (None, _) => {
                let entry = StoredEntry::new(bins, policy.expiration.unwrap_or(0));
                if !entry.bins.is_empty() {
                    records.insert(key.clone(), entry);
                }
                false
            }
        };

        // A record left without fields no longer exists
        if emptied {
            records.remove(key);
        }
        Ok(())
    }

    async fn delete(&self, _policy: &WritePolicy, key: &RecordKey) -> BackendResult<bool> {
        self.check().await?;
        let mut records = self.records.write().await;
        Ok(records
            .remove(key)
            .is_some_and(|entry| !entry.is_expired()))
    }

    async fn touch(&self, policy: &WritePolicy, key: &RecordKey) -> BackendResult<()> {
        self.check().await?;
        let mut records = self.records.write().await;
        match records.get_mut(key).filter(|entry| !entry.is_expired()) {
            Some(entry) => {
                if let Some(ttl) = policy.expiration {
                    entry.refresh(ttl);
                }
                entry.generation = entry.generation.wrapping_add(1);
                Ok(())
            }
            None => Err(BackendError::RecordNotFound(key.to_string())),
        }
    }

    async fn scan_keys(
        &self,
        _policy: &ScanPolicy,
        namespace: &str,
        partition: &str,
    ) -> BackendResult<Vec<RecordKey>> {
        self.check().await?;
        let records = self.records.read().await;
        let mut keys: Vec<RecordKey> = records
            .iter()
            .filter(|(key, entry)| {
                key.namespace == namespace && key.partition == partition && !entry.is_expired()
            })
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn create_index(
        &self,
        namespace: &str,
        partition: &str,
        index_name: &str,
        bin: &str,
        index_type: IndexType,
    ) -> BackendResult<()> {
        self.check().await?;
        let mut indexes = self.indexes.write().await;
        if let Some((target, _)) = indexes
            .iter()
            .find(|(target, def)| def.name == index_name && target.2 != bin)
        {
            return Err(BackendError::InvalidArgument(format!(
                "index '{}' already covers field '{}'",
                index_name, target.2
            )));
        }
        debug!(
            "Index {} built on {}:{}.{} ({:?})",
            index_name, namespace, partition, bin, index_type
        );
        indexes.insert(
            (namespace.to_string(), partition.to_string(), bin.to_string()),
            IndexDef {
                name: index_name.to_string(),
                index_type,
            },
        );
        Ok(())
    }

    async fn query(
        &self,
        _policy: &ReadPolicy,
        statement: &Statement,
    ) -> BackendResult<Vec<RecordKey>> {
        self.check().await?;
        let target = (
            statement.namespace.clone(),
            statement.partition.clone(),
            statement.filter.bin().to_string(),
        );
        let index_type = match self.indexes.read().await.get(&target) {
            Some(def) => def.index_type,
            None => return Err(BackendError::IndexNotFound(target.2)),
        };

        let compatible = matches!(
            (&statement.filter, index_type),
            (Filter::Range { .. }, IndexType::Numeric) | (Filter::Equal { .. }, IndexType::String)
        );
        if !compatible {
            return Err(BackendError::InvalidArgument(format!(
                "filter on '{}' does not match its {:?} index",
                target.2, index_type
            )));
        }

        let hit = |entry: &StoredEntry| match &statement.filter {
            Filter::Range { bin, begin, end } => entry
                .bins
                .get(bin)
                .and_then(FieldValue::as_i64)
                .is_some_and(|v| *begin <= v && v <= *end),
            Filter::Equal { bin, value } => entry
                .bins
                .get(bin)
                .is_some_and(|v| matches!(v, FieldValue::String(s) if s == value)),
        };

        let records = self.records.read().await;
        let mut keys: Vec<RecordKey> = records
            .iter()
            .filter(|(key, entry)| {
                key.namespace == statement.namespace
                    && key.partition == statement.partition
                    && !entry.is_expired()
                    && hit(entry)
            })
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
