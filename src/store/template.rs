//! Record Store Module
//!
//! Per-key operations against one `(namespace, partition)` of the shared
//! backend, each issued with its own policy and bounded by a timeout.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use super::backend::{Backend, BackendResult, Filter, IndexType, Statement};
use super::policy::{StorePolicies, WriteMode, DEFAULT_TIMEOUT};
use super::record::{Bin, Record, RecordKey};
use crate::error::{CacheError, Result};

// == Record Store ==
pub struct RecordStore {
    backend: Arc<dyn Backend>,
    namespace: String,
    partition: String,
    /// TTL in seconds applied on writes and touches
    expiration: u32,
    policies: StorePolicies,
}

impl RecordStore {
    // == Constructor ==
    /// Creates a store over `namespace:partition` with the default timeout.
    ///
    /// # Arguments
    /// * `backend` - Shared backend connection
    /// * `namespace` - Backend namespace, must be non-empty
    /// * `partition` - Partition (set) inside the namespace, must be non-empty
    /// * `expiration` - TTL in seconds; 0 leaves expiration to the backend
    pub fn new(
        backend: Arc<dyn Backend>,
        namespace: impl Into<String>,
        partition: impl Into<String>,
        expiration: u32,
    ) -> Result<Self> {
        let namespace = namespace.into();
        let partition = partition.into();
        if namespace.is_empty() {
            return Err(CacheError::InvalidArgument(
                "namespace is not configured".to_string(),
            ));
        }
        if partition.is_empty() {
            return Err(CacheError::InvalidArgument(
                "partition is not configured".to_string(),
            ));
        }

        Ok(Self {
            backend,
            namespace,
            partition,
            expiration,
            policies: StorePolicies::new(expiration, DEFAULT_TIMEOUT),
        })
    }

    /// Rebuilds the policy set with a different operation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.policies = StorePolicies::new(self.expiration, timeout);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    pub fn expiration(&self) -> u32 {
        self.expiration
    }

    pub fn policies(&self) -> &StorePolicies {
        &self.policies
    }

    fn record_key(&self, key: &str) -> Result<RecordKey> {
        if key.is_empty() {
            return Err(CacheError::InvalidArgument("key can't be empty".to_string()));
        }
        Ok(RecordKey::new(&self.namespace, &self.partition, key))
    }

    // == Exists ==
    pub async fn exists(&self, key: &str) -> Result<bool> {
        trace!("has {} key?", key);
        let record_key = self.record_key(key)?;
        let policy = &self.policies.read;
        bounded(policy.total_timeout, self.backend.exists(policy, &record_key)).await
    }

    // == Put ==
    /// Writes all bins as one record under the chosen write mode.
    ///
    /// `CreateOnly` fails with `AlreadyExists` when the key is present.
    pub async fn put(&self, key: &str, bins: &[Bin], mode: WriteMode) -> Result<()> {
        let record_key = self.record_key(key)?;
        if bins.is_empty() {
            return Err(CacheError::InvalidArgument(
                "bins should have data to store".to_string(),
            ));
        }
        trace!("persist {:?} in record key {} ({:?})", bins, key, mode);
        let policy = self.policies.for_mode(mode);
        bounded(policy.total_timeout, self.backend.put(policy, &record_key, bins)).await
    }

    // == Get ==
    /// Fetches the full record. Does not refresh its TTL.
    pub async fn get(&self, key: &str) -> Result<Option<Record>> {
        let record_key = self.record_key(key)?;
        let policy = &self.policies.read;
        bounded(policy.total_timeout, self.backend.get(policy, &record_key)).await
    }

    // == Delete Field ==
    /// Removes one field, leaving the rest of the record untouched.
    ///
    /// Fails with `NotFound` when the record does not exist.
    pub async fn delete_field(&self, key: &str, field: &str) -> Result<()> {
        trace!("delete {} bin in record key {}", field, key);
        let record_key = self.record_key(key)?;
        if field.is_empty() {
            return Err(CacheError::InvalidArgument(
                "bin name can't be empty".to_string(),
            ));
        }
        let policy = &self.policies.delete_field;
        let bins = [Bin::null(field)];
        bounded(policy.total_timeout, self.backend.put(policy, &record_key, &bins)).await
    }

    // == Delete ==
    /// Removes the record. Returns whether one existed.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        trace!("delete {} key", key);
        let record_key = self.record_key(key)?;
        let policy = &self.policies.delete;
        bounded(policy.total_timeout, self.backend.delete(policy, &record_key)).await
    }

    // == Touch ==
    /// Resets the record's TTL to the configured expiration.
    pub async fn touch(&self, key: &str) -> Result<()> {
        trace!("touch {} key", key);
        let record_key = self.record_key(key)?;
        let policy = &self.policies.touch;
        bounded(policy.total_timeout, self.backend.touch(policy, &record_key)).await
    }

    // == Delete All ==
    /// Scans the partition and deletes every record found.
    ///
    /// Not atomic: records written during the scan may survive.
    /// Returns the number of records removed.
    pub async fn delete_all(&self) -> Result<usize> {
        let scan = &self.policies.scan;
        let keys = bounded(
            scan.total_timeout,
            self.backend
                .scan_keys(scan, &self.namespace, &self.partition),
        )
        .await?;

        let policy = &self.policies.delete;
        let mut removed = 0;
        for record_key in &keys {
            if bounded(policy.total_timeout, self.backend.delete(policy, record_key)).await? {
                removed += 1;
            }
        }
        debug!(
            "Deleted {} records from {}:{}",
            removed, self.namespace, self.partition
        );
        Ok(removed)
    }

    // == Create Index ==
    /// Builds a secondary index over `field`, waiting until it completes.
    pub async fn create_index(
        &self,
        field: &str,
        index_name: &str,
        index_type: IndexType,
    ) -> Result<()> {
        if field.is_empty() || index_name.is_empty() {
            return Err(CacheError::InvalidArgument(
                "index and field names can't be empty".to_string(),
            ));
        }
        bounded(
            self.policies.index_timeout,
            self.backend.create_index(
                &self.namespace,
                &self.partition,
                index_name,
                field,
                index_type,
            ),
        )
        .await
    }

    // == Range Query ==
    /// Distinct `id_field` values of records whose `indexed_field` lies in
    /// `[low, high]`. Requires an index on `indexed_field`.
    pub async fn range_query(
        &self,
        id_field: &str,
        indexed_field: &str,
        low: i64,
        high: i64,
    ) -> Result<HashSet<String>> {
        let statement = Statement {
            namespace: self.namespace.clone(),
            partition: self.partition.clone(),
            filter: Filter::range(indexed_field, low, high),
        };
        let policy = &self.policies.read;
        let keys = bounded(policy.total_timeout, self.backend.query(policy, &statement)).await?;

        let mut result = HashSet::with_capacity(keys.len());
        for record_key in &keys {
            trace!("Found key: {}", record_key);
            let record =
                bounded(policy.total_timeout, self.backend.get(policy, record_key)).await?;
            if let Some(id) = record.as_ref().and_then(|r| r.get_str(id_field)) {
                result.insert(id.to_string());
            }
        }
        Ok(result)
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("namespace", &self.namespace)
            .field("partition", &self.partition)
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Awaits a backend call, turning an elapsed deadline into `BackendUnavailable`.
/// A zero timeout waits indefinitely.
async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T>
where
    F: Future<Output = BackendResult<T>>,
{
    if timeout.is_zero() {
        return call.await.map_err(CacheError::from);
    }
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(CacheError::from),
        Err(_) => Err(CacheError::BackendUnavailable(format!(
            "no response within {}ms",
            timeout.as_millis()
        ))),
    }
}
