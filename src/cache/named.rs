//! Named Cache Module
//!
//! One logical cache: a record store plus the codec that turns values into
//! the reserved `C`/`V` fields and back.

use std::fmt::{self, Display};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::stats::{CacheStats, StatsRecorder};
use super::value::{ValueWrapper, NIL_SENTINEL, PAYLOAD_BIN, TYPE_TAG_BIN};
use crate::codec::{type_tag, CacheValue, Codec, ErasedValue};
use crate::error::{CacheError, Result};
use crate::store::{Bin, Record, RecordStore, WriteMode};

/// Create-only attempts before `put_if_absent` gives up on an entry that
/// keeps expiring between the write and the read.
const PUT_IF_ABSENT_ATTEMPTS: usize = 3;

// == Cache ==
/// A named cache over one `namespace:partition`.
///
/// Reads refresh the entry's TTL (sliding expiration). Entries that cannot
/// be decoded are reported as misses.
pub struct Cache {
    store: RecordStore,
    codec: Codec,
    stats: StatsRecorder,
}

impl Cache {
    pub fn new(store: RecordStore, codec: Codec) -> Self {
        Self {
            store,
            codec,
            stats: StatsRecorder::new(),
        }
    }

    /// `namespace:partition`
    pub fn name(&self) -> String {
        format!("{}:{}", self.store.namespace(), self.store.partition())
    }

    /// The underlying record store.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    // == Clear ==
    /// Removes every entry. Returns how many were removed.
    pub async fn clear(&self) -> Result<usize> {
        trace!("Clear cache: {}", self.name());
        self.store.delete_all().await
    }

    // == Evict ==
    pub async fn evict(&self, key: &(impl Display + ?Sized)) -> Result<()> {
        let key = key.to_string();
        trace!("Evicting {} from cache: {}", key, self.name());
        if self.store.delete(&key).await? {
            self.stats.record_eviction();
        }
        Ok(())
    }

    // == Put ==
    /// Stores `value`, overwriting any entry and restarting its TTL.
    pub async fn put<V: CacheValue>(&self, key: &(impl Display + ?Sized), value: &V) -> Result<()> {
        let key = key.to_string();
        let bins = self.value_bins(value)?;
        trace!(
            "Persisting {} ({}) in cache: {}",
            key,
            type_tag::<V>(),
            self.name()
        );
        self.store.put(&key, &bins, WriteMode::UpdateAlways).await?;
        self.stats.record_put();
        Ok(())
    }

    /// Stores a null, which reads back as a present-but-null hit.
    pub async fn put_null(&self, key: &(impl Display + ?Sized)) -> Result<()> {
        let key = key.to_string();
        trace!("Persisting {}=null in cache: {}", key, self.name());
        self.store
            .put(&key, &null_bins(), WriteMode::UpdateAlways)
            .await?;
        self.stats.record_put();
        Ok(())
    }

    // == Get ==
    /// Reads an entry of any registered type.
    ///
    /// Returns `None` on a miss, and also when the payload is corrupt or its
    /// type is unknown to the codec.
    pub async fn get(&self, key: &(impl Display + ?Sized)) -> Result<Option<ValueWrapper>> {
        self.fetch_wrapper(&key.to_string()).await
    }

    // == Get As ==
    /// Reads an entry as `T`.
    ///
    /// A stored null reads as `Ok(None)`. Fails with `TypeMismatch` when the
    /// entry holds a different type.
    pub async fn get_as<T: CacheValue>(&self, key: &(impl Display + ?Sized)) -> Result<Option<T>> {
        let key = key.to_string();
        let Some(record) = self.fetch_record(&key).await? else {
            return Ok(None);
        };

        let requested = type_tag::<T>();
        match record.get_str(TYPE_TAG_BIN) {
            Some(NIL_SENTINEL) => {
                trace!("Got: {}=null", key);
                self.refresh(&key).await;
                self.stats.record_hit();
                Ok(None)
            }
            Some(stored) if stored == requested => {
                match payload(&record).and_then(|bytes| self.codec.decode::<T>(bytes)) {
                    Ok(value) => {
                        trace!("Got: {} ({})", key, stored);
                        self.refresh(&key).await;
                        self.stats.record_hit();
                        Ok(Some(value))
                    }
                    Err(e) => {
                        warn!("Type {} deserialization issue: {}", stored, e);
                        self.stats.record_miss();
                        Ok(None)
                    }
                }
            }
            Some(stored) => Err(CacheError::TypeMismatch {
                key,
                stored: stored.to_string(),
                requested: requested.to_string(),
            }),
            None => {
                warn!("Entry {} in {} carries no type tag", key, self.name());
                self.stats.record_miss();
                Ok(None)
            }
        }
    }

    // == Put If Absent ==
    /// Stores `value` only if no entry exists.
    ///
    /// Returns `None` when this call wrote the value, or the existing entry
    /// otherwise. Uses a create-only write, so concurrent callers cannot
    /// both win. An existing entry of a type the codec cannot decode comes
    /// back as an opaque wrapper. Only an entry that is actually damaged
    /// (no tag, or a payload that fails to decode as its own tag) is
    /// overwritten.
    pub async fn put_if_absent<V: CacheValue>(
        &self,
        key: &(impl Display + ?Sized),
        value: &V,
    ) -> Result<Option<ValueWrapper>> {
        let key = key.to_string();
        let bins = self.value_bins(value)?;

        for _ in 0..PUT_IF_ABSENT_ATTEMPTS {
            match self.store.put(&key, &bins, WriteMode::CreateOnly).await {
                Ok(()) => {
                    self.stats.record_put();
                    return Ok(None);
                }
                Err(CacheError::AlreadyExists(_)) => {}
                Err(e) => return Err(e),
            }

            let Some(record) = self.store.get(&key).await? else {
                trace!("Entry {} expired before it could be read, retrying", key);
                continue;
            };
            if let Some(existing) = self.existing_entry::<V>(&key, &record) {
                self.refresh(&key).await;
                self.stats.record_hit();
                return Ok(Some(existing));
            }

            debug!("Replacing damaged entry {} in {}", key, self.name());
            self.store.put(&key, &bins, WriteMode::UpdateAlways).await?;
            self.stats.record_put();
            return Ok(None);
        }
        Err(CacheError::AlreadyExists(key))
    }

    /// Reads an entry found by `put_if_absent`. None means the entry is
    /// damaged and may be replaced.
    fn existing_entry<V: CacheValue>(&self, key: &str, record: &Record) -> Option<ValueWrapper> {
        let tag = record.get_str(TYPE_TAG_BIN)?;
        if tag == NIL_SENTINEL {
            return Some(ValueWrapper::null());
        }

        let decoded = if tag == type_tag::<V>() {
            payload(record)
                .and_then(|bytes| self.codec.decode::<V>(bytes))
                .map(|v| -> ErasedValue { Arc::new(v) })
        } else if self.codec.types().contains(tag) {
            payload(record).and_then(|bytes| self.codec.decode_tagged(tag, bytes))
        } else {
            trace!("Existing entry {} holds unregistered type {}", key, tag);
            return Some(ValueWrapper::opaque(tag));
        };

        match decoded {
            Ok(value) => Some(ValueWrapper::new(tag, value)),
            Err(e) => {
                warn!("Type {} deserialization issue: {}", tag, e);
                None
            }
        }
    }

    async fn fetch_record(&self, key: &str) -> Result<Option<Record>> {
        let record = self.store.get(key).await?;
        if record.is_none() {
            trace!("Not found: {}", key);
            self.stats.record_miss();
        }
        Ok(record)
    }

    async fn fetch_wrapper(&self, key: &str) -> Result<Option<ValueWrapper>> {
        let Some(record) = self.fetch_record(key).await? else {
            return Ok(None);
        };

        let tag = match record.get_str(TYPE_TAG_BIN) {
            Some(NIL_SENTINEL) => {
                trace!("Got: {}=null", key);
                self.refresh(key).await;
                self.stats.record_hit();
                return Ok(Some(ValueWrapper::null()));
            }
            Some(tag) => tag,
            None => {
                warn!("Entry {} in {} carries no type tag", key, self.name());
                self.stats.record_miss();
                return Ok(None);
            }
        };

        match payload(&record).and_then(|bytes| self.codec.decode_tagged(tag, bytes)) {
            Ok(value) => {
                trace!("Got: {} ({})", key, tag);
                self.refresh(key).await;
                self.stats.record_hit();
                Ok(Some(ValueWrapper::new(tag, value)))
            }
            Err(e) => {
                warn!("Type {} deserialization issue: {}", tag, e);
                self.stats.record_miss();
                Ok(None)
            }
        }
    }

    /// Restarts the entry's TTL after a hit. Failures only cost the refresh.
    async fn refresh(&self, key: &str) {
        match self.store.touch(key).await {
            Ok(()) => {}
            Err(CacheError::NotFound(_)) => debug!("Entry {} expired before refresh", key),
            Err(e) => warn!("TTL refresh of {} in {} failed: {}", key, self.name(), e),
        }
    }

    fn value_bins<V: CacheValue>(&self, value: &V) -> Result<[Bin; 2]> {
        Ok([
            Bin::new(TYPE_TAG_BIN, type_tag::<V>()),
            Bin::new(PAYLOAD_BIN, self.codec.encode(value)?),
        ])
    }
}

fn null_bins() -> [Bin; 2] {
    [
        Bin::new(TYPE_TAG_BIN, NIL_SENTINEL),
        Bin::new(PAYLOAD_BIN, NIL_SENTINEL),
    ]
}

fn payload(record: &Record) -> Result<&[u8]> {
    record
        .get_blob(PAYLOAD_BIN)
        .ok_or_else(|| CacheError::Decode("payload field missing or not binary".to_string()))
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("name", &self.name())
            .field("expiration", &self.store.expiration())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Compression, SerializationFormat};
    use crate::store::MemoryBackend;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        age: u32,
    }

    fn cache_on(backend: Arc<MemoryBackend>, codec: Codec) -> Cache {
        let store = RecordStore::new(backend, "cache", "test", 300).unwrap();
        Cache::new(store, codec)
    }

    fn cache() -> (Arc<MemoryBackend>, Cache) {
        let backend = Arc::new(MemoryBackend::new());
        let codec = Codec::builder().register::<Profile>().build();
        (backend.clone(), cache_on(backend, codec))
    }

    #[tokio::test]
    async fn test_name() {
        let (_, cache) = cache();
        assert_eq!(cache.name(), "cache:test");
    }

    #[tokio::test]
    async fn test_put_get_evict() {
        let (_, cache) = cache();

        cache.put("A", &"B".to_string()).await.unwrap();
        let hit = cache.get("A").await.unwrap().unwrap();
        assert_eq!(hit.downcast_ref::<String>().map(String::as_str), Some("B"));

        cache.evict("A").await.unwrap();
        assert!(cache.get("A").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_null_distinguishable_from_missing() {
        let (_, cache) = cache();

        cache.put_null("nil").await.unwrap();

        let hit = cache.get("nil").await.unwrap();
        assert!(hit.as_ref().is_some_and(ValueWrapper::is_null));
        assert!(cache.get("missing").await.unwrap().is_none());
        assert_eq!(cache.get_as::<String>("nil").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_typed_get() {
        let (_, cache) = cache();
        let profile = Profile {
            name: "ada".into(),
            age: 36,
        };

        cache.put(&7, &profile).await.unwrap();
        assert_eq!(cache.get_as::<Profile>(&7).await.unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn test_typed_get_mismatch_is_hard_error() {
        let (_, cache) = cache();
        cache.put("n", &42i64).await.unwrap();

        let err = cache.get_as::<String>("n").await.unwrap_err();
        assert!(matches!(err, CacheError::TypeMismatch { ref key, .. } if key == "n"));
        assert_eq!(cache.get_as::<i64>("n").await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_soft_miss() {
        let (_, cache) = cache();
        cache
            .store()
            .put(
                "bad",
                &[
                    Bin::new(TYPE_TAG_BIN, type_tag::<String>()),
                    Bin::new(PAYLOAD_BIN, vec![0xFFu8, 0xFF]),
                ],
                WriteMode::UpdateAlways,
            )
            .await
            .unwrap();

        assert!(cache.get("bad").await.unwrap().is_none());
        assert!(cache.get_as::<String>("bad").await.unwrap().is_none());
        assert_eq!(cache.stats().misses, 2);
    }

    #[tokio::test]
    async fn test_huge_length_prefix_is_soft_miss() {
        let bad = vec![0xFFu8, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F];
        let variants = [
            (Compression::None, bad.clone()),
            (Compression::zstd(), zstd::stream::encode_all(&bad[..], 3).unwrap()),
        ];

        for (compression, payload) in variants {
            let codec = Codec::builder().compression(compression).build();
            let cache = cache_on(Arc::new(MemoryBackend::new()), codec);
            cache
                .store()
                .put(
                    "bad",
                    &[
                        Bin::new(TYPE_TAG_BIN, type_tag::<String>()),
                        Bin::new(PAYLOAD_BIN, payload),
                    ],
                    WriteMode::UpdateAlways,
                )
                .await
                .unwrap();

            assert!(cache.get("bad").await.unwrap().is_none(), "{}", compression);
            assert!(cache.get_as::<String>("bad").await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_unregistered_type_misses_untyped_but_reads_typed() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Unlisted(u8);

        let (_, cache) = cache();
        cache.put("u", &Unlisted(5)).await.unwrap();

        assert!(cache.get("u").await.unwrap().is_none());
        assert_eq!(cache.get_as::<Unlisted>("u").await.unwrap(), Some(Unlisted(5)));
    }

    #[tokio::test]
    async fn test_record_without_tag_is_miss() {
        let (_, cache) = cache();
        cache
            .store()
            .put("foreign", &[Bin::new("x", 1)], WriteMode::UpdateAlways)
            .await
            .unwrap();

        assert!(cache.get("foreign").await.unwrap().is_none());
        assert!(cache.get_as::<String>("foreign").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_slides_expiration() {
        let (_, cache) = cache();
        cache.put("k", &1u64).await.unwrap();
        let before = cache.store().get("k").await.unwrap().unwrap().expires_at;

        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.get("k").await.unwrap().unwrap();

        let after = cache.store().get("k").await.unwrap().unwrap().expires_at;
        assert!(after > before);
    }

    #[tokio::test]
    async fn test_put_if_absent() {
        let (_, cache) = cache();

        let first = cache.put_if_absent("k", &"one".to_string()).await.unwrap();
        assert!(first.is_none());

        let second = cache
            .put_if_absent("k", &"two".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            second.downcast_ref::<String>().map(String::as_str),
            Some("one")
        );
        assert_eq!(
            cache.get_as::<String>("k").await.unwrap().as_deref(),
            Some("one")
        );
    }

    #[tokio::test]
    async fn test_put_if_absent_replaces_damaged_entry() {
        let (_, cache) = cache();
        cache
            .store()
            .put(
                "k",
                &[Bin::new(TYPE_TAG_BIN, type_tag::<u32>()), Bin::new(PAYLOAD_BIN, vec![1u8])],
                WriteMode::UpdateAlways,
            )
            .await
            .unwrap();

        let prev = cache.put_if_absent("k", &5u32).await.unwrap();
        assert!(prev.is_none());
        assert_eq!(cache.get_as::<u32>("k").await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_put_if_absent_keeps_unregistered_type() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Unlisted(u8);

        let (_, cache) = cache();

        assert!(cache.put_if_absent("k", &Unlisted(1)).await.unwrap().is_none());

        let second = cache.put_if_absent("k", &Unlisted(2)).await.unwrap().unwrap();
        assert_eq!(second.downcast_ref::<Unlisted>(), Some(&Unlisted(1)));
        assert_eq!(cache.get_as::<Unlisted>("k").await.unwrap(), Some(Unlisted(1)));
    }

    #[tokio::test]
    async fn test_put_if_absent_keeps_foreign_tag() {
        let (_, cache) = cache();
        cache
            .store()
            .put(
                "k",
                &[Bin::new(TYPE_TAG_BIN, "other::app::Order"), Bin::new(PAYLOAD_BIN, vec![1u8])],
                WriteMode::UpdateAlways,
            )
            .await
            .unwrap();

        let existing = cache.put_if_absent("k", &5u32).await.unwrap().unwrap();
        assert!(!existing.is_null());
        assert_eq!(existing.type_tag(), Some("other::app::Order"));
        assert!(existing.value().is_none());

        let record = cache.store().get("k").await.unwrap().unwrap();
        assert_eq!(record.get_str(TYPE_TAG_BIN), Some("other::app::Order"));
    }

    #[tokio::test]
    async fn test_put_if_absent_returns_stored_null() {
        let (_, cache) = cache();
        cache.put_null("k").await.unwrap();

        let existing = cache.put_if_absent("k", &5u32).await.unwrap().unwrap();
        assert!(existing.is_null());
    }

    #[tokio::test]
    async fn test_put_if_absent_concurrent_single_winner() {
        let (_, cache) = cache();
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..16u64)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.put_if_absent("race", &i).await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for h in handles {
            if h.await.unwrap().is_none() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let (_, cache) = cache();
        for i in 0..5 {
            cache.put(&i, &i).await.unwrap();
        }

        assert_eq!(cache.clear().await.unwrap(), 5);
        assert!(cache.get(&0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let (_, cache) = cache();
        let err = cache.put("", &1u64).await.unwrap_err();
        assert!(matches!(err, CacheError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_backend_failure_surfaces_on_read() {
        let (backend, cache) = cache();
        backend.set_available(false);

        let err = cache.get("k").await.unwrap_err();
        assert!(matches!(err, CacheError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_compressed_json_codec() {
        let backend = Arc::new(MemoryBackend::new());
        let codec = Codec::builder()
            .format(SerializationFormat::Json)
            .compression(Compression::zstd())
            .build();
        let cache = cache_on(backend, codec);

        let words: Vec<String> = (0..100).map(|i| format!("word-{}", i)).collect();
        cache.put("words", &words).await.unwrap();

        let hit = cache.get("words").await.unwrap().unwrap();
        assert_eq!(hit.downcast_ref::<Vec<String>>(), Some(&words));
    }

    #[tokio::test]
    async fn test_stats() {
        let (_, cache) = cache();
        cache.put("a", &1u64).await.unwrap();
        cache.get("a").await.unwrap();
        cache.get("b").await.unwrap();
        cache.evict("a").await.unwrap();
        cache.evict("a").await.unwrap();

        let stats = cache.stats();
        assert_eq!(stats.puts, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
    }
}
