//! Cache Registry Module
//!
//! Owns the backend connection and hands out one `Cache` per full name
//! (`namespace:partition`), creating caches on first use.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::info;

use crate::cache::Cache;
use crate::codec::Codec;
use crate::config::RegistryConfig;
use crate::error::{CacheError, Result};
use crate::store::{Backend, RecordStore};

/// Separates namespace from partition in a cache name.
pub const NAME_SEPARATOR: char = ':';

// == Cache Registry ==
pub struct CacheRegistry {
    backend: Arc<dyn Backend>,
    codec: Codec,
    default_namespace: String,
    default_name: String,
    default_ttl: u32,
    operation_timeout: Duration,
    caches: DashMap<String, Arc<Cache>>,
    /// Caches constructed so far, including replaced ones
    created: AtomicUsize,
}

impl CacheRegistry {
    // == Constructor ==
    /// Creates a registry with a codec built from the config.
    ///
    /// The default cache and every configured cache exist once this returns.
    pub fn new(config: RegistryConfig, backend: Arc<dyn Backend>) -> Result<Self> {
        let codec = Codec::new(config.format, config.compression);
        Self::with_codec(config, backend, codec)
    }

    /// Creates a registry with a caller-built codec, e.g. one with extra
    /// registered types. The config's format and compression are ignored.
    pub fn with_codec(config: RegistryConfig, backend: Arc<dyn Backend>, codec: Codec) -> Result<Self> {
        if config.default_namespace.is_empty()
            || config.default_namespace.contains(NAME_SEPARATOR)
        {
            return Err(CacheError::InvalidArgument(format!(
                "invalid default namespace '{}'",
                config.default_namespace
            )));
        }
        if config.default_cache_name.is_empty() {
            return Err(CacheError::InvalidArgument(
                "default cache name can't be empty".to_string(),
            ));
        }

        let registry = Self {
            backend,
            codec,
            default_name: format!(
                "{}{}{}",
                config.default_namespace, NAME_SEPARATOR, config.default_cache_name
            ),
            default_namespace: config.default_namespace,
            default_ttl: config.default_ttl,
            operation_timeout: config.operation_timeout,
            caches: DashMap::with_capacity(32),
            created: AtomicUsize::new(0),
        };

        registry.create_cache(&registry.default_name.clone(), registry.default_ttl)?;
        for definition in &config.caches {
            registry.create_cache(&definition.name, definition.ttl)?;
        }
        Ok(registry)
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    pub fn default_ttl(&self) -> u32 {
        self.default_ttl
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    // == Resolve Name ==
    /// Full `namespace:partition` name for `name`, prefixing bare names with
    /// the default namespace.
    pub fn resolve_name(&self, name: &str) -> Result<String> {
        let (namespace, partition) = self.split_name(name)?;
        Ok(format!("{}{}{}", namespace, NAME_SEPARATOR, partition))
    }

    fn split_name<'a>(&'a self, name: &'a str) -> Result<(&'a str, &'a str)> {
        let (namespace, partition) = name
            .split_once(NAME_SEPARATOR)
            .unwrap_or((self.default_namespace.as_str(), name));
        if namespace.is_empty() || partition.is_empty() {
            return Err(CacheError::InvalidArgument(format!(
                "invalid cache name '{}'",
                name
            )));
        }
        Ok((namespace, partition))
    }

    // == Get Cache ==
    /// Returns the cache for `name`, creating it with the default TTL on
    /// first use. Concurrent callers always receive the same instance.
    pub fn get_cache(&self, name: &str) -> Result<Arc<Cache>> {
        let (namespace, partition) = self.split_name(name)?;
        let full_name = format!("{}{}{}", namespace, NAME_SEPARATOR, partition);

        if let Some(cache) = self.caches.get(&full_name).map(|c| c.value().clone()) {
            return Ok(cache);
        }

        // The shard stays locked between the lookup and the insert
        match self.caches.entry(full_name) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let cache = Arc::new(self.build_cache(namespace, partition, self.default_ttl)?);
                entry.insert(cache.clone());
                Ok(cache)
            }
        }
    }

    /// The cache created at construction.
    pub fn default_cache(&self) -> Result<Arc<Cache>> {
        self.get_cache(&self.default_name)
    }

    // == Create Cache ==
    /// Creates a cache with an explicit TTL, replacing any registered under
    /// the same full name.
    pub fn create_cache(&self, name: &str, ttl: u32) -> Result<Arc<Cache>> {
        let (namespace, partition) = self.split_name(name)?;
        let cache = Arc::new(self.build_cache(namespace, partition, ttl)?);
        self.caches.insert(cache.name(), cache.clone());
        Ok(cache)
    }

    // == Lookup ==
    /// Returns the cache for `name` if it already exists. Never creates one.
    pub fn lookup(&self, name: &str) -> Result<Option<Arc<Cache>>> {
        let full_name = self.resolve_name(name)?;
        Ok(self.caches.get(&full_name).map(|c| c.value().clone()))
    }

    // == Cache Names ==
    pub fn cache_names(&self) -> BTreeSet<String> {
        self.caches.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of caches constructed over the registry's lifetime.
    pub fn caches_created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    fn build_cache(&self, namespace: &str, partition: &str, ttl: u32) -> Result<Cache> {
        let store = RecordStore::new(self.backend.clone(), namespace, partition, ttl)?
            .with_timeout(self.operation_timeout);
        self.created.fetch_add(1, Ordering::Relaxed);
        info!(
            "Created cache {}{}{} with TTL {}s",
            namespace, NAME_SEPARATOR, partition, ttl
        );
        Ok(Cache::new(store, self.codec.clone()))
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("default_name", &self.default_name)
            .field("default_ttl", &self.default_ttl)
            .field("caches", &self.cache_names())
            .finish()
    }
}
