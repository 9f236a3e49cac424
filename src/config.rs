//! Configuration Module
//!
//! Registry configuration and process settings loaded from environment
//! variables.

use std::env;
use std::time::Duration;

use tracing::warn;

use crate::codec::{Compression, SerializationFormat};
use crate::store::DEFAULT_TIMEOUT;

// == Cache Definition ==
/// A cache created together with the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDefinition {
    /// Bare partition name or `namespace:partition`
    pub name: String,
    /// TTL in seconds
    pub ttl: u32,
}

impl CacheDefinition {
    pub fn new(name: impl Into<String>, ttl: u32) -> Self {
        Self {
            name: name.into(),
            ttl,
        }
    }
}

// == Registry Config ==
/// Everything a `CacheRegistry` needs besides the backend connection.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConfig {
    /// Namespace prefixed to bare cache names
    pub default_namespace: String,
    /// Partition of the default cache
    pub default_cache_name: String,
    /// TTL in seconds for caches created without one
    pub default_ttl: u32,
    pub format: SerializationFormat,
    pub compression: Compression,
    /// Caches created eagerly, after the default cache
    pub caches: Vec<CacheDefinition>,
    /// Timeout for every store operation except index builds
    pub operation_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_namespace: "cache".to_string(),
            default_cache_name: "default".to_string(),
            default_ttl: 1800,
            format: SerializationFormat::default(),
            compression: Compression::default(),
            caches: Vec::new(),
            operation_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RegistryConfig {
    /// Loads registry settings from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DEFAULT_NAMESPACE` - Namespace for bare names (default: cache)
    /// - `CACHE_DEFAULT_NAME` - Default cache partition (default: default)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 1800)
    /// - `CACHE_FORMAT` - `bincode` or `json` (default: bincode)
    /// - `CACHE_COMPRESSION` - `none`, `zstd` or `zstd:<level>` (default: none)
    /// - `CACHE_PRECREATE` - Comma-separated `name=ttl` pairs
    /// - `CACHE_OP_TIMEOUT_MS` - Store operation timeout (default: 2000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_namespace: env::var("CACHE_DEFAULT_NAMESPACE")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.default_namespace),
            default_cache_name: env::var("CACHE_DEFAULT_NAME")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.default_cache_name),
            default_ttl: env::var("CACHE_DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_ttl),
            format: env::var("CACHE_FORMAT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.format),
            compression: env::var("CACHE_COMPRESSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.compression),
            caches: env::var("CACHE_PRECREATE")
                .map(|v| parse_cache_definitions(&v))
                .unwrap_or_default(),
            operation_timeout: env::var("CACHE_OP_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.operation_timeout),
        }
    }

    /// Adds a cache to pre-create.
    pub fn with_cache(mut self, name: impl Into<String>, ttl: u32) -> Self {
        self.caches.push(CacheDefinition::new(name, ttl));
        self
    }
}

/// Parses `name=ttl,name=ttl`. Malformed entries are skipped.
pub fn parse_cache_definitions(raw: &str) -> Vec<CacheDefinition> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let parsed = entry
                .rsplit_once('=')
                .and_then(|(name, ttl)| Some((name.trim(), ttl.trim().parse::<u32>().ok()?)))
                .filter(|(name, _)| !name.is_empty());
            if parsed.is_none() {
                warn!("Ignoring malformed cache definition '{}'", entry);
            }
            parsed.map(|(name, ttl)| CacheDefinition::new(name, ttl))
        })
        .collect()
}

// == Config ==
/// Process configuration for the server binary.
#[derive(Debug, Clone)]
pub struct Config {
    pub registry: RegistryConfig,
    /// HTTP server port
    pub server_port: u16,
    /// Background expiry sweep interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Expiry sweep frequency in seconds (default: 1)
    /// - plus everything read by [`RegistryConfig::from_env`]
    pub fn from_env() -> Self {
        Self {
            registry: RegistryConfig::from_env(),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            server_port: 3000,
            cleanup_interval: 1,
        }
    }
}
