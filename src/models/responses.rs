//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;

/// Response body for `GET /caches/:cache/:key`
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// Full cache name
    pub cache: String,
    pub key: String,
    /// Stored value, `null` for a null entry
    pub value: Value,
}

impl GetResponse {
    pub fn new(cache: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        Self {
            cache: cache.into(),
            key: key.into(),
            value,
        }
    }
}

/// Response body for `PUT /caches/:cache/:key`
#[derive(Debug, Clone, Serialize)]
pub struct PutResponse {
    /// Success message
    pub message: String,
    pub cache: String,
    pub key: String,
}

impl PutResponse {
    pub fn new(cache: impl Into<String>, key: impl Into<String>) -> Self {
        let cache = cache.into();
        let key = key.into();
        Self {
            message: format!("Key '{}' stored in '{}'", key, cache),
            cache,
            key,
        }
    }
}

/// Response body for `POST /caches/:cache/:key`
#[derive(Debug, Clone, Serialize)]
pub struct PutIfAbsentResponse {
    pub cache: String,
    pub key: String,
    /// True when this request wrote the value
    pub stored: bool,
    /// Value already present when `stored` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing: Option<Value>,
}

impl PutIfAbsentResponse {
    pub fn stored(cache: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            cache: cache.into(),
            key: key.into(),
            stored: true,
            existing: None,
        }
    }

    pub fn existing(cache: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        Self {
            cache: cache.into(),
            key: key.into(),
            stored: false,
            existing: Some(value),
        }
    }
}

/// Response body for `DELETE /caches/:cache/:key`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    pub cache: String,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(cache: impl Into<String>, key: impl Into<String>) -> Self {
        let cache = cache.into();
        let key = key.into();
        Self {
            message: format!("Key '{}' evicted from '{}'", key, cache),
            cache,
            key,
        }
    }
}

/// Response body for `DELETE /caches/:cache`
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub cache: String,
    /// Number of entries removed
    pub removed: usize,
}

impl ClearResponse {
    pub fn new(cache: impl Into<String>, removed: usize) -> Self {
        Self {
            cache: cache.into(),
            removed,
        }
    }
}

/// Response body for `GET /caches`
#[derive(Debug, Clone, Serialize)]
pub struct CacheNamesResponse {
    pub caches: BTreeSet<String>,
}

/// Response body for `GET /caches/:cache/stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub cache: String,
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of successful writes
    pub puts: u64,
    /// Number of explicit evictions
    pub evictions: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from a statistics snapshot
    pub fn new(cache: impl Into<String>, stats: &CacheStats) -> Self {
        Self {
            cache: cache.into(),
            hits: stats.hits,
            misses: stats.misses,
            puts: stats.puts,
            evictions: stats.evictions,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
