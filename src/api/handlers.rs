//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint. Values travel as
//! JSON and are stored as their JSON text. Only writes create caches; the
//! other endpoints answer 404 for a cache that does not exist.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::{Cache, ValueWrapper};
use crate::codec::type_tag;
use crate::error::{CacheError, Result};
use crate::models::{
    validate_key, CacheNamesResponse, ClearResponse, DeleteResponse, GetResponse,
    HealthResponse, PutIfAbsentResponse, PutRequest, PutResponse, StatsResponse,
};
use crate::registry::CacheRegistry;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CacheRegistry>,
}

impl AppState {
    /// Creates a new AppState around the given registry.
    pub fn new(registry: CacheRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }
}

fn check_key(key: &str) -> Result<()> {
    match validate_key(key) {
        Some(message) => Err(CacheError::InvalidArgument(message)),
        None => Ok(()),
    }
}

fn existing_cache(state: &AppState, name: &str) -> Result<Arc<Cache>> {
    state
        .registry
        .lookup(name)?
        .ok_or_else(|| CacheError::NotFound(format!("cache '{}'", name)))
}

/// JSON view of a cached entry. Strings that are not JSON text come back
/// as JSON strings.
fn wrapper_json(key: &str, wrapper: &ValueWrapper) -> Result<Value> {
    if wrapper.is_null() {
        return Ok(Value::Null);
    }
    match wrapper.downcast_ref::<String>() {
        Some(text) => Ok(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone()))),
        None => Err(CacheError::TypeMismatch {
            key: key.to_string(),
            stored: wrapper.type_tag().unwrap_or_default().to_string(),
            requested: type_tag::<String>().to_string(),
        }),
    }
}

/// Handler for PUT /caches/:cache/:key
pub async fn put_handler(
    State(state): State<AppState>,
    Path((cache, key)): Path<(String, String)>,
    Json(req): Json<PutRequest>,
) -> Result<Json<PutResponse>> {
    check_key(&key)?;
    let cache = state.registry.get_cache(&cache)?;

    match req.json_text() {
        Some(text) => cache.put(&key, &text).await?,
        None => cache.put_null(&key).await?,
    }

    Ok(Json(PutResponse::new(cache.name(), key)))
}

/// Handler for POST /caches/:cache/:key
///
/// Stores the value only if the key is absent, otherwise returns what is
/// already there.
pub async fn put_if_absent_handler(
    State(state): State<AppState>,
    Path((cache, key)): Path<(String, String)>,
    Json(req): Json<PutRequest>,
) -> Result<Json<PutIfAbsentResponse>> {
    check_key(&key)?;
    let Some(text) = req.json_text() else {
        return Err(CacheError::InvalidArgument(
            "put-if-absent requires a non-null value".to_string(),
        ));
    };
    let cache = state.registry.get_cache(&cache)?;

    let response = match cache.put_if_absent(&key, &text).await? {
        None => PutIfAbsentResponse::stored(cache.name(), key),
        Some(existing) => {
            let value = wrapper_json(&key, &existing)?;
            PutIfAbsentResponse::existing(cache.name(), key, value)
        }
    };
    Ok(Json(response))
}

/// Handler for GET /caches/:cache/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path((cache, key)): Path<(String, String)>,
) -> Result<Json<GetResponse>> {
    check_key(&key)?;
    let cache = existing_cache(&state, &cache)?;

    let wrapper = cache
        .get(&key)
        .await?
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;
    let value = wrapper_json(&key, &wrapper)?;

    Ok(Json(GetResponse::new(cache.name(), key, value)))
}

/// Handler for DELETE /caches/:cache/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path((cache, key)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>> {
    check_key(&key)?;
    let cache = existing_cache(&state, &cache)?;
    cache.evict(&key).await?;

    Ok(Json(DeleteResponse::new(cache.name(), key)))
}

/// Handler for DELETE /caches/:cache
pub async fn clear_handler(
    State(state): State<AppState>,
    Path(cache): Path<String>,
) -> Result<Json<ClearResponse>> {
    let cache = existing_cache(&state, &cache)?;
    let removed = cache.clear().await?;

    Ok(Json(ClearResponse::new(cache.name(), removed)))
}

/// Handler for GET /caches
pub async fn names_handler(State(state): State<AppState>) -> Json<CacheNamesResponse> {
    Json(CacheNamesResponse {
        caches: state.registry.cache_names(),
    })
}

/// Handler for GET /caches/:cache/stats
pub async fn stats_handler(
    State(state): State<AppState>,
    Path(cache): Path<String>,
) -> Result<Json<StatsResponse>> {
    let cache = existing_cache(&state, &cache)?;
    Ok(Json(StatsResponse::new(cache.name(), &cache.stats())))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::store::MemoryBackend;
    use serde_json::json;

    fn state() -> AppState {
        let registry =
            CacheRegistry::new(RegistryConfig::default(), Arc::new(MemoryBackend::new())).unwrap();
        AppState::new(registry)
    }

    fn path(cache: &str, key: &str) -> Path<(String, String)> {
        Path((cache.to_string(), key.to_string()))
    }

    fn body(value: Value) -> Json<PutRequest> {
        Json(PutRequest { value })
    }

    #[tokio::test]
    async fn test_put_and_get_handler() {
        let state = state();

        let result = put_handler(
            State(state.clone()),
            path("default", "test_key"),
            body(json!({"name": "test"})),
        )
        .await;
        assert!(result.is_ok());

        let response = get_handler(State(state), path("default", "test_key"))
            .await
            .unwrap();
        assert_eq!(response.cache, "cache:default");
        assert_eq!(response.value, json!({"name": "test"}));
    }

    #[tokio::test]
    async fn test_null_value_reads_back_as_null() {
        let state = state();
        put_handler(State(state.clone()), path("default", "n"), body(Value::Null))
            .await
            .unwrap();

        let response = get_handler(State(state), path("default", "n")).await.unwrap();
        assert_eq!(response.value, Value::Null);
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let result = get_handler(State(state()), path("default", "nonexistent")).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_reads_do_not_create_caches() {
        let state = state();

        let get = get_handler(State(state.clone()), path("unknown", "k")).await;
        assert!(matches!(get, Err(CacheError::NotFound(_))));
        let evict = delete_handler(State(state.clone()), path("unknown", "k")).await;
        assert!(matches!(evict, Err(CacheError::NotFound(_))));
        let stats = stats_handler(State(state.clone()), Path("unknown".to_string())).await;
        assert!(matches!(stats, Err(CacheError::NotFound(_))));
        let clear = clear_handler(State(state.clone()), Path("unknown".to_string())).await;
        assert!(matches!(clear, Err(CacheError::NotFound(_))));

        assert_eq!(state.registry.cache_names().len(), 1);
    }

    #[tokio::test]
    async fn test_get_non_string_entry_is_type_mismatch() {
        let state = state();
        let cache = state.registry.get_cache("default").unwrap();
        cache.put("number", &42i64).await.unwrap();

        let result = get_handler(State(state), path("default", "number")).await;
        assert!(matches!(result, Err(CacheError::TypeMismatch { .. })));
    }

    #[tokio::test]
    async fn test_put_if_absent_handler() {
        let state = state();

        let first = put_if_absent_handler(State(state.clone()), path("c", "k"), body(json!(1)))
            .await
            .unwrap();
        assert!(first.stored);

        let second = put_if_absent_handler(State(state), path("c", "k"), body(json!(2)))
            .await
            .unwrap();
        assert!(!second.stored);
        assert_eq!(second.existing, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_put_if_absent_rejects_null() {
        let result =
            put_if_absent_handler(State(state()), path("c", "k"), body(Value::Null)).await;
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = state();
        put_handler(State(state.clone()), path("default", "to_delete"), body(json!("v")))
            .await
            .unwrap();

        let result = delete_handler(State(state.clone()), path("default", "to_delete")).await;
        assert!(result.is_ok());

        let result = get_handler(State(state), path("default", "to_delete")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_clear_handler() {
        let state = state();
        for key in ["a", "b", "c"] {
            put_handler(State(state.clone()), path("bulk", key), body(json!(key)))
                .await
                .unwrap();
        }

        let response = clear_handler(State(state), Path("bulk".to_string()))
            .await
            .unwrap();
        assert_eq!(response.removed, 3);
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = state();
        let _ = get_handler(State(state.clone()), path("default", "missing")).await;

        let response = stats_handler(State(state), Path("default".to_string()))
            .await
            .unwrap();
        assert_eq!(response.hits, 0);
        assert_eq!(response.misses, 1);
    }

    #[tokio::test]
    async fn test_names_handler() {
        let state = state();
        state.registry.get_cache("other:x").unwrap();

        let response = names_handler(State(state)).await;
        assert!(response.caches.contains("cache:default"));
        assert!(response.caches.contains("other:x"));
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_invalid_cache_name() {
        let result = get_handler(State(state()), path("ns:", "k")).await;
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
    }
}
