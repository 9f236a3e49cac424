//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

/// Longest key accepted over HTTP.
pub const MAX_KEY_LENGTH: usize = 256;

/// Request body for `PUT` and `POST /caches/:cache/:key`
///
/// A missing or `null` value stores a null entry.
#[derive(Debug, Clone, Deserialize)]
pub struct PutRequest {
    /// Any JSON value
    #[serde(default)]
    pub value: Value,
}

impl PutRequest {
    /// JSON text stored in the cache, or `None` for a null entry.
    pub fn json_text(&self) -> Option<String> {
        if self.value.is_null() {
            None
        } else {
            Some(self.value.to_string())
        }
    }
}

/// Validates a key taken from the request path
///
/// Returns an error message if validation fails, None if valid.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        ));
    }
    None
}
