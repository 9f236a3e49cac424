//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::store::BackendError;

// == Cache Error Enum ==
/// Unified error type for codec, store, cache and registry operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backend could not be reached or did not answer in time
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Create-only write hit an existing record
    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    /// Operation required an existing record
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Stored type tag does not match the requested type
    #[error("Type mismatch for '{key}': stored {stored}, requested {requested}")]
    TypeMismatch {
        key: String,
        stored: String,
        requested: String,
    },

    /// Payload is corrupt or its type is unknown to this process
    #[error("Decode error: {0}")]
    Decode(String),

    /// Value could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Range query over a field with no secondary index
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// Rejected before any I/O
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<BackendError> for CacheError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Timeout(msg) | BackendError::Connection(msg) => {
                CacheError::BackendUnavailable(msg)
            }
            BackendError::RecordExists(key) => CacheError::AlreadyExists(key),
            BackendError::RecordNotFound(key) => CacheError::NotFound(key),
            BackendError::IndexNotFound(bin) => CacheError::IndexNotFound(bin),
            BackendError::InvalidArgument(msg) => CacheError::InvalidArgument(msg),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidArgument(_) | CacheError::IndexNotFound(_) => {
                StatusCode::BAD_REQUEST
            }
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::AlreadyExists(_) => StatusCode::CONFLICT,
            CacheError::TypeMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            CacheError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Decode(_) | CacheError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_errors_collapse_to_unavailable() {
        let timeout: CacheError = BackendError::Timeout("2000ms".into()).into();
        let conn: CacheError = BackendError::Connection("refused".into()).into();
        assert!(matches!(timeout, CacheError::BackendUnavailable(_)));
        assert!(matches!(conn, CacheError::BackendUnavailable(_)));
    }

    #[test]
    fn test_policy_violations_stay_distinct() {
        let exists: CacheError = BackendError::RecordExists("k".into()).into();
        let missing: CacheError = BackendError::RecordNotFound("k".into()).into();
        assert!(matches!(exists, CacheError::AlreadyExists(k) if k == "k"));
        assert!(matches!(missing, CacheError::NotFound(k) if k == "k"));
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (CacheError::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
            (CacheError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (CacheError::AlreadyExists("x".into()), StatusCode::CONFLICT),
            (
                CacheError::BackendUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                CacheError::TypeMismatch {
                    key: "k".into(),
                    stored: "a".into(),
                    requested: "b".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
