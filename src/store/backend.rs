//! Backend Module
//!
//! Contract of the remote key-value store client. A single connection is
//! shared by every record store, so implementations must be `Send + Sync`.

use async_trait::async_trait;
use thiserror::Error;

use super::policy::{ReadPolicy, ScanPolicy, WritePolicy};
use super::record::{Bin, Record, RecordKey};

// == Backend Error ==
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("timeout: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("record exists: {0}")]
    RecordExists(String),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("no index on field: {0}")]
    IndexNotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

// == Index Type ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    Numeric,
    String,
}

// == Filter ==
/// Secondary-index predicate for queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Numeric field within `[begin, end]`, inclusive
    Range { bin: String, begin: i64, end: i64 },
    Equal { bin: String, value: String },
}

impl Filter {
    pub fn range(bin: impl Into<String>, begin: i64, end: i64) -> Self {
        Filter::Range {
            bin: bin.into(),
            begin,
            end,
        }
    }

    pub fn bin(&self) -> &str {
        match self {
            Filter::Range { bin, .. } | Filter::Equal { bin, .. } => bin,
        }
    }
}

// == Statement ==
/// Query over one `(namespace, partition)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub namespace: String,
    pub partition: String,
    pub filter: Filter,
}

// == Backend Trait ==
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    async fn exists(&self, policy: &ReadPolicy, key: &RecordKey) -> BackendResult<bool>;

    async fn get(&self, policy: &ReadPolicy, key: &RecordKey) -> BackendResult<Option<Record>>;

    /// Writes all bins as one record, honoring `policy.exists` and applying
    /// `policy.expiration` when set.
    async fn put(&self, policy: &WritePolicy, key: &RecordKey, bins: &[Bin]) -> BackendResult<()>;

    /// Returns whether a record was removed.
    async fn delete(&self, policy: &WritePolicy, key: &RecordKey) -> BackendResult<bool>;

    /// Resets the record's TTL to `policy.expiration`.
    async fn touch(&self, policy: &WritePolicy, key: &RecordKey) -> BackendResult<()>;

    /// Keys of every live record in a partition.
    async fn scan_keys(
        &self,
        policy: &ScanPolicy,
        namespace: &str,
        partition: &str,
    ) -> BackendResult<Vec<RecordKey>>;

    /// Resolves once the index is built.
    async fn create_index(
        &self,
        namespace: &str,
        partition: &str,
        index_name: &str,
        bin: &str,
        index_type: IndexType,
    ) -> BackendResult<()>;

    /// Keys of records matching the statement's filter.
    async fn query(
        &self,
        policy: &ReadPolicy,
        statement: &Statement,
    ) -> BackendResult<Vec<RecordKey>>;
}
