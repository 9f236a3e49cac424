//! Policy Module
//!
//! Per-operation existence, durability and timeout settings passed to the
//! backend with every call.

use std::time::Duration;

/// Timeout applied to every store operation except index creation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

// == Write Mode ==
/// Existence semantics a caller picks per `put`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Create or overwrite unconditionally
    UpdateAlways,
    /// Fail with `AlreadyExists` if the key is present
    CreateOnly,
}

// == Record Exists Action ==
/// What the backend does when the target record already exists (or not).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordExistsAction {
    /// Create or merge into the existing record
    Update,
    /// Merge into the existing record; fail if absent
    UpdateOnly,
    /// Create; fail if present
    CreateOnly,
}

// == Commit Level ==
/// How many replicas must acknowledge a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitLevel {
    All,
    Master,
}

// == Write Policy ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePolicy {
    pub exists: RecordExistsAction,
    pub commit_level: CommitLevel,
    /// TTL in seconds applied by this write; None leaves the record's TTL as is
    pub expiration: Option<u32>,
    /// Zero disables the timeout
    pub total_timeout: Duration,
}

impl WritePolicy {
    fn new(exists: RecordExistsAction, commit_level: CommitLevel, timeout: Duration) -> Self {
        Self {
            exists,
            commit_level,
            expiration: None,
            total_timeout: timeout,
        }
    }

    fn with_expiration(mut self, expiration: u32) -> Self {
        self.expiration = Some(expiration);
        self
    }
}

// == Read Policy ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPolicy {
    pub total_timeout: Duration,
}

// == Scan Policy ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPolicy {
    pub total_timeout: Duration,
}

// == Store Policies ==
/// The fixed set of policies one record store uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePolicies {
    pub read: ReadPolicy,
    pub scan: ScanPolicy,
    /// Plain `put`: update, all replicas, TTL
    pub write_update: WritePolicy,
    /// Create-only `put`: all replicas, TTL
    pub write_create_only: WritePolicy,
    /// TTL refresh: master only
    pub touch: WritePolicy,
    /// Record and scan deletes: master only
    pub delete: WritePolicy,
    /// Single-field removal: master only, record must exist
    pub delete_field: WritePolicy,
    /// Index builds wait without a deadline
    pub index_timeout: Duration,
}

impl StorePolicies {
    /// Builds the policy set for a store with the given TTL in seconds.
    pub fn new(expiration: u32, timeout: Duration) -> Self {
        Self {
            read: ReadPolicy {
                total_timeout: timeout,
            },
            scan: ScanPolicy {
                total_timeout: timeout,
            },
            write_update: WritePolicy::new(RecordExistsAction::Update, CommitLevel::All, timeout)
                .with_expiration(expiration),
            write_create_only: WritePolicy::new(
                RecordExistsAction::CreateOnly,
                CommitLevel::All,
                timeout,
            )
            .with_expiration(expiration),
            touch: WritePolicy::new(RecordExistsAction::UpdateOnly, CommitLevel::Master, timeout)
                .with_expiration(expiration),
            delete: WritePolicy::new(RecordExistsAction::Update, CommitLevel::Master, timeout),
            delete_field: WritePolicy::new(
                RecordExistsAction::UpdateOnly,
                CommitLevel::Master,
                timeout,
            ),
            index_timeout: Duration::ZERO,
        }
    }

    /// Policy for a caller-selected write mode.
    pub fn for_mode(&self, mode: WriteMode) -> &WritePolicy {
        match mode {
            WriteMode::UpdateAlways => &self.write_update,
            WriteMode::CreateOnly => &self.write_create_only,
        }
    }
}
