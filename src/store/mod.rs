//! Store Module
//!
//! Access to the backing key-value store: the backend client contract,
//! write/read policies, an in-memory backend and the per-partition
//! `RecordStore`.

mod backend;
mod entry;
mod memory;
mod policy;
mod record;
mod template;

pub use backend::{Backend, BackendError, BackendResult, Filter, IndexType, Statement};
pub use entry::StoredEntry;
pub use memory::MemoryBackend;
pub use policy::{
    CommitLevel, ReadPolicy, RecordExistsAction, ScanPolicy, StorePolicies, WriteMode,
    WritePolicy, DEFAULT_TIMEOUT,
};
pub use record::{Bin, FieldValue, Record, RecordKey};
pub use template::RecordStore;
