//! Cache Module
//!
//! Named caches that store typed values as tagged binary records, with
//! sliding TTL expiration on reads.

mod named;
mod stats;
mod value;


// Re-export public types
pub use named::Cache;
pub use stats::{CacheStats, StatsRecorder};
pub use value::{ValueWrapper, NIL_SENTINEL, PAYLOAD_BIN, TYPE_TAG_BIN};
