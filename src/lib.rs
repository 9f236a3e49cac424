//! bincache - named caches over a remote key-value store
//!
//! Values are serialized with a configurable format and compression and
//! stored as tagged records with sliding TTL expiration. A registry hands
//! out one cache per `namespace:partition` name.

pub mod api;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::{Cache, CacheStats, ValueWrapper};
pub use codec::{Codec, Compression, SerializationFormat};
pub use config::{Config, RegistryConfig};
pub use error::{CacheError, Result};
pub use registry::CacheRegistry;
pub use store::{Backend, MemoryBackend, RecordStore};
pub use tasks::spawn_cleanup_task;
