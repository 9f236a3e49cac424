//! Type Tag Module
//!
//! Type tags stored next to payloads, and the table of types this process
//! can decode without the caller naming one.

use std::any::{self, Any};
use std::collections::HashMap;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use super::Codec;
use crate::error::Result;

/// A decoded value whose concrete type is only known through its tag.
pub type ErasedValue = Arc<dyn Any + Send + Sync>;

/// Decoder monomorphized for one registered type.
pub type ErasedDecoder = fn(&Codec, &[u8]) -> Result<ErasedValue>;

// == Cache Value ==
/// Values that can be stored in a cache.
pub trait CacheValue: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Returns the tag recorded for values of type `T`.
pub fn type_tag<T: ?Sized>() -> &'static str {
    any::type_name::<T>()
}

fn decode_erased<T: CacheValue>(codec: &Codec, bytes: &[u8]) -> Result<ErasedValue> {
    let value: T = codec.decode(bytes)?;
    Ok(Arc::new(value))
}

// == Type Registry ==
/// Maps type tags to decoders.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    decoders: HashMap<&'static str, ErasedDecoder>,
}

impl TypeRegistry {
    /// Creates a registry with no types.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-loaded with common scalar and collection types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register::<String>();
        registry.register::<bool>();
        registry.register::<i32>();
        registry.register::<i64>();
        registry.register::<u32>();
        registry.register::<u64>();
        registry.register::<f64>();
        registry.register::<Vec<u8>>();
        registry.register::<Vec<String>>();
        registry
    }

    /// Makes `T` decodable by tag.
    pub fn register<T: CacheValue>(&mut self) {
        self.decoders.insert(type_tag::<T>(), decode_erased::<T>);
    }

    pub fn decoder(&self, tag: &str) -> Option<ErasedDecoder> {
        self.decoders.get(tag).copied()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.decoders.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<_> = self.decoders.keys().collect();
        tags.sort();
        f.debug_struct("TypeRegistry").field("types", &tags).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_distinct_per_type() {
        assert_ne!(type_tag::<i32>(), type_tag::<i64>());
        assert_eq!(type_tag::<String>(), "alloc::string::String");
    }

    #[test]
    fn test_builtins_registered() {
        let registry = TypeRegistry::with_builtins();
        assert!(registry.contains(type_tag::<String>()));
        assert!(registry.contains(type_tag::<Vec<String>>()));
        assert!(!registry.contains(type_tag::<Vec<i32>>()));
        assert_eq!(registry.len(), 9);
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = TypeRegistry::new();
        registry.register::<u64>();
        registry.register::<u64>();
        assert_eq!(registry.len(), 1);
    }
}
