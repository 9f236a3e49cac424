//! Cached Value Module
//!
//! The reserved record layout for cache entries and the wrapper returned
//! by untyped reads.

use std::any::Any;
use std::fmt;

use crate::codec::ErasedValue;

/// Field holding the value's type tag.
pub const TYPE_TAG_BIN: &str = "C";

/// Field holding the encoded payload.
pub const PAYLOAD_BIN: &str = "V";

/// Type tag (and payload) written for a stored null.
pub const NIL_SENTINEL: &str = "NIL";

// == Value Wrapper ==
/// A cache hit. The wrapped value may itself be null.
#[derive(Clone)]
pub struct ValueWrapper {
    type_tag: Option<String>,
    value: Option<ErasedValue>,
}

impl ValueWrapper {
    /// Hit on an entry stored with a value.
    pub fn new(type_tag: impl Into<String>, value: ErasedValue) -> Self {
        Self {
            type_tag: Some(type_tag.into()),
            value: Some(value),
        }
    }

    /// Hit on an entry stored as null.
    pub fn null() -> Self {
        Self {
            type_tag: None,
            value: None,
        }
    }

    /// Hit on an entry whose type this process cannot decode. Carries the
    /// stored tag without a value.
    pub fn opaque(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: Some(type_tag.into()),
            value: None,
        }
    }

    pub fn is_null(&self) -> bool {
        self.type_tag.is_none()
    }

    /// Tag of the stored value, None for a stored null.
    pub fn type_tag(&self) -> Option<&str> {
        self.type_tag.as_deref()
    }

    /// The value as `T`, if it is one.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.as_ref().and_then(|v| v.downcast_ref::<T>())
    }

    /// The decoded value. None for a stored null or an opaque hit.
    pub fn value(&self) -> Option<&ErasedValue> {
        self.value.as_ref()
    }
}

impl fmt::Debug for ValueWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.type_tag {
            Some(tag) => f.debug_struct("ValueWrapper").field("type", tag).finish(),
            None => f.write_str("ValueWrapper(null)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_null_wrapper() {
        let w = ValueWrapper::null();
        assert!(w.is_null());
        assert!(w.type_tag().is_none());
        assert!(w.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_downcast() {
        let w = ValueWrapper::new("alloc::string::String", Arc::new("B".to_string()));
        assert!(!w.is_null());
        assert_eq!(w.downcast_ref::<String>().map(String::as_str), Some("B"));
        assert!(w.downcast_ref::<i64>().is_none());
    }

    #[test]
    fn test_opaque_wrapper_is_not_null() {
        let w = ValueWrapper::opaque("app::Order");
        assert!(!w.is_null());
        assert_eq!(w.type_tag(), Some("app::Order"));
        assert!(w.value().is_none());
    }
}
