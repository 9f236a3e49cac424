//! Record Module
//!
//! Keys, fields and records exchanged with the backend.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

// == Record Key ==
/// Identifies one record: `(namespace, partition, key)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub namespace: String,
    pub partition: String,
    pub key: String,
}

impl RecordKey {
    pub fn new(
        namespace: impl Into<String>,
        partition: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            partition: partition.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.partition, self.key)
    }
}

// == Field Value ==
/// Value held by one field of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Integer(i32),
    Long(i64),
    Blob(Vec<u8>),
    /// Write-only marker: removes the field instead of storing a value
    Nil,
}

impl FieldValue {
    /// Numeric view used by range filters.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(i64::from(*v)),
            FieldValue::Long(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Long(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        FieldValue::Blob(value)
    }
}

// == Bin ==
/// A named field to write.
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub name: String,
    pub value: FieldValue,
}

impl Bin {
    pub fn new(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// A bin that deletes `name` when written.
    pub fn null(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FieldValue::Nil,
        }
    }
}

// == Record ==
/// A record as read back from the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub bins: HashMap<String, FieldValue>,
    /// Incremented on every write
    pub generation: u32,
    /// None = never expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.bins.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.bins.get(name) {
            Some(FieldValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Reads an integer field, widening 32-bit values.
    pub fn get_long(&self, name: &str) -> Option<i64> {
        self.bins.get(name).and_then(FieldValue::as_i64)
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        match self.bins.get(name) {
            Some(FieldValue::Integer(v)) => Some(*v),
            Some(FieldValue::Long(v)) => i32::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn get_blob(&self, name: &str) -> Option<&[u8]> {
        match self.bins.get(name) {
            Some(FieldValue::Blob(b)) => Some(b),
            _ => None,
        }
    }

    /// Remaining lifetime in whole seconds, or None if the record never expires.
    pub fn ttl(&self) -> Option<u64> {
        self.expires_at.map(|at| {
            let remaining = at.signed_duration_since(Utc::now()).num_seconds();
            remaining.max(0) as u64
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(bins: Vec<Bin>) -> Record {
        Record {
            bins: bins.into_iter().map(|b| (b.name, b.value)).collect(),
            generation: 1,
            expires_at: None,
        }
    }

    #[test]
    fn test_typed_accessors() {
        let r = record(vec![
            Bin::new("name", "alpha"),
            Bin::new("count", 7),
            Bin::new("big", 10_000_000_000i64),
            Bin::new("raw", vec![1u8, 2, 3]),
        ]);

        assert_eq!(r.get_str("name"), Some("alpha"));
        assert_eq!(r.get_int("count"), Some(7));
        assert_eq!(r.get_long("count"), Some(7));
        assert_eq!(r.get_long("big"), Some(10_000_000_000));
        assert_eq!(r.get_int("big"), None);
        assert_eq!(r.get_blob("raw"), Some(&[1u8, 2, 3][..]));
        assert_eq!(r.get_str("count"), None);
        assert!(r.get("missing").is_none());
    }

    #[test]
    fn test_ttl_without_expiration() {
        assert_eq!(record(vec![Bin::new("a", 1)]).ttl(), None);
    }

    #[test]
    fn test_ttl_counts_down() {
        let mut r = record(vec![Bin::new("a", 1)]);
        r.expires_at = Some(Utc::now() + chrono::Duration::seconds(60));
        let ttl = r.ttl().unwrap();
        assert!((59..=60).contains(&ttl));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(RecordKey::new("cache", "ITF", "k1").to_string(), "cache:ITF:k1");
    }
}
