//! Stored Entry Module
//!
//! Record state held by the in-memory backend, with TTL support.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use super::record::{Bin, FieldValue, Record};

// == Stored Entry ==
/// A record as the in-memory backend keeps it.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// Field values, never `Nil`
    pub bins: HashMap<String, FieldValue>,
    /// Write counter
    pub generation: u32,
    /// Expiration timestamp, None = no expiration
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredEntry {
    // == Constructor ==
    /// Creates an entry from the written bins.
    ///
    /// # Arguments
    /// * `bins` - Fields to store; `Nil` bins are skipped
    /// * `ttl_seconds` - TTL in seconds, 0 = never expires
    pub fn new(bins: &[Bin], ttl_seconds: u32) -> Self {
        let mut entry = Self {
            bins: HashMap::with_capacity(bins.len()),
            generation: 0,
            expires_at: None,
        };
        entry.apply(bins);
        entry.refresh(ttl_seconds);
        entry
    }

    // == Apply ==
    /// Merges bins into the entry; `Nil` removes a field.
    pub fn apply(&mut self, bins: &[Bin]) {
        for bin in bins {
            match &bin.value {
                FieldValue::Nil => {
                    self.bins.remove(&bin.name);
                }
                value => {
                    self.bins.insert(bin.name.clone(), value.clone());
                }
            }
        }
        self.generation = self.generation.wrapping_add(1);
    }

    // == Refresh ==
    /// Restarts the TTL from now.
    pub fn refresh(&mut self, ttl_seconds: u32) {
        self.expires_at = if ttl_seconds == 0 {
            None
        } else {
            Some(Utc::now() + Duration::seconds(i64::from(ttl_seconds)))
        };
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    /// Snapshot handed to callers.
    pub fn to_record(&self) -> Record {
        Record {
            bins: self.bins.clone(),
            generation: self.generation,
            expires_at: self.expires_at,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = StoredEntry::new(&[Bin::new("a", 1)], 0);

        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
        assert_eq!(entry.generation, 1);
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = StoredEntry::new(&[Bin::new("a", 1)], 60);

        assert!(entry.expires_at.is_some());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = StoredEntry::new(&[Bin::new("a", 1)], 1);

        assert!(!entry.is_expired());

        sleep(std::time::Duration::from_millis(1100));

        assert!(entry.is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let mut entry = StoredEntry::new(&[Bin::new("a", 1)], 0);
        let now = Utc::now();
        entry.expires_at = Some(now);

        assert!(entry.is_expired_at(now), "Entry should be expired at boundary");
    }

    #[test]
    fn test_apply_merges_and_removes() {
        let mut entry = StoredEntry::new(&[Bin::new("A", 1), Bin::new("B", 2)], 0);
        entry.apply(&[Bin::null("B"), Bin::new("C", "three")]);

        assert_eq!(entry.bins.len(), 2);
        assert!(entry.bins.contains_key("A"));
        assert!(!entry.bins.contains_key("B"));
        assert_eq!(entry.generation, 2);
    }

    #[test]
    fn test_nil_bins_not_stored_on_create() {
        let entry = StoredEntry::new(&[Bin::new("A", 1), Bin::null("B")], 0);
        assert_eq!(entry.bins.len(), 1);
    }
}
