//! First-seen-wins store of accepted business records.

use std::collections::HashSet;

use mapsweep_shared::{BusinessRecord, IdentityKey, Result};

/// Holds every accepted record exactly once, keyed by [`IdentityKey`].
///
/// Re-inserting a known key is a no-op even when the new record's fields
/// differ; records are never merged.
#[derive(Debug, Default)]
pub struct DedupStore {
    seen: HashSet<IdentityKey>,
    records: Vec<BusinessRecord>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a record with this key has already been accepted.
    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.seen.contains(key)
    }

    /// Accept `record` unless its key is already present.
    ///
    /// Returns `Ok(true)` if the record was newly added, `Ok(false)` for a
    /// duplicate, and a parse error if no identity key can be derived.
    pub fn insert(&mut self, record: BusinessRecord) -> Result<bool> {
        if !self.seen.insert(record.identity_key()?) {
            return Ok(false);
        }
        self.records.push(record);
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Accepted records, in insertion order.
    pub fn into_records(self) -> Vec<BusinessRecord> {
        self.records
    }
}
