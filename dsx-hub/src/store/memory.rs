//! In-memory credential store.
//!
//! Suitable for tests and single-process deployments. Per-key operations
//! are atomic (DashMap entry API); expiry is enforced lazily on access,
//! matching how an external store would evict.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{CredentialStore, StoreError};

#[derive(Debug, Clone)]
struct Entry {
    fields: HashMap<String, String>,
    deadline: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}

/// DashMap-backed [`CredentialStore`].
///
/// Cheap to clone; clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-expired) keys.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .count()
    }

    /// Whether the store holds no live keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialStore for MemoryStore {
    fn get_fields(
        &self,
        key: &str,
        fields: &[&str],
    ) -> Result<HashMap<String, Option<String>>, StoreError> {
        let now = Instant::now();
        let entry = self.entries.get(key);
        let live = entry.filter(|entry| !entry.value().is_expired(now));

        let mut result = HashMap::with_capacity(fields.len());
        for &field in fields {
            let value = live
                .as_ref()
                .and_then(|entry| entry.value().fields.get(field).cloned());
            result.insert(field.to_string(), value);
        }
        Ok(result)
    }

    fn set_fields(&self, key: &str, fields: &[(&str, &str)]) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            fields: HashMap::new(),
            deadline: None,
        });
        // An expired entry is dead; start fresh rather than resurrecting
        // its old fields.
        if entry.is_expired(now) {
            entry.fields.clear();
            entry.deadline = None;
        }
        for &(field, value) in fields {
            entry.fields.insert(field.to_string(), value.to_string());
        }
        Ok(())
    }

    fn set_with_ttl(
        &self,
        key: &str,
        fields: &[(&str, &str)],
        ttl_seconds: u64,
    ) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            fields: HashMap::new(),
            deadline: None,
        });
        if entry.is_expired(now) {
            entry.fields.clear();
        }
        for &(field, value) in fields {
            entry.fields.insert(field.to_string(), value.to_string());
        }
        entry.deadline = Some(now + Duration::from_secs(ttl_seconds));
        Ok(())
    }

    fn ttl_remaining(&self, key: &str) -> Result<Option<u64>, StoreError> {
        let now = Instant::now();
        Ok(self.entries.get(key).and_then(|entry| {
            if entry.value().is_expired(now) {
                None
            } else {
                entry
                    .value()
                    .deadline
                    .map(|deadline| deadline.duration_since(now).as_secs())
            }
        }))
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        match self.entries.remove(key) {
            Some((_, entry)) => Ok(!entry.is_expired(now)),
            None => Ok(false),
        }
    }
}
