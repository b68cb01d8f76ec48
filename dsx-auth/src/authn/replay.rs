//! Nonce replay prevention.
//!
//! A signed request stays valid for the whole skew window, so without a
//! nonce-seen cache a captured request could be replayed until it ages
//! out. The guard closes that gap.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for nonce replay detection.
///
/// # Thread Safety
///
/// Uses `&self` to allow concurrent access. Implementations should use
/// interior mutability.
///
/// # Atomicity
///
/// `check_and_insert` MUST be atomic: no other thread may observe a state
/// where the nonce has been checked but not yet inserted. Non-atomic
/// implementations create a TOCTOU race where two concurrent requests with
/// the same nonce both pass.
///
/// # Retention
///
/// Entries should be retained for at least `2 * max_skew_seconds` so a
/// request cannot be replayed at the edge of the validity window.
pub trait ReplayGuard: Send + Sync {
    /// Check whether the nonce is new for this key id and record it.
    ///
    /// Returns `true` if the nonce was new and has been recorded,
    /// `false` if this is a replay.
    fn check_and_insert(&self, key_id: &str, nonce: &str, now: i64) -> bool;
}

/// Bounded in-process replay guard with TTL eviction.
///
/// # Security Properties
///
/// - Prevents nonce reuse within the TTL window
/// - Memory-bounded via `max_entries`
/// - Lock-free concurrent access via DashMap
///
/// Timestamps are caller-supplied unix seconds, so tests can simulate the
/// passage of time without sleeping.
pub struct LruReplayGuard {
    /// (key_id, nonce) -> first-seen unix seconds.
    seen: DashMap<(String, String), i64>,
    /// Time-to-live for entries, in seconds.
    ttl_seconds: i64,
    /// Maximum entries before eviction.
    max_entries: usize,
    /// Counter for periodic cleanup (avoids cleanup on every insert).
    insert_counter: AtomicU64,
}

impl LruReplayGuard {
    /// Create a guard with the given TTL and capacity.
    ///
    /// `ttl_seconds` should be at least `2 * max_skew_seconds`.
    #[must_use]
    pub fn new(ttl_seconds: i64, max_entries: usize) -> Self {
        Self {
            seen: DashMap::with_capacity(max_entries / 4),
            ttl_seconds,
            max_entries,
            insert_counter: AtomicU64::new(0),
        }
    }

    /// Drop entries older than the TTL.
    ///
    /// Not required for correctness - expired entries are ignored on
    /// lookup - but reclaims memory.
    pub fn cleanup_expired(&self, now: i64) {
        self.seen
            .retain(|_, seen_at| now.saturating_sub(*seen_at) < self.ttl_seconds);
    }

    /// Current number of tracked nonces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether the guard is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl ReplayGuard for LruReplayGuard {
    fn check_and_insert(&self, key_id: &str, nonce: &str, now: i64) -> bool {
        let key = (key_id.to_string(), nonce.to_string());

        // Entry API gives an atomic check-and-insert (no TOCTOU window).
        let fresh = match self.seen.entry(key) {
            Entry::Occupied(entry) => {
                if now.saturating_sub(*entry.get()) < self.ttl_seconds {
                    false // replay within the window
                } else {
                    entry.replace_entry(now);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        };

        // Periodic cleanup and eviction, after releasing the entry lock.
        if fresh {
            let count = self.insert_counter.fetch_add(1, Ordering::Relaxed);
            if count % 1000 == 0 {
                self.cleanup_expired(now);
            }
            if self.seen.len() > self.max_entries {
                let victim = self.seen.iter().next().map(|entry| entry.key().clone());
                if let Some(k) = victim {
                    self.seen.remove(&k);
                }
            }
        }

        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const NOW: i64 = 1700000000;

    #[test]
    fn test_first_insert_succeeds() {
        let guard = LruReplayGuard::new(120, 1000);
        assert!(guard.check_and_insert("kid", "nonce-a", NOW));
    }

    #[test]
    fn test_replay_detected() {
        let guard = LruReplayGuard::new(120, 1000);
        assert!(guard.check_and_insert("kid", "nonce-a", NOW));
        assert!(!guard.check_and_insert("kid", "nonce-a", NOW + 5));
    }

    #[test]
    fn test_different_nonce_succeeds() {
        let guard = LruReplayGuard::new(120, 1000);
        assert!(guard.check_and_insert("kid", "nonce-a", NOW));
        assert!(guard.check_and_insert("kid", "nonce-b", NOW));
    }

    #[test]
    fn test_same_nonce_different_key_id_succeeds() {
        let guard = LruReplayGuard::new(120, 1000);
        assert!(guard.check_and_insert("kid-1", "nonce-a", NOW));
        assert!(guard.check_and_insert("kid-2", "nonce-a", NOW));
    }

    #[test]
    fn test_expired_entry_allows_reuse() {
        let guard = LruReplayGuard::new(120, 1000);
        assert!(guard.check_and_insert("kid", "nonce-a", NOW));
        // Within the TTL: replay.
        assert!(!guard.check_and_insert("kid", "nonce-a", NOW + 119));
        // Past the TTL: re-admitted.
        assert!(guard.check_and_insert("kid", "nonce-a", NOW + 120));
    }

    #[test]
    fn test_cleanup_removes_expired() {
        let guard = LruReplayGuard::new(120, 1000);
        guard.check_and_insert("kid", "nonce-a", NOW);
        assert_eq!(guard.len(), 1);
        guard.cleanup_expired(NOW + 200);
        assert!(guard.is_empty());
    }

    #[test]
    fn test_eviction_bounds_memory() {
        let max_entries = 10;
        let guard = LruReplayGuard::new(120, max_entries);
        for i in 0..(max_entries + 5) {
            guard.check_and_insert("kid", &format!("nonce-{i}"), NOW);
        }
        assert!(guard.len() <= max_entries);
    }

    #[test]
    fn test_concurrent_same_nonce_admits_exactly_one() {
        let guard = Arc::new(LruReplayGuard::new(120, 10000));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let guard = Arc::clone(&guard);
                thread::spawn(move || guard.check_and_insert("kid", "shared-nonce", NOW))
            })
            .collect();

        let results: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let admitted = results.iter().filter(|&&fresh| fresh).count();
        assert_eq!(admitted, 1, "exactly one concurrent insert should be admitted");
    }
}
