//! Time-bounded registry of open database connections.
//!
//! The clock is passed in by the caller so expiry is deterministic under
//! test. An entry lives for `ttl` from the moment it was stored; reading it
//! does not extend its life.

use std::collections::HashMap;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

pub struct ConnectionCache<V> {
    ttl: Duration,
    entries: HashMap<String, Entry<V>>,
}

impl<V: Clone> ConnectionCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Store `value` under `id`, returning the value it replaced.
    pub fn put(&mut self, id: impl Into<String>, value: V, now: Instant) -> Option<V> {
        self.entries
            .insert(
                id.into(),
                Entry {
                    value,
                    stored_at: now,
                },
            )
            .map(|e| e.value)
    }

    /// Look up a live entry. Expired entries read as absent even before
    /// they are evicted.
    pub fn get(&self, id: &str, now: Instant) -> Option<V> {
        self.entries
            .get(id)
            .filter(|e| !self.is_expired(e, now))
            .map(|e| e.value.clone())
    }

    pub fn remove(&mut self, id: &str) -> Option<V> {
        self.entries.remove(id).map(|e| e.value)
    }

    /// Drop every expired entry and hand the values back so the caller can
    /// release them.
    pub fn evict(&mut self, now: Instant) -> Vec<(String, V)> {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| self.is_expired(e, now))
            .map(|(id, _)| id.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|id| self.entries.remove(&id).map(|e| (id, e.value)))
            .collect()
    }

    /// Remove every entry, expired or not.
    pub fn drain(&mut self) -> Vec<(String, V)> {
        self.entries.drain().map(|(id, e)| (id, e.value)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &Entry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) > self.ttl
    }
}
