//! Two-level scope -> key -> entry storage.

use std::collections::HashMap;

use crate::cache_entry::{CacheEntry, SharedValue};
use crate::{CacheKey, Scope};

/// Entries of one scope.
#[derive(Debug, Default)]
pub(crate) struct ScopeBucket {
    entries: HashMap<CacheKey, CacheEntry>,
}

impl ScopeBucket {
    pub(crate) fn get(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub(crate) fn insert(&mut self, key: CacheKey, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    pub(crate) fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.remove(key)
    }

    /// Removes the entry at `key` only if its eviction belongs to `timer_id`.
    pub(crate) fn remove_expired(&mut self, key: &CacheKey, timer_id: u64) -> Option<CacheEntry> {
        if self.entries.get(key)?.is_expired_by(timer_id) {
            self.entries.remove(key)
        } else {
            None
        }
    }

    /// Removes every entry, cancelling pending expiries, and returns the
    /// removed values so they can be dropped outside the store lock.
    pub(crate) fn clear(&mut self) -> Vec<SharedValue> {
        self.entries
            .drain()
            .map(|(_, entry)| entry.into_value())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Mapping from scope to bucket; the sole source of truth for cached state.
#[derive(Debug, Default)]
pub(crate) struct ScopedStore {
    buckets: HashMap<Scope, ScopeBucket>,
}

impl ScopedStore {
    /// Returns the bucket for `scope`, registering an empty one first if the
    /// scope has never been seen. This is the only way scopes are added.
    pub(crate) fn bucket_or_create(&mut self, scope: &Scope) -> &mut ScopeBucket {
        self.buckets.entry(scope.clone()).or_default()
    }

    pub(crate) fn bucket_mut(&mut self, scope: &Scope) -> Option<&mut ScopeBucket> {
        self.buckets.get_mut(scope)
    }

    /// Removes every bucket. Returns the number of scopes and the removed
    /// values.
    pub(crate) fn clear_all(&mut self) -> (usize, Vec<SharedValue>) {
        let scopes = self.buckets.len();
        let values = self
            .buckets
            .drain()
            .flat_map(|(_, mut bucket)| bucket.clear())
            .collect();
        (scopes, values)
    }

    pub(crate) fn cached_entries(&self) -> usize {
        self.buckets.values().map(ScopeBucket::len).sum()
    }

    pub(crate) fn cached_scopes(&self) -> usize {
        self.buckets.len()
    }
}
