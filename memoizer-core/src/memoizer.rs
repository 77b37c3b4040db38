//! # Memoizer
//!
//! The cache facade: `get`, `set`, `clear` and `clear_all` over a scoped
//! store, with statistics and per-entry expiry.

use std::any::type_name;
use std::sync::{Arc, Weak};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use crate::cache_entry::{clone_value, CacheEntry};
use crate::expiry::ExpiryTimer;
use crate::store::ScopedStore;
use crate::{CacheIds, CacheKey, Cached, MemoizeError, MemoizerStats, Result, Scope, SetOptions, StatsSnapshot};

static GLOBAL: Lazy<Memoizer> = Lazy::new(Memoizer::new);

struct Inner {
    store: Mutex<ScopedStore>,
    stats: Arc<MemoizerStats>,
}

/// A scope-aware memoization cache.
///
/// Values are stored per [`Scope`] under a [`CacheKey`] derived from the
/// call's id components. `Memoizer` is a cheap handle; clones share the
/// same cache. Most code uses the process-wide instance returned by
/// [`Memoizer::global`], which every memoized function shares.
///
/// # Thread Safety
///
/// All operations, including the eviction step of an expiring entry, run to
/// completion under one `parking_lot::Mutex`, so each of them is atomic with
/// respect to the others. Cached values are cloned and dropped after that
/// lock is released, so a value's `Clone` or `Drop` may itself use the
/// cache.
///
/// # Examples
///
/// ```
/// use memoizer_core::{Cached, Memoizer, Scope, SetOptions};
///
/// let cache = Memoizer::new();
/// let scope = Scope::new("area");
///
/// assert_eq!(cache.get::<u64, _>(&scope, &(3, 4)).unwrap(), None);
///
/// cache.set(&scope, &(3, 4), Some(12u64), SetOptions::new()).unwrap();
/// assert_eq!(cache.get::<u64, _>(&scope, &(3, 4)).unwrap(), Some(Cached::Value(12)));
///
/// let stats = cache.stats();
/// assert_eq!((stats.gets, stats.gets_hits, stats.gets_misses), (2, 1, 1));
/// ```
#[derive(Clone)]
pub struct Memoizer {
    inner: Arc<Inner>,
}

impl Memoizer {
    /// Creates an empty, independent cache.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                store: Mutex::new(ScopedStore::default()),
                stats: Arc::new(MemoizerStats::new()),
            }),
        }
    }

    /// The process-wide cache.
    ///
    /// Created on first use and alive until the process exits. It is only
    /// ever reset through [`Memoizer::clear_all`].
    pub fn global() -> &'static Memoizer {
        &GLOBAL
    }

    /// Looks up the value cached for `ids` in `scope`.
    ///
    /// Returns `Ok(None)` on a miss. A hit comes back as
    /// [`Cached::Deferred`] if the value was stored with
    /// `is_deferred_result`, otherwise as [`Cached::Value`]. Looking up a
    /// scope for the first time registers it, even on a miss.
    ///
    /// # Errors
    ///
    /// [`MemoizeError::NotSerializable`] if an id component cannot be
    /// serialized, [`MemoizeError::ValueTypeMismatch`] if the cached value is
    /// not a `V`. Neither changes any counter.
    pub fn get<V, I>(&self, scope: &Scope, ids: &I) -> Result<Option<Cached<V>>>
    where
        V: Clone + Send + Sync + 'static,
        I: CacheIds + ?Sized,
    {
        let key = CacheKey::derive(ids)?;
        self.get_keyed(scope, &key)
    }

    /// Like [`Memoizer::get`], for a key that was already derived.
    pub fn get_keyed<V>(&self, scope: &Scope, key: &CacheKey) -> Result<Option<Cached<V>>>
    where
        V: Clone + Send + Sync + 'static,
    {
        let (shared, is_deferred_result) = {
            let mut store = self.inner.store.lock();
            let bucket = store.bucket_or_create(scope);

            let Some(entry) = bucket.get(key) else {
                self.inner.stats.record_miss();
                debug!(scope = %scope, key = %key, "cache miss");
                return Ok(None);
            };

            let shared = entry
                .shared_value::<V>()
                .ok_or_else(|| MemoizeError::ValueTypeMismatch {
                    scope: scope.name().to_string(),
                    expected: type_name::<V>(),
                })?;

            self.inner.stats.record_hit();
            trace!(
                scope = %scope,
                key = %key,
                deferred = entry.is_deferred_result(),
                "cache hit"
            );
            (shared, entry.is_deferred_result())
        };

        let Some(value) = clone_value::<V>(&shared) else {
            return Err(MemoizeError::ValueTypeMismatch {
                scope: scope.name().to_string(),
                expected: type_name::<V>(),
            });
        };
        Ok(Some(if is_deferred_result {
            Cached::Deferred(value)
        } else {
            Cached::Value(value)
        }))
    }

    /// Caches `value` for `ids` in `scope`.
    ///
    /// `None` is the undefined value: storing it is a no-op that touches
    /// neither the store nor the counters, even if an entry already exists.
    /// Overwriting an entry cancels its pending expiry before the new one,
    /// if any, is scheduled.
    ///
    /// # Errors
    ///
    /// [`MemoizeError::NotSerializable`] if an id component cannot be
    /// serialized. The cache is left untouched.
    pub fn set<V, I>(&self, scope: &Scope, ids: &I, value: Option<V>, options: SetOptions) -> Result<()>
    where
        V: Send + Sync + 'static,
        I: CacheIds + ?Sized,
    {
        let Some(value) = value else {
            warn!(scope = %scope, "ignoring attempt to cache an undefined value");
            return Ok(());
        };

        let key = CacheKey::derive(ids)?;
        self.insert(scope, key, value, options);
        Ok(())
    }

    /// Like [`Memoizer::set`], for a key that was already derived.
    pub fn set_keyed<V>(&self, scope: &Scope, key: CacheKey, value: Option<V>, options: SetOptions)
    where
        V: Send + Sync + 'static,
    {
        match value {
            Some(value) => self.insert(scope, key, value, options),
            None => warn!(scope = %scope, key = %key, "ignoring attempt to cache an undefined value"),
        }
    }

    fn insert<V>(&self, scope: &Scope, key: CacheKey, value: V, options: SetOptions)
    where
        V: Send + Sync + 'static,
    {
        let mut store = self.inner.store.lock();
        let bucket = store.bucket_or_create(scope);

        // the previous timer is cancelled before a new one is scheduled, its
        // value is dropped once the lock is released
        let previous = match bucket.remove(&key) {
            Some(previous) => {
                self.inner.stats.record_overwrite();
                trace!(
                    scope = %scope,
                    key = %key,
                    had_expiry = previous.has_pending_expiry(),
                    "overwriting cached value"
                );
                Some(previous.into_value())
            }
            None => {
                self.inner.stats.record_created();
                debug!(scope = %scope, key = %key, "caching new value");
                None
            }
        };

        if options.is_deferred_result {
            debug!(scope = %scope, key = %key, "value marked as deferred result");
        }

        let expiry = match (options.expiry(), options.max_age_ms) {
            (Some(max_age), _) => self.schedule_expiry(scope, &key, max_age),
            (None, Some(max_age_ms)) => {
                warn!(
                    scope = %scope,
                    key = %key,
                    max_age_ms,
                    "ignoring non-positive max age, value will not expire"
                );
                None
            }
            (None, None) => None,
        };

        let entry = CacheEntry::new(value, options.is_deferred_result).with_expiry(expiry);
        bucket.insert(key, entry);
        drop(store);
        drop(previous);
    }

    fn schedule_expiry(
        &self,
        scope: &Scope,
        key: &CacheKey,
        max_age: std::time::Duration,
    ) -> Option<ExpiryTimer> {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let timer_scope = scope.clone();
        let timer_key = key.clone();

        let timer = ExpiryTimer::schedule(max_age, Arc::clone(&self.inner.stats), move |timer_id| {
            if let Some(inner) = inner.upgrade() {
                Memoizer { inner }.expire(&timer_scope, &timer_key, timer_id);
            }
        });

        match &timer {
            Some(_) => debug!(
                scope = %scope,
                key = %key,
                max_age_ms = max_age.as_millis() as u64,
                "scheduled expiry"
            ),
            None => error!(
                scope = %scope,
                key = %key,
                "no runtime available for expiry, value will not expire"
            ),
        }
        timer
    }

    fn expire(&self, scope: &Scope, key: &CacheKey, timer_id: u64) {
        let mut store = self.inner.store.lock();
        let expired = store
            .bucket_mut(scope)
            .and_then(|bucket| bucket.remove_expired(key, timer_id));

        // the bucket itself stays registered even when it is now empty
        let value = expired.map(|entry| {
            debug!(scope = %scope, key = %key, "cached value expired");
            entry.expire()
        });
        drop(store);
        drop(value);
    }

    /// Removes every entry of each given scope, cancelling their pending
    /// expiries.
    ///
    /// Counts as one clear regardless of how many scopes are passed. Scopes
    /// that were never used are skipped. Other counters are untouched.
    pub fn clear<'a, I>(&self, scopes: I)
    where
        I: IntoIterator<Item = &'a Scope>,
    {
        let mut removed = Vec::new();
        let mut store = self.inner.store.lock();
        self.inner.stats.record_clear();

        for scope in scopes {
            match store.bucket_mut(scope) {
                Some(bucket) => {
                    let values = bucket.clear();
                    debug!(scope = %scope, removed = values.len(), "cleared scope");
                    removed.extend(values);
                }
                None => debug!(scope = %scope, "cleared scope that was never cached"),
            }
        }
        drop(store);
        drop(removed);
    }

    /// Empties the cache and resets every counter to zero.
    ///
    /// All scopes are dropped, not just emptied, and all pending expiries
    /// are cancelled.
    pub fn clear_all(&self) {
        let mut store = self.inner.store.lock();
        let (scopes, removed) = store.clear_all();
        self.inner.stats.reset();
        debug!(scopes, entries = removed.len(), "cleared all scopes");
        drop(store);
        drop(removed);
    }

    /// A consistent copy of all counters.
    pub fn stats(&self) -> StatsSnapshot {
        let store = self.inner.store.lock();
        self.inner
            .stats
            .snapshot(store.cached_entries(), store.cached_scopes())
    }

    /// Number of entries across all scopes.
    pub fn cached_entries(&self) -> usize {
        self.inner.store.lock().cached_entries()
    }

    /// Number of registered scopes, including empty ones.
    pub fn cached_scopes(&self) -> usize {
        self.inner.store.lock().cached_scopes()
    }
}

impl Default for Memoizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memoizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memoizer")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
