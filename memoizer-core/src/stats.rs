use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache statistics for observing memoizer behaviour.
///
/// Counters are atomics with `Relaxed` ordering so they can be read without
/// taking the store lock. Every mutation happens while the owning
/// [`Memoizer`](crate::Memoizer) holds its store lock, so a snapshot taken
/// under that lock is consistent.
///
/// # Examples
///
/// ```
/// use memoizer_core::MemoizerStats;
///
/// let stats = MemoizerStats::new();
///
/// stats.record_hit();
/// stats.record_hit();
/// stats.record_miss();
///
/// assert_eq!(stats.gets(), 3);
/// assert_eq!(stats.gets_hits(), 2);
/// assert!((stats.hit_rate() - 0.6666).abs() < 0.001);
/// ```
#[derive(Debug, Default)]
pub struct MemoizerStats {
    gets: AtomicU64,
    gets_hits: AtomicU64,
    gets_misses: AtomicU64,
    sets: AtomicU64,
    sets_created: AtomicU64,
    sets_overwrites: AtomicU64,
    clears: AtomicU64,
    expirations: AtomicU64,
    pending_expirations: AtomicU64,
}

impl MemoizerStats {
    /// Creates a new `MemoizerStats` instance with zero counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a `get` that found an entry.
    #[inline]
    pub fn record_hit(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
        self.gets_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a `get` that found nothing.
    #[inline]
    pub fn record_miss(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
        self.gets_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a `set` that created a new entry.
    #[inline]
    pub fn record_created(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
        self.sets_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a `set` that replaced an existing entry.
    #[inline]
    pub fn record_overwrite(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
        self.sets_overwrites.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_clear(&self) {
        self.clears.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a newly scheduled expiry.
    #[inline]
    pub fn record_scheduled(&self) {
        self.pending_expirations.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a scheduled expiry that was cancelled before it fired.
    #[inline]
    pub fn record_cancelled(&self) {
        self.decrement_pending();
    }

    /// Records a scheduled expiry that fired and evicted its entry.
    #[inline]
    pub fn record_expired(&self) {
        self.decrement_pending();
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    fn decrement_pending(&self) {
        let _ = self
            .pending_expirations
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |pending| {
                Some(pending.saturating_sub(1))
            });
    }

    #[inline]
    pub fn gets(&self) -> u64 {
        self.gets.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn gets_hits(&self) -> u64 {
        self.gets_hits.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn gets_misses(&self) -> u64 {
        self.gets_misses.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sets(&self) -> u64 {
        self.sets.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sets_created(&self) -> u64 {
        self.sets_created.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sets_overwrites(&self) -> u64 {
        self.sets_overwrites.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn clears(&self) -> u64 {
        self.clears.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn expirations(&self) -> u64 {
        self.expirations.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn pending_expirations(&self) -> u64 {
        self.pending_expirations.load(Ordering::Relaxed)
    }

    /// Fraction of `get` calls that hit (0.0 to 1.0). Returns 0.0 if there
    /// have been no lookups.
    #[inline]
    pub fn hit_rate(&self) -> f64 {
        let total = self.gets();
        if total == 0 {
            0.0
        } else {
            self.gets_hits() as f64 / total as f64
        }
    }

    /// Fraction of `get` calls that missed.
    #[inline]
    pub fn miss_rate(&self) -> f64 {
        1.0 - self.hit_rate()
    }

    /// Resets every counter to zero, `clears` and `pending_expirations`
    /// included.
    pub fn reset(&self) {
        for counter in [
            &self.gets,
            &self.gets_hits,
            &self.gets_misses,
            &self.sets,
            &self.sets_created,
            &self.sets_overwrites,
            &self.clears,
            &self.expirations,
            &self.pending_expirations,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self, cached_entries: usize, cached_scopes: usize) -> StatsSnapshot {
        StatsSnapshot {
            gets: self.gets(),
            gets_hits: self.gets_hits(),
            gets_misses: self.gets_misses(),
            sets: self.sets(),
            sets_created: self.sets_created(),
            sets_overwrites: self.sets_overwrites(),
            clears: self.clears(),
            expirations: self.expirations(),
            pending_expirations: self.pending_expirations(),
            cached_entries,
            cached_scopes,
        }
    }
}

/// Point-in-time copy of every memoizer counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    /// Number of `get` calls.
    pub gets: u64,
    /// `get` calls that found an entry.
    pub gets_hits: u64,
    /// `get` calls that found nothing.
    pub gets_misses: u64,
    /// `set` calls that stored a value.
    pub sets: u64,
    /// `set` calls that created a new entry.
    pub sets_created: u64,
    /// `set` calls that replaced an existing entry.
    pub sets_overwrites: u64,
    /// `clear` calls since the last `clear_all`.
    pub clears: u64,
    /// Entries evicted because their max age elapsed.
    pub expirations: u64,
    /// Entries with an expiry that has not fired yet.
    pub pending_expirations: u64,
    /// Entries across all scopes.
    pub cached_entries: usize,
    /// Known scopes, including scopes that only ever saw a `get`.
    pub cached_scopes: usize,
}

impl StatsSnapshot {
    pub fn hit_rate(&self) -> f64 {
        if self.gets == 0 {
            0.0
        } else {
            self.gets_hits as f64 / self.gets as f64
        }
    }

    pub fn miss_rate(&self) -> f64 {
        1.0 - self.hit_rate()
    }
}
