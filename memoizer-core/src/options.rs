//! # Options
//!
//! Configuration for single `set` calls, for memoized wrappers, and for
//! individual wrapper calls.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Options for [`Memoizer::set`](crate::Memoizer::set).
///
/// # Examples
///
/// ```
/// use memoizer_core::SetOptions;
/// use std::time::Duration;
///
/// let options = SetOptions::new().max_age(Duration::from_secs(2)).deferred(true);
/// assert_eq!(options.max_age_ms, Some(2000));
/// assert!(options.is_deferred_result);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Evict the entry after this many milliseconds.
    ///
    /// `None`, zero and negative values all mean "never expires"; zero and
    /// negative values are logged as ignored. Overwriting an entry replaces
    /// its previous schedule with this one.
    pub max_age_ms: Option<i64>,
    /// Hand the value back as a deferred result on later lookups.
    pub is_deferred_result: bool,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_age_ms(mut self, max_age_ms: i64) -> Self {
        self.max_age_ms = Some(max_age_ms);
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age_ms = Some(i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX));
        self
    }

    pub fn deferred(mut self, is_deferred_result: bool) -> Self {
        self.is_deferred_result = is_deferred_result;
        self
    }

    /// The eviction delay, if a positive one was requested.
    pub(crate) fn expiry(&self) -> Option<Duration> {
        self.max_age_ms
            .filter(|ms| *ms > 0)
            .map(|ms| Duration::from_millis(ms.unsigned_abs()))
    }
}

/// Options for [`memoize`](fn@crate::memoize) and
/// [`memoize_async`](crate::memoize_async).
///
/// Deserializable, so wrapper settings can come from configuration files:
///
/// ```
/// use memoizer_core::MemoizeOptions;
///
/// let options: MemoizeOptions =
///     serde_json::from_str(r#"{ "maxAgeMs": 1000, "addUseCachedOption": true }"#).unwrap();
/// assert_eq!(options, MemoizeOptions::new().max_age_ms(1000).add_use_cached_option(true));
///
/// let defaults: MemoizeOptions = serde_json::from_str("{}").unwrap();
/// assert_eq!(defaults, MemoizeOptions::default());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MemoizeOptions {
    /// Evict memoized results after this many milliseconds (`<= 0`: never).
    pub max_age_ms: Option<i64>,
    /// Honour [`CallOptions::use_cached`] on `call_with`.
    pub add_use_cached_option: bool,
}

impl MemoizeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_age_ms(mut self, max_age_ms: i64) -> Self {
        self.max_age_ms = Some(max_age_ms);
        self
    }

    pub fn add_use_cached_option(mut self, enabled: bool) -> Self {
        self.add_use_cached_option = enabled;
        self
    }

    pub(crate) fn set_options(&self, is_deferred_result: bool) -> SetOptions {
        SetOptions {
            max_age_ms: self.max_age_ms,
            is_deferred_result,
        }
    }
}

/// Per-call options for memoized wrappers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallOptions {
    /// Serve a cached result if one exists. When `false` the target always
    /// runs and its result replaces the cached one.
    pub use_cached: bool,
}

impl CallOptions {
    pub fn use_cached(use_cached: bool) -> Self {
        Self { use_cached }
    }
}

impl Default for CallOptions {
    fn default() -> Self {
        Self { use_cached: true }
    }
}
