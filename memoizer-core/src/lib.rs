//! # Memoizer Core
//!
//! The engine behind the `memoizer` crate: a scope-aware memoization cache
//! with per-entry time-to-live and deferred-result awareness.
//!
//! ## Features
//!
//! - **Deterministic keys**: MD5 digests of canonically serialized id components
//! - **Scoped storage**: one bucket per function, compared by identity
//! - **TTL eviction**: one cancellable timer per entry
//! - **Deferred results**: values produced asynchronously come back awaitable
//! - **Statistics**: hit, miss, set, clear and expiry counters
//!
//! ## Module Organization
//!
//! - [`key`] - Cache key derivation from id components
//! - [`scope`] - Identity handles that partition the cache
//! - [`stats`] - Counters and snapshots
//! - [`options`] - Configuration for `set` calls and wrappers
//! - [`memoizer`] - The cache facade and the process-wide instance
//! - [`memoize`](mod@memoize) - Function wrappers over the facade
//!
//! ## Example
//!
//! ```
//! use memoizer_core::{Cached, Memoizer, Scope, SetOptions};
//!
//! let cache = Memoizer::new();
//! let fetch_user = Scope::new("fetch_user");
//!
//! cache
//!     .set(&fetch_user, &(42, "eu"), Some("Ada".to_string()), SetOptions::new().max_age_ms(60_000))
//!     .unwrap();
//!
//! let hit = cache.get::<String, _>(&fetch_user, &(42, "eu")).unwrap();
//! assert_eq!(hit, Some(Cached::Value("Ada".to_string())));
//! # cache.clear_all();
//! ```
mod cache_entry;
mod cached;
mod expiry;
mod store;

pub mod error;
pub mod key;
pub mod memoize;
pub mod memoizer;
pub mod options;
pub mod scope;
pub mod stats;

pub use cached::Cached;
pub use error::{MemoizeError, Result};
pub use key::{CacheIds, CacheKey, Ids, KeyDeriver};
pub use memoize::{memoize, memoize_async, MemoizeTarget, Memoized, MemoizedAsync};
pub use memoizer::Memoizer;
pub use options::{CallOptions, MemoizeOptions, SetOptions};
pub use scope::Scope;
pub use stats::{MemoizerStats, StatsSnapshot};
