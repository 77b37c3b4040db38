//! # Memoizer
//!
//! A scope-aware memoization cache for Rust with time-to-live eviction and
//! first-class support for asynchronous results.
//!
//! ## Features
//!
//! - **Easy to use**: Add `#[memoize]` to any function, method or `async fn`
//! - **Deterministic keys**: Arguments are serialized with `serde` and hashed
//! - **TTL support**: Entries can expire after `max_age_ms` milliseconds
//! - **Result-aware**: Only successful `Result::Ok` values are cached
//! - **Observable**: Hit, miss, set, clear and expiry counters
//!
//! ## Quick Start
//!
//! ```rust
//! use memoizer::memoize;
//!
//! #[memoize(name = "docs::shipping_quote", max_age_ms = 30_000)]
//! fn shipping_quote(country: String, weight_grams: u32) -> u64 {
//!     // an expensive rate lookup
//!     let zone = country.len() as u64;
//!     zone * 150 + u64::from(weight_grams) / 10
//! }
//!
//! let first = shipping_quote("PT".to_string(), 1200);
//! // served from the cache for the next 30 seconds
//! let again = shipping_quote("PT".to_string(), 1200);
//! assert_eq!(first, again);
//!
//! // forget this function's quotes only
//! memoizer::clear_named("docs::shipping_quote");
//! ```
//!
//! ## Wrapping Closures
//!
//! Functions that are not declared in your crate can be wrapped at runtime.
//! The wrapper takes the arguments as a tuple:
//!
//! ```rust
//! use memoizer::{memoize, MemoizeOptions};
//!
//! let slow_square = |x: u64| x * x;
//! let square = memoize(slow_square, MemoizeOptions::new().max_age_ms(5_000));
//!
//! assert_eq!(square.call((12u64,)).unwrap().into_value(), 144);
//! ```
//!
//! ## Using the Cache Directly
//!
//! ```rust
//! use memoizer::{Cached, Memoizer, Scope, SetOptions};
//!
//! let cache = Memoizer::global();
//! let scope = Scope::new("geocode");
//!
//! cache.set(&scope, &("Main St", 12), Some((51.5, -0.1)), SetOptions::new()).unwrap();
//! assert_eq!(
//!     cache.get::<(f64, f64), _>(&scope, &("Main St", 12)).unwrap(),
//!     Some(Cached::Value((51.5, -0.1)))
//! );
//! ```
//!
//! ## Asynchronous Results
//!
//! An `async fn` caches the awaited value. Cached results of asynchronous
//! functions are deferred results, which synchronous readers of the same
//! scope receive as [`Cached::Deferred`] and can `.await` in turn:
//!
//! ```rust
//! use memoizer::{memoize_async, Cached, MemoizeOptions, Memoizer};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let cache = Memoizer::new();
//! let profile = memoize_async(
//!     |user_id: u64| async move { format!("profile-{user_id}") },
//!     MemoizeOptions::new().max_age_ms(60_000),
//! )
//! .with_memoizer(cache.clone());
//!
//! assert_eq!(profile.call((7u64,)).await.unwrap(), "profile-7");
//!
//! let hit = cache.get::<String, _>(profile.scope(), &(7u64,)).unwrap();
//! assert!(matches!(hit, Some(Cached::Deferred(_))));
//! # });
//! ```
//!
//! ## Error Handling
//!
//! Functions returning `Result<T, E>` cache `Ok` values only, so a failed
//! call is retried the next time:
//!
//! ```rust
//! use memoizer::memoize;
//!
//! #[memoize(name = "docs::parse_port")]
//! fn parse_port(raw: String) -> Result<u16, String> {
//!     raw.parse::<u16>().map_err(|err| err.to_string())
//! }
//!
//! assert_eq!(parse_port("8080".to_string()), Ok(8080));
//! assert!(parse_port("http".to_string()).is_err());
//! ```

pub use memoizer_core::*;
pub use memoizer_macros::memoize;

/// Items used by code generated by `#[memoize]`.
#[doc(hidden)]
pub mod __private {
    pub use memoizer_core::memoize::derive_key_or_warn;
    pub use once_cell::sync::Lazy;
    pub use tracing;
}

/// Statistics of the process-wide cache.
///
/// # Examples
///
/// ```rust
/// let stats = memoizer::stats();
/// println!("hit rate: {:.2}%", stats.hit_rate() * 100.0);
/// ```
pub fn stats() -> StatsSnapshot {
    Memoizer::global().stats()
}

/// Clears every scope registered under `name` in the process-wide cache.
///
/// `#[memoize]` functions register their scope under their `name`
/// attribute, or under their module path and function name. Other scopes
/// and all statistics except the clear counter are left untouched.
///
/// # Examples
///
/// ```rust
/// use memoizer::memoize;
///
/// #[memoize(name = "docs::tax_rate")]
/// fn tax_rate(region: String) -> f64 {
///     if region == "EU" { 0.21 } else { 0.0 }
/// }
///
/// tax_rate("EU".to_string());
/// memoizer::clear_named("docs::tax_rate");
/// ```
pub fn clear_named(name: &str) {
    Memoizer::global().clear(&Scope::named(name))
}

/// Empties the process-wide cache and resets its statistics.
///
/// Every function memoized with `#[memoize]`, [`memoize`](fn@memoize) or
/// [`memoize_async`] starts from scratch afterwards.
pub fn clear_all() {
    Memoizer::global().clear_all()
}
