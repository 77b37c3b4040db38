//! # Memoize
//!
//! Wrappers that put a function in front of a [`Memoizer`].
//!
//! A wrapper derives the id components from the call's own arguments and
//! uses the wrapped function as the scope. Arguments are passed as a tuple,
//! which doubles as the id sequence:
//!
//! ```
//! use memoizer_core::{memoize, MemoizeOptions, Memoizer};
//!
//! let add = memoize(|a: u32, b: u32| a + b, MemoizeOptions::new())
//!     .with_memoizer(Memoizer::new());
//!
//! assert_eq!(add.call((2u32, 3u32)).unwrap().into_value(), 5);
//! assert_eq!(add.call((2u32, 3u32)).unwrap().into_value(), 5); // served from cache
//! ```

use std::future::Future;

use tracing::warn;

use crate::{CacheIds, CacheKey, CallOptions, Cached, MemoizeError, MemoizeOptions, Memoizer, Result, Scope};

/// A callable taking its arguments as the tuple `Args`.
///
/// Implemented for every `Fn` of up to eight arguments.
pub trait MemoizeTarget<Args> {
    type Output;

    fn invoke(&self, args: Args) -> Self::Output;
}

macro_rules! impl_memoize_target {
    ($($arg:ident),*) => {
        impl<Func, Out, $($arg),*> MemoizeTarget<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Out,
        {
            type Output = Out;

            #[allow(non_snake_case)]
            fn invoke(&self, ($($arg,)*): ($($arg,)*)) -> Out {
                (self)($($arg),*)
            }
        }
    };
}

impl_memoize_target!();
impl_memoize_target!(A);
impl_memoize_target!(A, B);
impl_memoize_target!(A, B, C);
impl_memoize_target!(A, B, C, D);
impl_memoize_target!(A, B, C, D, E);
impl_memoize_target!(A, B, C, D, E, F);
impl_memoize_target!(A, B, C, D, E, F, G);
impl_memoize_target!(A, B, C, D, E, F, G, H);

/// Wraps a synchronous function with the global cache.
///
/// Fn items and non-capturing closures are scoped by the function itself
/// ([`Scope::of`]), so memoizing the same one twice shares one set of cached
/// results. A closure that captures state gets a fresh scope per wrapper,
/// shared only by clones of that wrapper.
pub fn memoize<F: 'static>(target: F, options: MemoizeOptions) -> Memoized<F> {
    Memoized {
        core: WrapperCore::new(&target, options),
        target,
    }
}

/// Wraps an asynchronous function with the global cache.
///
/// Results are stored as deferred results, so synchronous lookups of the
/// same scope get them back as [`Cached::Deferred`].
pub fn memoize_async<F: 'static>(target: F, options: MemoizeOptions) -> MemoizedAsync<F> {
    MemoizedAsync {
        core: WrapperCore::new(&target, options),
        target,
    }
}

/// State shared by the sync and async wrappers.
#[derive(Clone, Debug)]
struct WrapperCore {
    scope: Scope,
    options: MemoizeOptions,
    memoizer: Memoizer,
}

impl WrapperCore {
    fn new<F: 'static>(target: &F, options: MemoizeOptions) -> Self {
        // instances of one capturing closure share a type but not their state
        let scope = if std::mem::size_of::<F>() == 0 {
            Scope::of(target)
        } else {
            Scope::new(std::any::type_name::<F>())
        };
        Self {
            scope,
            options,
            memoizer: Memoizer::global().clone(),
        }
    }

    fn uses_cache(&self, call: CallOptions) -> bool {
        if call.use_cached || self.options.add_use_cached_option {
            return call.use_cached;
        }
        warn!(
            scope = %self.scope,
            "use_cached = false ignored, wrapper was built without add_use_cached_option"
        );
        true
    }

    /// Derives the key and, unless the call opts out, looks it up.
    fn lookup<Args, R>(&self, args: &Args, call: CallOptions) -> Result<(CacheKey, Option<Cached<R>>)>
    where
        Args: CacheIds,
        R: Clone + Send + Sync + 'static,
    {
        let key = CacheKey::derive(args)?;
        let hit = if self.uses_cache(call) {
            self.memoizer.get_keyed::<R>(&self.scope, &key)?
        } else {
            None
        };
        Ok((key, hit))
    }

    fn store<R>(&self, key: CacheKey, value: &R, is_deferred_result: bool)
    where
        R: Clone + Send + Sync + 'static,
    {
        self.memoizer.set_keyed(
            &self.scope,
            key,
            Some(value.clone()),
            self.options.set_options(is_deferred_result),
        );
    }
}

/// A memoized synchronous function. See [`memoize`](fn@memoize).
#[derive(Clone, Debug)]
pub struct Memoized<F> {
    target: F,
    core: WrapperCore,
}

impl<F> Memoized<F> {
    /// Uses `memoizer` instead of the global cache.
    pub fn with_memoizer(mut self, memoizer: Memoizer) -> Self {
        self.core.memoizer = memoizer;
        self
    }

    pub fn scope(&self) -> &Scope {
        &self.core.scope
    }

    pub fn options(&self) -> &MemoizeOptions {
        &self.core.options
    }

    /// Calls the function through the cache.
    ///
    /// Returns [`Cached::Deferred`] when the cached value was produced by an
    /// asynchronous computation, [`Cached::Value`] otherwise.
    ///
    /// # Errors
    ///
    /// Fails if an argument cannot be serialized or the cached value has a
    /// different type. The function is not called in either case.
    pub fn call<Args, R>(&self, args: Args) -> Result<Cached<R>>
    where
        F: MemoizeTarget<Args, Output = R>,
        Args: CacheIds,
        R: Clone + Send + Sync + 'static,
    {
        self.call_with(args, CallOptions::default())
    }

    /// Like [`Memoized::call`], with per-call options.
    pub fn call_with<Args, R>(&self, args: Args, call: CallOptions) -> Result<Cached<R>>
    where
        F: MemoizeTarget<Args, Output = R>,
        Args: CacheIds,
        R: Clone + Send + Sync + 'static,
    {
        let (key, hit) = self.core.lookup::<Args, R>(&args, call)?;
        if let Some(hit) = hit {
            return Ok(hit);
        }

        let value = self.target.invoke(args);
        self.core.store(key, &value, false);
        Ok(Cached::Value(value))
    }

    /// Calls a fallible function through the cache, caching only `Ok`.
    ///
    /// Cache failures are converted into `E`. An `Err` from the function is
    /// returned as is and nothing is stored.
    pub fn try_call<Args, T, E>(&self, args: Args) -> std::result::Result<Cached<T>, E>
    where
        F: MemoizeTarget<Args, Output = std::result::Result<T, E>>,
        Args: CacheIds,
        T: Clone + Send + Sync + 'static,
        E: From<MemoizeError>,
    {
        let (key, hit) = self.core.lookup::<Args, T>(&args, CallOptions::default())?;
        if let Some(hit) = hit {
            return Ok(hit);
        }

        let value = self.target.invoke(args)?;
        self.core.store(key, &value, false);
        Ok(Cached::Value(value))
    }
}

/// A memoized asynchronous function. See [`memoize_async`].
#[derive(Clone, Debug)]
pub struct MemoizedAsync<F> {
    target: F,
    core: WrapperCore,
}

impl<F> MemoizedAsync<F> {
    /// Uses `memoizer` instead of the global cache.
    pub fn with_memoizer(mut self, memoizer: Memoizer) -> Self {
        self.core.memoizer = memoizer;
        self
    }

    pub fn scope(&self) -> &Scope {
        &self.core.scope
    }

    pub fn options(&self) -> &MemoizeOptions {
        &self.core.options
    }

    /// Awaits the function through the cache.
    ///
    /// A hit resolves without polling the function's future at all. On a
    /// miss the result is awaited first and then stored as a deferred
    /// result.
    pub async fn call<Args, Fut, R>(&self, args: Args) -> Result<R>
    where
        F: MemoizeTarget<Args, Output = Fut>,
        Fut: Future<Output = R>,
        Args: CacheIds,
        R: Clone + Send + Sync + 'static,
    {
        self.call_with(args, CallOptions::default()).await
    }

    /// Like [`MemoizedAsync::call`], with per-call options.
    pub async fn call_with<Args, Fut, R>(&self, args: Args, call: CallOptions) -> Result<R>
    where
        F: MemoizeTarget<Args, Output = Fut>,
        Fut: Future<Output = R>,
        Args: CacheIds,
        R: Clone + Send + Sync + 'static,
    {
        let (key, hit) = self.core.lookup::<Args, R>(&args, call)?;
        if let Some(hit) = hit {
            return Ok(hit.await);
        }

        let value = self.target.invoke(args).await;
        self.core.store(key, &value, true);
        Ok(value)
    }

    /// Awaits a fallible function through the cache, caching only `Ok`.
    pub async fn try_call<Args, Fut, T, E>(&self, args: Args) -> std::result::Result<T, E>
    where
        F: MemoizeTarget<Args, Output = Fut>,
        Fut: Future<Output = std::result::Result<T, E>>,
        Args: CacheIds,
        T: Clone + Send + Sync + 'static,
        E: From<MemoizeError>,
    {
        let (key, hit) = self.core.lookup::<Args, T>(&args, CallOptions::default())?;
        if let Some(hit) = hit {
            return Ok(hit.await);
        }

        let value = self.target.invoke(args).await?;
        self.core.store(key, &value, true);
        Ok(value)
    }
}

/// Derives a key from serializable arguments, for generated code.
///
/// Returns `None` and logs a warning when an argument cannot be serialized,
/// in which case the caller runs uncached.
#[doc(hidden)]
pub fn derive_key_or_warn<I>(scope: &Scope, ids: &I) -> Option<CacheKey>
where
    I: CacheIds + ?Sized,
{
    match CacheKey::derive(ids) {
        Ok(key) => Some(key),
        Err(err) => {
            warn!(scope = %scope, error = %err, "arguments not serializable, calling uncached");
            None
        }
    }
}
