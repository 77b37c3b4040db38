use std::future::{ready, IntoFuture, Ready};

/// A cache hit, shaped by how the value was stored.
///
/// Entries stored with `is_deferred_result` come back as
/// [`Cached::Deferred`], an already-resolved deferred result, whatever the
/// stored value itself is. This lets synchronous and asynchronous call sites
/// share values produced by asynchronous computations. Both variants can be
/// awaited or unwrapped synchronously.
///
/// # Examples
///
/// ```
/// use memoizer_core::Cached;
///
/// let plain = Cached::Value(7);
/// assert!(!plain.is_deferred());
/// assert_eq!(plain.into_value(), 7);
///
/// # tokio_test_block_on(async {
/// let deferred = Cached::Deferred("ready");
/// assert_eq!(deferred.await, "ready");
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cached<V> {
    /// Stored from a synchronous computation.
    Value(V),
    /// Stored from a deferred computation; resolves immediately when awaited.
    Deferred(V),
}

impl<V> Cached<V> {
    pub fn is_deferred(&self) -> bool {
        matches!(self, Cached::Deferred(_))
    }

    /// Unwraps the value without awaiting.
    pub fn into_value(self) -> V {
        match self {
            Cached::Value(value) | Cached::Deferred(value) => value,
        }
    }

    pub fn value(&self) -> &V {
        match self {
            Cached::Value(value) | Cached::Deferred(value) => value,
        }
    }

    /// Maps the value, keeping the shape.
    pub fn map<U, F>(self, f: F) -> Cached<U>
    where
        F: FnOnce(V) -> U,
    {
        match self {
            Cached::Value(value) => Cached::Value(f(value)),
            Cached::Deferred(value) => Cached::Deferred(f(value)),
        }
    }
}

impl<V> IntoFuture for Cached<V> {
    type Output = V;
    type IntoFuture = Ready<V>;

    fn into_future(self) -> Self::IntoFuture {
        ready(self.into_value())
    }
}
