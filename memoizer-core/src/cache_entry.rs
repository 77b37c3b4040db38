use std::any::Any;
use std::sync::Arc;

use crate::expiry::ExpiryTimer;

/// Internal record stored under one cache key.
///
/// The value is type-erased so a single store can hold results of any
/// function. Dropping the entry drops its [`ExpiryTimer`], which cancels a
/// pending eviction.
///
/// The value is shared so the facade can clone it, or drop it, after
/// releasing the store lock: user `Clone` and `Drop` impls never run under
/// that lock.
///
/// # Fields
///
/// * `value` - The cached value
/// * `expiry` - Pending eviction, if a positive max age was requested
/// * `is_deferred_result` - Whether lookups hand the value back as a deferred result
pub(crate) struct CacheEntry {
    value: SharedValue,
    expiry: Option<ExpiryTimer>,
    is_deferred_result: bool,
}

impl CacheEntry {
    pub(crate) fn new<V>(value: V, is_deferred_result: bool) -> Self
    where
        V: Send + Sync + 'static,
    {
        Self {
            value: Arc::new(value),
            expiry: None,
            is_deferred_result,
        }
    }

    pub(crate) fn with_expiry(mut self, expiry: Option<ExpiryTimer>) -> Self {
        self.expiry = expiry;
        self
    }

    /// Clones the stored value out if it is a `V`.
    #[cfg(test)]
    pub(crate) fn value<V>(&self) -> Option<V>
    where
        V: Clone + 'static,
    {
        self.value.downcast_ref::<V>().cloned()
    }

    /// A second reference to the stored value, if it is a `V`.
    pub(crate) fn shared_value<V: 'static>(&self) -> Option<SharedValue> {
        self.value.is::<V>().then(|| Arc::clone(&self.value))
    }

    /// Cancels any pending eviction and hands back the value.
    pub(crate) fn into_value(mut self) -> SharedValue {
        drop(self.expiry.take());
        self.value
    }

    pub(crate) fn is_deferred_result(&self) -> bool {
        self.is_deferred_result
    }

    pub(crate) fn has_pending_expiry(&self) -> bool {
        self.expiry.is_some()
    }

    /// Whether this entry's eviction is owned by the timer `timer_id`.
    pub(crate) fn is_expired_by(&self, timer_id: u64) -> bool {
        self.expiry
            .as_ref()
            .map_or(false, |timer| timer.id() == timer_id)
    }

    /// Consumes an entry whose timer fired, counting the expiration.
    pub(crate) fn expire(mut self) -> SharedValue {
        if let Some(timer) = self.expiry.take() {
            timer.fire();
        }
        self.value
    }
}

/// A type-erased cached value.
pub(crate) type SharedValue = Arc<dyn Any + Send + Sync>;

/// Clones the `V` out of a value checked by [`CacheEntry::shared_value`].
pub(crate) fn clone_value<V: Clone + 'static>(value: &SharedValue) -> Option<V> {
    value.downcast_ref::<V>().cloned()
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("expiry", &self.expiry)
            .field("is_deferred_result", &self.is_deferred_result)
            .finish_non_exhaustive()
    }
}
