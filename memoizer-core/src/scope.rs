use std::any::TypeId;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use parking_lot::Mutex;

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Scopes created through [`Scope::registered`], by name.
static REGISTRY: Lazy<Mutex<HashMap<String, Vec<Scope>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Identity {
    Handle(u64),
    Callable(TypeId),
}

/// Identity handle that partitions the cache.
///
/// A scope is compared by identity only; its name is used purely for
/// diagnostics. Two scopes created with the same name are different scopes,
/// and so are two structurally identical closures.
///
/// # Examples
///
/// ```
/// use memoizer_core::Scope;
///
/// let a = Scope::new("lookup");
/// let b = Scope::new("lookup");
/// assert_ne!(a, b);
/// assert_eq!(a, a.clone());
///
/// let double = |x: u32| x * 2;
/// let twice = |x: u32| x * 2;
/// assert_eq!(Scope::of(&double), Scope::of(&double));
/// assert_ne!(Scope::of(&double), Scope::of(&twice));
/// ```
#[derive(Clone)]
pub struct Scope {
    identity: Identity,
    name: Cow<'static, str>,
}

impl Scope {
    /// Allocates a fresh, process-unique scope.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            identity: Identity::Handle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
        }
    }

    /// Allocates a fresh scope and records it under its name, so that it can
    /// be found again with [`Scope::named`].
    ///
    /// Registering a name twice yields two distinct scopes, both listed
    /// under that name.
    pub fn registered(name: impl Into<Cow<'static, str>>) -> Self {
        let scope = Self::new(name);
        REGISTRY
            .lock()
            .entry(scope.name.to_string())
            .or_default()
            .push(scope.clone());
        scope
    }

    /// Every scope registered under `name`, oldest first.
    ///
    /// ```
    /// use memoizer_core::Scope;
    ///
    /// let scope = Scope::registered("reports::monthly");
    /// assert_eq!(Scope::named("reports::monthly"), vec![scope]);
    /// assert!(Scope::named("reports::weekly").is_empty());
    /// ```
    pub fn named(name: &str) -> Vec<Scope> {
        REGISTRY.lock().get(name).cloned().unwrap_or_default()
    }

    /// The scope of a callable, keyed by its concrete type.
    ///
    /// Every fn item and closure expression has its own type, so this tells
    /// functions apart the way object identity would. It does not tell apart
    /// two values of one closure expression that captured different state,
    /// and function pointers (`fn(u32) -> u32`) all share one type. Give
    /// those a [`Scope::new`] handle instead.
    pub fn of<F: 'static>(_target: &F) -> Self {
        Self {
            identity: Identity::Callable(TypeId::of::<F>()),
            name: Cow::Borrowed(std::any::type_name::<F>()),
        }
    }

    /// Diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for Scope {}

impl Hash for Scope {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("name", &self.name)
            .field("identity", &self.identity)
            .finish()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
