//! # Cache Keys
//!
//! Derivation of fixed-length cache keys from an ordered sequence of id
//! components.
//!
//! Each component is serialized to canonical JSON and streamed into an MD5
//! hasher; the hex digest of the stream is the [`CacheKey`]. Canonical here
//! means the component is first converted to a [`serde_json::Value`], so
//! object keys always render in sorted order regardless of how the source
//! type iterates its fields.
//!
//! # Examples
//!
//! ```
//! use memoizer_core::CacheKey;
//!
//! let a = CacheKey::derive(&(1, "two", true)).unwrap();
//! let b = CacheKey::derive(&(1, "two", true)).unwrap();
//! let c = CacheKey::derive(&("two", 1, true)).unwrap();
//!
//! assert_eq!(a, b);
//! assert_ne!(a, c);
//! assert_eq!(a.as_str().len(), 32);
//! ```

use std::fmt;

use md5::{Digest, Md5};
use serde::Serialize;

use crate::error::{MemoizeError, Result};

/// Token fed for an explicit `undefined` placeholder component.
const UNDEFINED_TOKEN: &[u8] = b"undefined";

/// Fed after every component. JSON output never contains a raw 0x1F byte,
/// so component boundaries cannot be forged by component contents.
const COMPONENT_SEPARATOR: [u8; 1] = [0x1f];

/// A hex-encoded 128-bit digest identifying one call within a scope.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for an ordered sequence of id components.
    ///
    /// # Errors
    ///
    /// Returns [`MemoizeError::NotSerializable`] if any component cannot be
    /// serialized. No partial key is produced.
    pub fn derive<I>(ids: &I) -> Result<Self>
    where
        I: CacheIds + ?Sized,
    {
        let mut deriver = KeyDeriver::new();
        ids.feed_into(&mut deriver)?;
        Ok(deriver.finish())
    }

    /// Returns the hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Streaming key builder.
///
/// Components are fed in order; [`KeyDeriver::finish`] consumes the builder
/// and returns the digest.
///
/// ```
/// use memoizer_core::{CacheKey, KeyDeriver};
///
/// let mut deriver = KeyDeriver::new();
/// deriver.component(&42).unwrap().component("answer").unwrap();
/// assert_eq!(deriver.finish(), CacheKey::derive(&(42, "answer")).unwrap());
/// ```
#[derive(Clone, Default)]
pub struct KeyDeriver {
    hasher: Md5,
    components: usize,
}

impl KeyDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes `component` canonically and feeds it into the digest.
    ///
    /// # Errors
    ///
    /// [`MemoizeError::NotSerializable`] carrying the component's position
    /// and type name.
    pub fn component<T>(&mut self, component: &T) -> Result<&mut Self>
    where
        T: Serialize + ?Sized,
    {
        let serialized =
            canonical_json(component).map_err(|source| MemoizeError::NotSerializable {
                index: self.components,
                type_name: std::any::type_name::<T>(),
                source,
            })?;
        self.feed(serialized.as_bytes());
        Ok(self)
    }

    /// Feeds the `undefined` placeholder token.
    pub fn undefined(&mut self) -> &mut Self {
        self.feed(UNDEFINED_TOKEN);
        self
    }

    /// Number of components fed so far.
    pub fn len(&self) -> usize {
        self.components
    }

    pub fn is_empty(&self) -> bool {
        self.components == 0
    }

    /// Finalizes the digest.
    pub fn finish(self) -> CacheKey {
        CacheKey(hex::encode(self.hasher.finalize()))
    }

    fn feed(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
        self.hasher.update(COMPONENT_SEPARATOR);
        self.components += 1;
    }
}

impl fmt::Debug for KeyDeriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyDeriver")
            .field("components", &self.components)
            .finish_non_exhaustive()
    }
}

/// Renders a value as compact JSON with sorted object keys.
fn canonical_json<T>(component: &T) -> serde_json::Result<String>
where
    T: Serialize + ?Sized,
{
    let value = serde_json::to_value(component)?;
    serde_json::to_string(&value)
}

/// An ordered sequence of id components.
///
/// Implemented for tuples (up to twelve elements) and slices, arrays and
/// vectors of [`Serialize`] values. Every element is one component, so
/// `(1, 2)` and `[1, 2]` derive the same key.
pub trait CacheIds {
    /// Feeds every component, in order, into `deriver`.
    fn feed_into(&self, deriver: &mut KeyDeriver) -> Result<()>;
}

impl CacheIds for () {
    fn feed_into(&self, _deriver: &mut KeyDeriver) -> Result<()> {
        Ok(())
    }
}

impl<I> CacheIds for &I
where
    I: CacheIds + ?Sized,
{
    fn feed_into(&self, deriver: &mut KeyDeriver) -> Result<()> {
        (**self).feed_into(deriver)
    }
}

impl<T: Serialize> CacheIds for [T] {
    fn feed_into(&self, deriver: &mut KeyDeriver) -> Result<()> {
        for component in self {
            deriver.component(component)?;
        }
        Ok(())
    }
}

impl<T: Serialize, const N: usize> CacheIds for [T; N] {
    fn feed_into(&self, deriver: &mut KeyDeriver) -> Result<()> {
        self.as_slice().feed_into(deriver)
    }
}

impl<T: Serialize> CacheIds for Vec<T> {
    fn feed_into(&self, deriver: &mut KeyDeriver) -> Result<()> {
        self.as_slice().feed_into(deriver)
    }
}

macro_rules! impl_cache_ids_for_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Serialize),+> CacheIds for ($($name,)+) {
            fn feed_into(&self, deriver: &mut KeyDeriver) -> Result<()> {
                $( deriver.component(&self.$idx)?; )+
                Ok(())
            }
        }
    };
}

impl_cache_ids_for_tuple!(A: 0);
impl_cache_ids_for_tuple!(A: 0, B: 1);
impl_cache_ids_for_tuple!(A: 0, B: 1, C: 2);
impl_cache_ids_for_tuple!(A: 0, B: 1, C: 2, D: 3);
impl_cache_ids_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_cache_ids_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_cache_ids_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_cache_ids_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);
impl_cache_ids_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8);
impl_cache_ids_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9);
impl_cache_ids_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10);
impl_cache_ids_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10, L: 11);

/// A dynamically built id sequence.
///
/// Components are serialized as they are pushed, so a component that cannot
/// be serialized is reported immediately. Unlike tuples, `Ids` can carry an
/// explicit `undefined` placeholder, which is distinct from JSON `null`.
///
/// ```
/// use memoizer_core::{CacheKey, Ids};
///
/// let with_placeholder = Ids::new().push(&1).unwrap().undefined();
/// let with_null = Ids::new().push(&1).unwrap().push(&None::<u8>).unwrap();
///
/// assert_ne!(
///     CacheKey::derive(&with_placeholder).unwrap(),
///     CacheKey::derive(&with_null).unwrap(),
/// );
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ids {
    // `None` marks an `undefined` placeholder
    components: Vec<Option<String>>,
}

impl Ids {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a serializable component.
    ///
    /// # Errors
    ///
    /// [`MemoizeError::NotSerializable`] if the component cannot be serialized.
    pub fn push<T>(mut self, component: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        let serialized =
            canonical_json(component).map_err(|source| MemoizeError::NotSerializable {
                index: self.components.len(),
                type_name: std::any::type_name::<T>(),
                source,
            })?;
        self.components.push(Some(serialized));
        Ok(self)
    }

    /// Appends an `undefined` placeholder.
    pub fn undefined(mut self) -> Self {
        self.components.push(None);
        self
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl CacheIds for Ids {
    fn feed_into(&self, deriver: &mut KeyDeriver) -> Result<()> {
        for component in &self.components {
            match component {
                Some(serialized) => deriver.feed(serialized.as_bytes()),
                None => {
                    deriver.undefined();
                }
            }
        }
        Ok(())
    }
}
