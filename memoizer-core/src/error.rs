//! Error types for memoizer operations.

use thiserror::Error;

/// Result type alias using [`MemoizeError`].
pub type Result<T> = std::result::Result<T, MemoizeError>;

/// Errors raised by cache operations.
///
/// Every variant is raised before the store is touched, so a failed call
/// leaves the cache and its statistics exactly as they were and can be
/// retried with corrected input.
#[derive(Debug, Error)]
pub enum MemoizeError {
    /// An id component could not be canonically serialized.
    #[error("id component #{index} (`{type_name}`) is not serializable: {source}")]
    NotSerializable {
        /// Position of the offending component in the id sequence.
        index: usize,
        /// Rust type name of the offending component.
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A cached value was read back as a different type than it was stored with.
    #[error("cached value in scope `{scope}` is not a `{expected}`")]
    ValueTypeMismatch {
        scope: String,
        expected: &'static str,
    },
}

impl MemoizeError {
    /// Returns `true` for [`MemoizeError::NotSerializable`].
    pub fn is_not_serializable(&self) -> bool {
        matches!(self, MemoizeError::NotSerializable { .. })
    }
}
