//! Error types for object access.

use thiserror::Error;

/// Errors raised when reading or mutating an object body.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ReflectionError {
    /// A collection operation was applied to an object that is not a collection
    #[error("Object of type {type_name} is not a collection")]
    NotACollection { type_name: String },

    /// A member operation was applied to an object that has no members
    #[error("Object of type {type_name} does not have members")]
    NotAStruct { type_name: String },

    /// The key or position does not exist in the collection
    #[error("Key not found: {index}")]
    KeyNotFound { index: String },

    /// The dictionary already contains the key
    #[error("Key already exists: {index}")]
    KeyAlreadyExists { index: String },

    /// The list position is outside of the list
    #[error("Index {index} is out of range for a list of {len} items")]
    IndexOutOfRange { index: i64, len: usize },

    /// The index kind does not fit the collection
    #[error("Invalid index {index}: {reason}")]
    InvalidIndex { index: String, reason: String },
}

impl ReflectionError {
    /// Check if this error indicates a missing key or position
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ReflectionError::KeyNotFound { .. } | ReflectionError::IndexOutOfRange { .. }
        )
    }

    /// Check if this error indicates a key that already exists
    pub fn is_already_exists(&self) -> bool {
        matches!(self, ReflectionError::KeyAlreadyExists { .. })
    }

    /// Check if this error is about the kind of object being accessed
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            ReflectionError::NotACollection { .. } | ReflectionError::NotAStruct { .. }
        )
    }
}

impl From<ReflectionError> for crate::Error {
    fn from(err: ReflectionError) -> Self {
        crate::Error::Reflection(err)
    }
}
