//! Error types for item identity.

use thiserror::Error;

/// Structured error types for item identifier tables.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The key already has an id
    #[error("Key {key} is already mapped to an item id")]
    KeyAlreadyMapped { key: String },

    /// The id is live under another key
    #[error("Item id {id} is already mapped to key {key}")]
    IdAlreadyMapped { id: String, key: String },

    /// The key has no id
    #[error("Key {key} has no item id")]
    KeyNotFound { key: String },

    /// Text could not be parsed as an item id
    #[error("Invalid item id: {text}")]
    InvalidItemId { text: String },
}

impl IdentityError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, IdentityError::KeyNotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(
            self,
            IdentityError::KeyAlreadyMapped { .. } | IdentityError::IdAlreadyMapped { .. }
        )
    }

    pub fn is_parse_error(&self) -> bool {
        matches!(self, IdentityError::InvalidItemId { .. })
    }
}

impl From<IdentityError> for crate::Error {
    fn from(err: IdentityError) -> Self {
        crate::Error::Identity(err)
    }
}
