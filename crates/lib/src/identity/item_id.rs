//! The `ItemId` type.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use super::errors::IdentityError;

/// Identifier of an item of a collection, independent of its position or key.
///
/// Formatted as 32 lowercase hex digits of its 16 bytes, in order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ItemId([u8; 16]);

impl ItemId {
    /// The absent id.
    pub const EMPTY: ItemId = ItemId([0; 16]);

    /// Stands in for an item that was deleted before it was ever given an id.
    pub const DELETED_PLACEHOLDER: ItemId = ItemId([0xff; 16]);

    /// Generates a new random id, never one of the reserved values.
    pub fn new() -> Self {
        loop {
            let id = ItemId(Uuid::new_v4().into_bytes());
            if !id.is_reserved() {
                return id;
            }
        }
    }

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        ItemId(bytes)
    }

    pub const fn to_bytes(self) -> [u8; 16] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    fn is_reserved(&self) -> bool {
        *self == Self::EMPTY || *self == Self::DELETED_PLACEHOLDER
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({self})")
    }
}

impl FromStr for ItemId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || IdentityError::InvalidItemId {
            text: s.to_string(),
        };
        let bytes = hex::decode(s).map_err(|_| invalid())?;
        let bytes: [u8; 16] = bytes.try_into().map_err(|_| invalid())?;
        Ok(ItemId(bytes))
    }
}

impl From<Uuid> for ItemId {
    fn from(uuid: Uuid) -> Self {
        ItemId(uuid.into_bytes())
    }
}
