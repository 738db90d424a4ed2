//! Identifier table of a collection.

use std::collections::{BTreeMap, BTreeSet};

use super::errors::IdentityError;
use super::item_id::ItemId;
use crate::reflection::Index;

/// Bidirectional mapping between the keys of a collection and the ids of its items,
/// plus the set of ids whose items were deliberately removed.
///
/// An id is either live (mapped to a key) or deleted, never both.
///
/// # Examples
///
/// ```
/// use assetgraph::identity::{CollectionItemIdentifiers, ItemId};
///
/// let mut ids = CollectionItemIdentifiers::new();
/// let (a, b) = (ItemId::new(), ItemId::new());
/// ids.add(0, a).unwrap();
/// ids.add(1, b).unwrap();
///
/// ids.delete_and_shift(0, true);
/// assert_eq!(ids.get(0), Some(b));
/// assert!(ids.is_deleted(&a));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionItemIdentifiers {
    key_to_id: BTreeMap<Index, ItemId>,
    deleted_items: BTreeSet<ItemId>,
}

impl CollectionItemIdentifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps a new key. Fails if the key already has an id, or if the id is live under
    /// another key.
    pub fn add(&mut self, key: impl Into<Index>, id: ItemId) -> Result<(), IdentityError> {
        let key = key.into();
        if self.key_to_id.contains_key(&key) {
            return Err(IdentityError::KeyAlreadyMapped {
                key: key.to_string(),
            });
        }
        if let Some(existing) = self.get_key(&id) {
            return Err(IdentityError::IdAlreadyMapped {
                id: id.to_string(),
                key: existing.to_string(),
            });
        }
        self.deleted_items.remove(&id);
        self.key_to_id.insert(key, id);
        Ok(())
    }

    /// Maps `id` at list position `index`, shifting the ids at and after it one position up.
    pub fn insert(&mut self, index: usize, id: ItemId) {
        debug_assert!(!self.contains_id(&id), "item id {id} is already mapped");
        let shifted: Vec<(i64, ItemId)> = self
            .key_to_id
            .range(Index::from(index)..)
            .filter_map(|(k, v)| k.as_int().map(|i| (i, *v)))
            .collect();
        for (i, _) in &shifted {
            self.key_to_id.remove(&Index::Int(*i));
        }
        for (i, v) in shifted {
            self.key_to_id.insert(Index::Int(i + 1), v);
        }
        self.deleted_items.remove(&id);
        self.key_to_id.insert(Index::from(index), id);
    }

    /// Maps a key, replacing any id it had.
    pub fn set(&mut self, key: impl Into<Index>, id: ItemId) {
        let key = key.into();
        debug_assert!(
            self.get_key(&id).is_none_or(|existing| existing == key),
            "item id {id} is already mapped to another key"
        );
        self.deleted_items.remove(&id);
        self.key_to_id.insert(key, id);
    }

    pub fn get(&self, key: impl Into<Index>) -> Option<ItemId> {
        self.key_to_id.get(&key.into()).copied()
    }

    /// Like [`get`](Self::get), returning an error naming the key when it has no id.
    pub fn try_get(&self, key: impl Into<Index>) -> Result<ItemId, IdentityError> {
        let key = key.into();
        self.key_to_id
            .get(&key)
            .copied()
            .ok_or_else(|| IdentityError::KeyNotFound {
                key: key.to_string(),
            })
    }

    pub fn contains_key(&self, key: impl Into<Index>) -> bool {
        self.key_to_id.contains_key(&key.into())
    }

    /// Key of a live id.
    pub fn get_key(&self, id: &ItemId) -> Option<Index> {
        self.key_to_id
            .iter()
            .find(|(_, v)| *v == id)
            .map(|(k, _)| k.clone())
    }

    /// Returns true if the id is mapped to a key.
    pub fn contains_id(&self, id: &ItemId) -> bool {
        self.key_to_id.values().any(|v| v == id)
    }

    /// Unmaps a key. With `mark_as_deleted` the id is kept as a deleted item.
    pub fn delete(&mut self, key: impl Into<Index>, mark_as_deleted: bool) -> Option<ItemId> {
        let id = self.key_to_id.remove(&key.into())?;
        if mark_as_deleted {
            self.deleted_items.insert(id);
        }
        Some(id)
    }

    /// Unmaps list position `index` and shifts the ids after it one position down.
    pub fn delete_and_shift(&mut self, index: usize, mark_as_deleted: bool) -> Option<ItemId> {
        let removed = self.delete(index, mark_as_deleted);
        let shifted: Vec<(i64, ItemId)> = self
            .key_to_id
            .range(Index::from(index)..)
            .filter_map(|(k, v)| k.as_int().map(|i| (i, *v)))
            .collect();
        for (i, v) in shifted {
            self.key_to_id.remove(&Index::Int(i));
            self.key_to_id.insert(Index::Int(i - 1), v);
        }
        removed
    }

    /// Moves the id of `old` to `new`.
    pub fn rename_key(&mut self, old: &Index, new: Index) -> Result<(), IdentityError> {
        if self.key_to_id.contains_key(&new) {
            return Err(IdentityError::KeyAlreadyMapped {
                key: new.to_string(),
            });
        }
        let id = self
            .key_to_id
            .remove(old)
            .ok_or_else(|| IdentityError::KeyNotFound {
                key: old.to_string(),
            })?;
        self.key_to_id.insert(new, id);
        Ok(())
    }

    /// Records an id as deleted. A live mapping of the id is removed.
    pub fn mark_as_deleted(&mut self, id: ItemId) {
        if let Some(key) = self.get_key(&id) {
            self.key_to_id.remove(&key);
        }
        self.deleted_items.insert(id);
    }

    pub fn unmark_as_deleted(&mut self, id: &ItemId) -> bool {
        self.deleted_items.remove(id)
    }

    pub fn is_deleted(&self, id: &ItemId) -> bool {
        self.deleted_items.contains(id)
    }

    pub fn key_count(&self) -> usize {
        self.key_to_id.len()
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted_items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_to_id.is_empty() && self.deleted_items.is_empty()
    }

    pub fn deleted_items(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.deleted_items.iter().copied()
    }

    /// Live mappings in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Index, ItemId)> + '_ {
        self.key_to_id.iter().map(|(k, v)| (k, *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Index> + '_ {
        self.key_to_id.keys()
    }

    /// Ids live in `base` that are neither live nor deleted here.
    pub fn find_missing_ids(&self, base: &CollectionItemIdentifiers) -> Vec<ItemId> {
        base.key_to_id
            .values()
            .filter(|id| !self.is_deleted(id) && !self.contains_id(id))
            .copied()
            .collect()
    }

    /// Replaces the content of `target` with a copy of this table.
    pub fn clone_into(&self, target: &mut CollectionItemIdentifiers) {
        target.key_to_id.clone_from(&self.key_to_id);
        target.deleted_items.clone_from(&self.deleted_items);
    }

    pub fn clear(&mut self) {
        self.key_to_id.clear();
        self.deleted_items.clear();
    }
}
