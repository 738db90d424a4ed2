//! Serialization addresses of overrides.

use std::fmt;

use crate::identity::ItemId;
use crate::reflection::Index;

/// One step of an [`AssetPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetPathElement {
    /// A member of an object.
    Member(String),
    /// An item of a collection whose items have no ids.
    Index(Index),
    /// An item of an identifiable collection.
    ItemId(ItemId),
}

/// Address of a property or item, relative to the root object of an asset.
///
/// Items of identifiable collections are addressed by their id so that the address survives
/// reordering. A path ending on a member addresses the member value; ending on an item id,
/// the item; ending on an index of an identifiable dictionary, its key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetPath {
    elements: Vec<AssetPathElement>,
}

impl AssetPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[AssetPathElement] {
        &self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn last(&self) -> Option<&AssetPathElement> {
        self.elements.last()
    }

    pub fn push_member(&mut self, name: impl Into<String>) {
        self.elements.push(AssetPathElement::Member(name.into()));
    }

    pub fn push_index(&mut self, index: Index) {
        self.elements.push(AssetPathElement::Index(index));
    }

    pub fn push_item_id(&mut self, id: ItemId) {
        self.elements.push(AssetPathElement::ItemId(id));
    }

    pub fn with_member(&self, name: impl Into<String>) -> Self {
        let mut path = self.clone();
        path.push_member(name);
        path
    }

    pub fn with_index(&self, index: Index) -> Self {
        let mut path = self.clone();
        path.push_index(index);
        path
    }

    pub fn with_item_id(&self, id: ItemId) -> Self {
        let mut path = self.clone();
        path.push_item_id(id);
        path
    }

    /// The path without its last element.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.elements.split_last()?;
        Some(Self {
            elements: rest.to_vec(),
        })
    }
}

impl FromIterator<AssetPathElement> for AssetPath {
    fn from_iter<I: IntoIterator<Item = AssetPathElement>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.elements {
            match element {
                AssetPathElement::Member(name) => write!(f, ".{name}")?,
                AssetPathElement::Index(index) => write!(f, "[{index}]")?,
                AssetPathElement::ItemId(id) => write!(f, "{{{id}}}")?,
            }
        }
        Ok(())
    }
}
