//! References from members and collections to the nodes of the objects they hold.

use uuid::Uuid;

use super::node::NodeId;
use crate::reflection::Index;

/// Edge from a referencer to the node of one target object.
///
/// `index` is empty for a member holding a single object and is the item index for a
/// reference held by a [`ReferenceEnumerable`]. A reference to null has no target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectReference {
    index: Index,
    target_node: Option<NodeId>,
    target_guid: Option<Uuid>,
}

impl ObjectReference {
    pub fn new(index: Index) -> Self {
        Self {
            index,
            target_node: None,
            target_guid: None,
        }
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn target_node(&self) -> Option<NodeId> {
        self.target_node
    }

    pub fn target_guid(&self) -> Option<Uuid> {
        self.target_guid
    }

    pub(crate) fn set_target(&mut self, node: NodeId, guid: Uuid) {
        self.target_node = Some(node);
        self.target_guid = Some(guid);
    }
}

/// One reference per item of a collection holding objects, in collection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceEnumerable {
    items: Vec<ObjectReference>,
}

impl ReferenceEnumerable {
    pub fn new(items: Vec<ObjectReference>) -> Self {
        Self { items }
    }

    pub fn get(&self, index: &Index) -> Option<&ObjectReference> {
        self.items.iter().find(|r| r.index() == index)
    }

    pub fn has_index(&self, index: &Index) -> bool {
        self.get(index).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectReference> + '_ {
        self.items.iter()
    }

    pub fn indices(&self) -> impl Iterator<Item = &Index> + '_ {
        self.items.iter().map(ObjectReference::index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Reference carried by a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Object(ObjectReference),
    Enumerable(ReferenceEnumerable),
}

impl Reference {
    pub fn as_object(&self) -> Option<&ObjectReference> {
        match self {
            Reference::Object(r) => Some(r),
            Reference::Enumerable(_) => None,
        }
    }

    pub fn as_enumerable(&self) -> Option<&ReferenceEnumerable> {
        match self {
            Reference::Enumerable(r) => Some(r),
            Reference::Object(_) => None,
        }
    }

    /// Every target node of this reference.
    pub fn targets(&self) -> Vec<NodeId> {
        match self {
            Reference::Object(r) => r.target_node().into_iter().collect(),
            Reference::Enumerable(e) => e.iter().filter_map(ObjectReference::target_node).collect(),
        }
    }
}
