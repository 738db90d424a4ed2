//! Records of content changes.

use super::node::NodeId;
use crate::reflection::{Index, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentChangeType {
    ValueChange,
    CollectionAdd,
    CollectionRemove,
}

/// A change applied through a [`NodeContainer`](super::NodeContainer).
///
/// `index` is the index actually used: an append to a list reports the position it landed at.
#[derive(Debug, Clone)]
pub struct ContentChange {
    pub node: NodeId,
    pub index: Index,
    pub change_type: ContentChangeType,
    pub old_value: Value,
    pub new_value: Value,
}
