//! Content nodes.

use std::collections::HashSet;
use std::fmt;

use uuid::Uuid;

use super::errors::QuantumError;
use super::reference::{ObjectReference, Reference, ReferenceEnumerable};
use crate::reflection::{Index, MemberDescriptor, ObjectRef};

/// Handle to a node of a [`NodeContainer`](super::NodeContainer).
///
/// Slots of freed nodes are reused under a new generation, so a handle to a freed node never
/// reaches the node that took its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "#{}", self.index)
        } else {
            write!(f, "#{}v{}", self.index, self.generation)
        }
    }
}

/// What a node wraps.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// A reference-type object, or a collection. Registered by object identity.
    Object {
        object: ObjectRef,
        members: Vec<NodeId>,
    },
    /// A value-type structure. Never registered; `owner` is the referencer that last exposed it.
    Boxed {
        object: ObjectRef,
        members: Vec<NodeId>,
        owner: Option<(NodeId, Index)>,
    },
    /// A member of the object wrapped by `parent`.
    Member {
        parent: NodeId,
        descriptor: MemberDescriptor,
    },
}

/// A node of the content graph.
#[derive(Debug, Clone)]
pub struct ContentNode {
    pub(crate) id: NodeId,
    pub(crate) guid: Uuid,
    pub(crate) kind: NodeKind,
    pub(crate) type_name: String,
    pub(crate) is_primitive: bool,
    pub(crate) reference: Option<Reference>,
}

impl ContentNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn guid(&self) -> Uuid {
        self.guid
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Runtime type of an object node, declared type of a member node.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// True when the value of this node is opaque to the graph.
    pub fn is_primitive(&self) -> bool {
        self.is_primitive
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    pub fn reference(&self) -> Option<&Reference> {
        self.reference.as_ref()
    }

    pub fn target_reference(&self) -> Option<&ObjectReference> {
        self.reference.as_ref().and_then(Reference::as_object)
    }

    pub fn item_references(&self) -> Option<&ReferenceEnumerable> {
        self.reference.as_ref().and_then(Reference::as_enumerable)
    }

    /// Target of a single-object reference.
    pub fn target(&self) -> Option<NodeId> {
        self.target_reference().and_then(ObjectReference::target_node)
    }

    /// Target of the reference of item `index`.
    pub fn item_target(&self, index: &Index) -> Option<NodeId> {
        self.item_references()
            .and_then(|refs| refs.get(index))
            .and_then(ObjectReference::target_node)
    }

    pub fn members(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Object { members, .. } | NodeKind::Boxed { members, .. } => members,
            NodeKind::Member { .. } => &[],
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        match &self.kind {
            NodeKind::Member { parent, .. } => Some(*parent),
            _ => None,
        }
    }

    /// Member name of a member node.
    pub fn name(&self) -> Option<&str> {
        self.descriptor().map(MemberDescriptor::name)
    }

    pub fn descriptor(&self) -> Option<&MemberDescriptor> {
        match &self.kind {
            NodeKind::Member { descriptor, .. } => Some(descriptor),
            _ => None,
        }
    }

    /// Object wrapped by an object or boxed node.
    pub fn object(&self) -> Option<&ObjectRef> {
        match &self.kind {
            NodeKind::Object { object, .. } | NodeKind::Boxed { object, .. } => Some(object),
            NodeKind::Member { .. } => None,
        }
    }

    pub fn is_object_node(&self) -> bool {
        !self.is_member()
    }

    pub fn is_member(&self) -> bool {
        matches!(self.kind, NodeKind::Member { .. })
    }

    pub fn is_boxed(&self) -> bool {
        matches!(self.kind, NodeKind::Boxed { .. })
    }

    pub fn owner(&self) -> Option<&(NodeId, Index)> {
        match &self.kind {
            NodeKind::Boxed { owner, .. } => owner.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<ContentNode>,
}

/// Storage of the nodes of a container. Freed slots are reused.
#[derive(Debug, Default)]
pub(crate) struct NodeArena {
    slots: Vec<Slot>,
    free: Vec<usize>,
    live: usize,
}

impl NodeArena {
    pub(crate) fn push(
        &mut self,
        guid: Uuid,
        kind: NodeKind,
        type_name: &str,
        is_primitive: bool,
        reference: Option<Reference>,
    ) -> NodeId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                self.slots.len() - 1
            }
        };
        let slot = &mut self.slots[index];
        let id = NodeId::new(index, slot.generation);
        slot.node = Some(ContentNode {
            id,
            guid,
            kind,
            type_name: type_name.to_string(),
            is_primitive,
            reference,
        });
        self.live += 1;
        id
    }

    pub(crate) fn get(&self, id: NodeId) -> Result<&ContentNode, QuantumError> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(QuantumError::NodeNotFound { node: id })
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut ContentNode, QuantumError> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(QuantumError::NodeNotFound { node: id })
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_ok()
    }

    pub(crate) fn add_member(&mut self, id: NodeId, member: NodeId) -> Result<(), QuantumError> {
        match &mut self.get_mut(id)?.kind {
            NodeKind::Object { members, .. } | NodeKind::Boxed { members, .. } => {
                members.push(member);
                Ok(())
            }
            NodeKind::Member { .. } => Err(QuantumError::InvalidArgument {
                reason: format!("member node {id} cannot have members"),
            }),
        }
    }

    pub(crate) fn remove(&mut self, id: NodeId) -> Option<ContentNode> {
        let slot = self
            .slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(node)
    }

    /// Frees a node with its members and the boxed structures they hold. Registered objects
    /// they reference stay. Returns how many nodes were freed.
    pub(crate) fn free_tree(&mut self, id: NodeId) -> usize {
        let mut pending = vec![id];
        let mut freed = 0;
        while let Some(id) = pending.pop() {
            let Some(node) = self.remove(id) else {
                continue;
            };
            freed += 1;
            pending.extend_from_slice(node.members());
            let targets = node.reference().map(Reference::targets).unwrap_or_default();
            pending.extend(
                targets
                    .into_iter()
                    .filter(|target| self.get(*target).is_ok_and(ContentNode::is_boxed)),
            );
        }
        freed
    }

    /// Nodes reachable from `roots` through members and reference targets.
    pub(crate) fn reachable(&self, roots: &[NodeId]) -> HashSet<NodeId> {
        let mut seen = HashSet::new();
        let mut pending = roots.to_vec();
        while let Some(id) = pending.pop() {
            let Ok(node) = self.get(id) else {
                continue;
            };
            if !seen.insert(id) {
                continue;
            }
            pending.extend_from_slice(node.members());
            if let Some(reference) = node.reference() {
                pending.extend(reference.targets());
            }
        }
        seen
    }

    /// Ids of the live nodes.
    pub(crate) fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| slot.node.as_ref().map(ContentNode::id))
    }

    /// Number of live nodes.
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    pub(crate) fn clear(&mut self) {
        for slot in &mut self.slots {
            if slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
        self.free = (0..self.slots.len()).rev().collect();
        self.live = 0;
    }
}
