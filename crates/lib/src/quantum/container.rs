//! The node container.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use tracing::{debug, trace};
use uuid::Uuid;

use super::builder::NodeBuilder;
use super::change::{ContentChange, ContentChangeType};
use super::errors::QuantumError;
use super::node::{ContentNode, NodeArena, NodeId, NodeKind};
use super::reference::{ObjectReference, Reference, ReferenceEnumerable};
use crate::Result;
use crate::reflection::{Index, ObjectKey, ObjectRef, TypeDescriptorFactory, Value, WeakObjectRef};

#[derive(Default)]
struct ContainerState {
    arena: NodeArena,
    nodes_by_object: HashMap<ObjectKey, (WeakObjectRef, NodeId)>,
    // Nodes whose references were refreshed during the current top-level call.
    processed: HashSet<NodeId>,
    depth: usize,
}

/// Owns the nodes of one or more object graphs.
///
/// Object nodes are registered by object identity without keeping the objects alive, so
/// asking twice for the node of the same object returns the same node. Structures are
/// never registered.
///
/// All operations take `&self`; a reentrant lock serializes them while letting an
/// operation call back into the container on the same thread.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use assetgraph::quantum::NodeContainer;
/// use assetgraph::reflection::{Index, MemberDescriptor, ObjectRef, TypeDescriptor, TypeRegistry, Value};
///
/// let types = TypeRegistry::new().with(TypeDescriptor::class(
///     "Settings",
///     vec![MemberDescriptor::new("Name", "string")],
/// ));
/// let container = NodeContainer::new(Arc::new(types));
/// let settings = ObjectRef::new_struct("Settings", [("Name", Value::from("a"))]);
///
/// let root = container.get_or_create_node(&settings)?;
/// let name = container.try_get_child(root, "Name").unwrap();
/// container.update(name, Value::from("b"), &Index::Empty)?;
/// assert_eq!(settings.field("Name"), Some(Value::from("b")));
/// # Ok::<(), assetgraph::Error>(())
/// ```
pub struct NodeContainer {
    builder: NodeBuilder,
    state: ReentrantMutex<RefCell<ContainerState>>,
}

impl NodeContainer {
    pub fn new(types: Arc<dyn TypeDescriptorFactory>) -> Self {
        Self::with_builder(NodeBuilder::new(types))
    }

    pub fn with_builder(builder: NodeBuilder) -> Self {
        Self {
            builder,
            state: ReentrantMutex::new(RefCell::new(ContainerState::default())),
        }
    }

    pub fn builder(&self) -> &NodeBuilder {
        &self.builder
    }

    pub fn types(&self) -> &dyn TypeDescriptorFactory {
        self.builder.types()
    }

    pub(crate) fn shared_types(&self) -> Arc<dyn TypeDescriptorFactory> {
        self.builder.shared_types()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ContainerState) -> R) -> R {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    /// Runs a public operation. The processed set is cleared when the outermost call returns.
    fn top_level<R>(&self, f: impl FnOnce(&Self) -> Result<R>) -> Result<R> {
        let guard = self.state.lock();
        guard.borrow_mut().depth += 1;
        let result = f(self);
        let mut state = guard.borrow_mut();
        state.depth -= 1;
        if state.depth == 0 {
            state.processed.clear();
        }
        result
    }

    /// Returns the node of an object, building it and every node reachable from it if needed.
    pub fn get_or_create_node(&self, object: &ObjectRef) -> Result<NodeId> {
        self.top_level(|container| container.get_or_create_internal(object))
    }

    /// Returns the node of an already registered object.
    pub fn get_node(&self, object: &ObjectRef) -> Option<NodeId> {
        self.with_state(|state| {
            state
                .nodes_by_object
                .get(&object.key())
                .filter(|(weak, _)| weak.is_alive())
                .map(|(_, id)| *id)
        })
    }

    /// Snapshot of a node.
    pub fn node(&self, id: NodeId) -> Result<ContentNode> {
        Ok(self.with_state(|state| state.arena.get(id).cloned())?)
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.with_state(|state| state.arena.len())
    }

    /// True while the node has not been freed.
    pub fn contains(&self, id: NodeId) -> bool {
        self.with_state(|state| state.arena.contains(id))
    }

    /// Member node of an object node by member name.
    pub fn try_get_child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.with_state(|state| {
            let node = state.arena.get(id).ok()?;
            node.members()
                .iter()
                .copied()
                .find(|member| {
                    state
                        .arena
                        .get(*member)
                        .is_ok_and(|m| m.name() == Some(name))
                })
        })
    }

    /// Reads the value of a node, or of one of its items when `index` is not empty.
    pub fn retrieve(&self, id: NodeId, index: &Index) -> Result<Value> {
        let node = self.node(id)?;
        let value = self.node_value(&node)?;
        if index.is_empty() {
            return Ok(value);
        }
        let collection = collection_of(&node, &value)?;
        Ok(collection
            .item(index)
            .ok_or_else(|| QuantumError::KeyNotFound {
                node: id,
                index: index.to_string(),
            })?)
    }

    /// Collection held by a node.
    pub fn collection(&self, id: NodeId) -> Result<ObjectRef> {
        let node = self.node(id)?;
        let value = self.node_value(&node)?;
        collection_of(&node, &value)
    }

    /// Replaces the value of a member node, or of an item when `index` is not empty.
    pub fn update(&self, id: NodeId, value: Value, index: &Index) -> Result<ContentChange> {
        self.top_level(|container| {
            let node = container.node(id)?;
            let old_value = if index.is_empty() {
                let (parent, descriptor) = match node.kind() {
                    NodeKind::Member { parent, descriptor } => (*parent, descriptor),
                    _ => {
                        return Err(QuantumError::InvalidArgument {
                            reason: format!(
                                "the object of node {id} cannot be replaced, update the member holding it"
                            ),
                        }
                        .into());
                    }
                };
                let owner = container.owner_object(parent)?;
                owner
                    .set_field(descriptor.name(), value.clone())?
                    .unwrap_or_default()
            } else {
                let collection = collection_of(&node, &container.node_value(&node)?)?;
                collection.set_item(index, value.clone())?
            };
            container.update_references_internal(id)?;
            trace!(node = %id, index = %index, "Updated content");
            Ok(ContentChange {
                node: id,
                index: index.clone(),
                change_type: ContentChangeType::ValueChange,
                old_value,
                new_value: value,
            })
        })
    }

    /// Adds an item to the collection held by a node.
    ///
    /// Lists append on `Index::Empty` and insert before the position otherwise; dictionaries
    /// require a new key.
    pub fn add(&self, id: NodeId, value: Value, index: &Index) -> Result<ContentChange> {
        self.top_level(|container| {
            let node = container.node(id)?;
            let collection = collection_of(&node, &container.node_value(&node)?)?;
            let actual = collection.insert_item(index, value.clone())?;
            container.update_references_internal(id)?;
            trace!(node = %id, index = %actual, "Added item");
            Ok(ContentChange {
                node: id,
                index: actual,
                change_type: ContentChangeType::CollectionAdd,
                old_value: Value::Null,
                new_value: value,
            })
        })
    }

    /// Removes an item from the collection held by a node.
    ///
    /// `value` must be the current item: it is checked, not used to find the item.
    pub fn remove(&self, id: NodeId, value: &Value, index: &Index) -> Result<ContentChange> {
        self.top_level(|container| {
            let node = container.node(id)?;
            let collection = collection_of(&node, &container.node_value(&node)?)?;
            let current = collection
                .item(index)
                .ok_or_else(|| QuantumError::KeyNotFound {
                    node: id,
                    index: index.to_string(),
                })?;
            if current != *value {
                return Err(QuantumError::ConsistencyViolation {
                    expected: value.to_string(),
                    observed: current.to_string(),
                    node: Some(id),
                }
                .into());
            }
            let old_value = collection.remove_item(index)?;
            container.update_references_internal(id)?;
            trace!(node = %id, index = %index, "Removed item");
            Ok(ContentChange {
                node: id,
                index: index.clone(),
                change_type: ContentChangeType::CollectionRemove,
                old_value,
                new_value: Value::Null,
            })
        })
    }

    /// Refreshes the references of a node and of every node reachable from it.
    pub fn update_references(&self, id: NodeId) -> Result<()> {
        self.top_level(|container| container.update_references_internal(id))
    }

    /// Frees every node that cannot be reached from `roots` through members and references,
    /// and drops the registrations of their objects. Returns how many nodes were freed.
    pub fn purge(&self, roots: &[NodeId]) -> usize {
        self.with_state(|state| {
            let reachable = state.arena.reachable(roots);
            let unreachable: Vec<NodeId> = state
                .arena
                .ids()
                .filter(|id| !reachable.contains(id))
                .collect();
            for id in &unreachable {
                state.arena.remove(*id);
            }
            let arena = &state.arena;
            state
                .nodes_by_object
                .retain(|_, (weak, id)| weak.is_alive() && arena.contains(*id));
            debug!(freed = unreachable.len(), live = arena.len(), "Purged nodes");
            unreachable.len()
        })
    }

    /// Removes every node.
    pub fn clear(&self) {
        self.with_state(|state| {
            state.arena.clear();
            state.nodes_by_object.clear();
            state.processed.clear();
        });
    }

    fn get_or_create_internal(&self, object: &ObjectRef) -> Result<NodeId> {
        let value_type = self.builder.is_value_type(object.type_name());
        if !value_type {
            if let Some(id) = self.get_node(object) {
                return Ok(id);
            }
        }
        let id = self.with_state(|state| {
            self.builder
                .build(&mut state.arena, object, Uuid::new_v4())
        })?;
        if !value_type {
            self.with_state(|state| {
                state
                    .nodes_by_object
                    .insert(object.key(), (object.downgrade(), id))
            });
        }
        debug!(node = %id, type_name = %object.type_name(), "Created node");
        self.update_references_internal(id)?;
        Ok(id)
    }

    fn update_references_internal(&self, id: NodeId) -> Result<()> {
        if !self.with_state(|state| state.processed.insert(id)) {
            return Ok(());
        }
        let node = self.node(id)?;
        let value = self.node_value(&node)?;
        let holds_collection = matches!(&value, Value::Object(o) if o.is_collection());
        if node.is_member() || holds_collection {
            self.refresh_reference(&node, &value)?;
        }
        for member in node.members() {
            self.update_references_internal(*member)?;
        }
        let targets = self
            .node(id)?
            .reference()
            .map(Reference::targets)
            .unwrap_or_default();
        for target in targets {
            self.update_references_internal(target)?;
        }
        Ok(())
    }

    /// Recomputes the reference of a node from its current value. Targets that still wrap
    /// the same object are kept; changed items get a new reference with a new target.
    /// Structures no longer referenced are freed.
    fn refresh_reference(&self, node: &ContentNode, value: &Value) -> Result<()> {
        let shape = self.builder.create_reference(node.type_name(), value)?;
        let previous = node.reference().map(Reference::targets).unwrap_or_default();
        let refreshed = match shape {
            None => None,
            Some(Reference::Object(mut reference)) => {
                if let Value::Object(object) = value {
                    let kept = node.target().filter(|t| self.wraps(*t, object));
                    let target = match kept {
                        Some(target) => target,
                        None => self.get_or_create_internal(object)?,
                    };
                    reference.set_target(target, self.node(target)?.guid());
                    self.set_owner(target, node.id(), Index::Empty)?;
                }
                Some(Reference::Object(reference))
            }
            Some(Reference::Enumerable(_)) => {
                let mut items = Vec::new();
                // A null collection references nothing.
                if let Value::Object(collection) = value {
                    let mut claimed = HashSet::new();
                    for (index, item) in collection.items() {
                        let mut reference = ObjectReference::new(index.clone());
                        if let Value::Object(object) = &item {
                            if !self.builder.is_primitive_type(object.type_name()) {
                                let kept = self
                                    .kept_item_target(node, &index, object, &previous, &claimed);
                                let target = match kept {
                                    Some(target) => target,
                                    None => self.get_or_create_internal(object)?,
                                };
                                claimed.insert(target);
                                reference.set_target(target, self.node(target)?.guid());
                                self.set_owner(target, node.id(), index.clone())?;
                            }
                        }
                        items.push(reference);
                    }
                }
                Some(Reference::Enumerable(ReferenceEnumerable::new(items)))
            }
        };
        let current: HashSet<NodeId> = refreshed
            .as_ref()
            .map(Reference::targets)
            .unwrap_or_default()
            .into_iter()
            .collect();
        self.with_state(|state| -> Result<()> {
            state.arena.get_mut(node.id())?.reference = refreshed;
            for target in previous {
                if !current.contains(&target)
                    && state.arena.get(target).is_ok_and(ContentNode::is_boxed)
                {
                    let freed = state.arena.free_tree(target);
                    trace!(node = %target, freed, "Freed structure");
                }
            }
            Ok(())
        })
    }

    /// Target to keep for item `index`: the one at the same index if it wraps the same
    /// object, else for a structure any previous target wrapping it.
    fn kept_item_target(
        &self,
        node: &ContentNode,
        index: &Index,
        object: &ObjectRef,
        previous: &[NodeId],
        claimed: &HashSet<NodeId>,
    ) -> Option<NodeId> {
        let usable = |target: &NodeId| !claimed.contains(target) && self.wraps(*target, object);
        node.item_target(index).filter(usable).or_else(|| {
            if !self.builder.is_value_type(object.type_name()) {
                return None;
            }
            previous.iter().copied().find(usable)
        })
    }

    fn wraps(&self, id: NodeId, object: &ObjectRef) -> bool {
        self.node(id)
            .ok()
            .and_then(|n| n.object().map(|o| o.ptr_eq(object)))
            .unwrap_or(false)
    }

    fn set_owner(&self, target: NodeId, referencer: NodeId, index: Index) -> Result<()> {
        self.with_state(|state| -> Result<()> {
            if let NodeKind::Boxed { owner, .. } = &mut state.arena.get_mut(target)?.kind {
                *owner = Some((referencer, index));
            }
            Ok(())
        })
    }

    /// Object holding the members of an object or boxed node.
    fn owner_object(&self, id: NodeId) -> Result<ObjectRef> {
        let node = self.node(id)?;
        node.object().cloned().ok_or_else(|| {
            QuantumError::ConsistencyViolation {
                expected: "an object node".to_string(),
                observed: "a member node".to_string(),
                node: Some(id),
            }
            .into()
        })
    }

    fn node_value(&self, node: &ContentNode) -> Result<Value> {
        match node.kind() {
            NodeKind::Object { object, .. } | NodeKind::Boxed { object, .. } => {
                Ok(Value::Object(object.clone()))
            }
            NodeKind::Member { parent, descriptor } => Ok(self
                .owner_object(*parent)?
                .field(descriptor.name())
                .unwrap_or_default()),
        }
    }
}

fn collection_of(node: &ContentNode, value: &Value) -> Result<ObjectRef> {
    match value {
        Value::Object(object) if object.is_collection() => Ok(object.clone()),
        Value::Object(object) => Err(QuantumError::ConsistencyViolation {
            expected: "a collection".to_string(),
            observed: object.shape().to_string(),
            node: Some(node.id()),
        }
        .into()),
        other => Err(QuantumError::ConsistencyViolation {
            expected: "a collection".to_string(),
            observed: other.to_string(),
            node: Some(node.id()),
        }
        .into()),
    }
}
