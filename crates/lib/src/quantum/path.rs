//! Structural addresses of nodes.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::container::NodeContainer;
use super::errors::QuantumError;
use super::node::NodeId;
use crate::Result;
use crate::reflection::Index;

/// One step of a [`GraphNodePath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathElement {
    /// Member of the current object node.
    Member(String),
    /// Target of the single-object reference of the current member node.
    ///
    /// Every `Target` equals every other `Target`: paths compare by structure only.
    Target,
    /// Target of the reference of one item of the current node.
    Index(Index),
}

/// Path from a root node to another node, made of member names, target hops and item indices.
///
/// Paths are immutable: the `push_*` methods return a new path. Equality and hashing ignore
/// nothing but the root and the elements, so equal paths taken on two different graphs
/// address corresponding nodes.
///
/// # Examples
///
/// ```
/// use assetgraph::quantum::{GraphNodePath, PathElement};
/// # use std::sync::Arc;
/// # use assetgraph::quantum::NodeContainer;
/// # use assetgraph::reflection::{ObjectRef, TypeRegistry, TypeDescriptor, MemberDescriptor};
/// # let types = TypeRegistry::new().with(TypeDescriptor::class("A", vec![MemberDescriptor::new("B", "A")]));
/// # let container = NodeContainer::new(Arc::new(types));
/// # let root = container.get_or_create_node(&ObjectRef::new_struct("A", Vec::<(String, _)>::new()))?;
/// let path = GraphNodePath::new(root).push_member("B").push_target();
/// assert_eq!(path.to_string(), "(root).B-> (Target)");
/// assert_eq!(path.parent().unwrap().elements(), &[PathElement::Member("B".into())]);
/// # Ok::<(), assetgraph::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct GraphNodePath {
    root: NodeId,
    elements: Vec<PathElement>,
}

impl PartialEq for GraphNodePath {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.elements == other.elements
    }
}

impl Eq for GraphNodePath {}

impl Hash for GraphNodePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.root.hash(state);
        self.elements.hash(state);
    }
}

impl GraphNodePath {
    pub fn new(root: NodeId) -> Self {
        Self {
            root,
            elements: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    fn push(&self, element: PathElement) -> Self {
        let mut elements = Vec::with_capacity(self.elements.len() + 1);
        elements.extend_from_slice(&self.elements);
        elements.push(element);
        Self {
            root: self.root,
            elements,
        }
    }

    pub fn push_member(&self, name: impl Into<String>) -> Self {
        self.push(PathElement::Member(name.into()))
    }

    pub fn push_target(&self) -> Self {
        self.push(PathElement::Target)
    }

    pub fn push_index(&self, index: impl Into<Index>) -> Self {
        self.push(PathElement::Index(index.into()))
    }

    /// Appends the elements of another path. Its root is ignored.
    pub fn append(&self, other: &GraphNodePath) -> Self {
        let mut elements = self.elements.clone();
        elements.extend_from_slice(&other.elements);
        Self {
            root: self.root,
            elements,
        }
    }

    /// Path without its last element, `None` for an empty path.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.elements.split_last()?;
        Some(Self {
            root: self.root,
            elements: rest.to_vec(),
        })
    }

    /// Same elements, starting from another root.
    pub fn clone_with_root(&self, root: NodeId) -> Self {
        Self {
            root,
            elements: self.elements.clone(),
        }
    }

    /// Resolves the path to the node it addresses.
    pub fn get_node(&self, container: &NodeContainer) -> Result<NodeId> {
        let nodes = self.nodes(container)?;
        Ok(nodes.last().copied().unwrap_or(self.root))
    }

    /// Every node along the path, starting with the root.
    pub fn nodes(&self, container: &NodeContainer) -> Result<Vec<NodeId>> {
        let mut nodes = Vec::with_capacity(self.elements.len() + 1);
        let mut current = self.root;
        nodes.push(current);
        for element in &self.elements {
            let next = match element {
                PathElement::Member(name) => container.try_get_child(current, name),
                PathElement::Target => container.node(current)?.target(),
                PathElement::Index(index) => container.node(current)?.item_target(index),
            };
            current = next.ok_or_else(|| QuantumError::PathResolution {
                path: self.to_string(),
                reason: format!("no node at {}", describe(element)),
            })?;
            nodes.push(current);
        }
        Ok(nodes)
    }
}

fn describe(element: &PathElement) -> String {
    match element {
        PathElement::Member(name) => format!("member {name}"),
        PathElement::Target => "reference target".to_string(),
        PathElement::Index(index) => format!("index {index}"),
    }
}

impl fmt::Display for GraphNodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(root)")?;
        for element in &self.elements {
            match element {
                PathElement::Member(name) => write!(f, ".{name}")?,
                PathElement::Target => write!(f, "-> (Target)")?,
                PathElement::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}
