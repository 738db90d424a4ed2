//! Content graph mirroring an object tree.
//!
//! A [`NodeContainer`] builds one node per object (deduplicated by object identity, so a
//! shared or cyclic reference resolves to the same node) and one node per member of that object.
//! Members and collections holding objects carry a reference to the node of the target object.
//!
//! # Core Types
//!
//! - [`NodeContainer`] - Owns the nodes and routes every read and write
//! - [`ContentNode`] - An object, boxed structure or member node
//! - [`ObjectReference`] / [`ReferenceEnumerable`] - Edges to target object nodes
//! - [`GraphNodePath`] - Instance-independent address of a node from a root
//! - [`GraphVisitor`] - Depth-first traversal with cycle protection
//! - [`GraphNodeLinker`] - Pairs the nodes of two similar graphs

pub mod builder;
pub mod change;
pub mod container;
pub mod errors;
pub mod linker;
pub mod node;
pub mod path;
pub mod reference;
pub mod visitor;

pub use builder::NodeBuilder;
pub use change::{ContentChange, ContentChangeType};
pub use container::NodeContainer;
pub use errors::QuantumError;
pub use linker::{GraphNodeLinker, LinkResolver, default_target_reference};
pub use node::{ContentNode, NodeId, NodeKind};
pub use path::{GraphNodePath, PathElement};
pub use reference::{ObjectReference, Reference, ReferenceEnumerable};
pub use visitor::{GraphVisitor, VisitContext, walk_children, walk_node, walk_reference};
