//! Error types for content graph operations.

use thiserror::Error;

use super::node::NodeId;

/// Structured error types for the content graph.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum QuantumError {
    /// The graph no longer matches the shape of the objects it mirrors
    #[error("Quantum consistency exception. Expected: {expected} - Observed: {observed}")]
    ConsistencyViolation {
        expected: String,
        observed: String,
        node: Option<NodeId>,
    },

    /// The type cannot be represented by content nodes
    #[error("Type {type_name} is not supported: {reason}")]
    UnsupportedShape { type_name: String, reason: String },

    /// An argument is invalid for the node it is applied to
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// The node has no item at the given index
    #[error("Node {node} has no item at index {index}")]
    KeyNotFound { node: NodeId, index: String },

    /// The node does not exist in this container
    #[error("Node not found: {node}")]
    NodeNotFound { node: NodeId },

    /// A path could not be resolved to a node
    #[error("Cannot resolve path {path}: {reason}")]
    PathResolution { path: String, reason: String },

    /// Built-in primitive types are always primitive
    #[error("Primitive type {type_name} is built in and cannot be unregistered")]
    BuiltInPrimitive { type_name: String },
}

impl QuantumError {
    pub fn is_consistency_error(&self) -> bool {
        matches!(self, QuantumError::ConsistencyViolation { .. })
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            QuantumError::UnsupportedShape { .. } | QuantumError::BuiltInPrimitive { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            QuantumError::KeyNotFound { .. }
                | QuantumError::NodeNotFound { .. }
                | QuantumError::PathResolution { .. }
        )
    }

    /// Get the node this error is about, if any
    pub fn node(&self) -> Option<NodeId> {
        match self {
            QuantumError::ConsistencyViolation { node, .. } => *node,
            QuantumError::KeyNotFound { node, .. } | QuantumError::NodeNotFound { node } => {
                Some(*node)
            }
            _ => None,
        }
    }
}

impl From<QuantumError> for crate::Error {
    fn from(err: QuantumError) -> Self {
        crate::Error::Quantum(err)
    }
}
