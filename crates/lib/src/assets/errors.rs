//! Error types for asset property graphs.

use thiserror::Error;

use crate::quantum::NodeId;

/// Structured error types for asset property graph operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AssetError {
    /// No graph is loaded for the asset
    #[error("No property graph for asset {asset}")]
    GraphNotFound { asset: String },

    /// The node does not belong to any loaded asset graph
    #[error("Node {node} does not belong to an asset graph")]
    NodeNotInGraph { node: NodeId },

    /// The operation needs a base node and the node has none
    #[error("Node {node} is not linked to a base node")]
    NotLinked { node: NodeId },

    /// An override path does not address a member or an item
    #[error("Invalid override path {path}: {reason}")]
    InvalidOverridePath { path: String, reason: String },

    /// The type is not described
    #[error("Unknown type: {type_name}")]
    UnknownType { type_name: String },

    /// Text could not be parsed as an asset reference
    #[error("Invalid asset reference: {text}")]
    InvalidAssetReference { text: String },
}

impl AssetError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AssetError::GraphNotFound { .. } | AssetError::NodeNotInGraph { .. }
        )
    }

    pub fn is_link_error(&self) -> bool {
        matches!(self, AssetError::NotLinked { .. })
    }

    pub fn is_path_error(&self) -> bool {
        matches!(self, AssetError::InvalidOverridePath { .. })
    }
}

impl From<AssetError> for crate::Error {
    fn from(err: AssetError) -> Self {
        crate::Error::Asset(err)
    }
}
