//! Asset property graphs: overrides and inheritance between a derived asset and its base.
//!
//! An asset derived from a base (its archetype) starts as a clone of the base with the same
//! item ids. Its property graph is linked to the graph of the base, node by node and collection
//! item by collection item id. Edits made on the derived asset are recorded as overrides; edits
//! made on the base are propagated to every derived asset for the properties and items it does
//! not override.
//!
//! # Core Types
//!
//! - [`AssetPropertyGraphContainer`] - Owns the graphs of loaded assets and routes every edit
//! - [`AssetPropertyGraph`] - Base links and overrides of one asset
//! - [`OverrideType`] - `Base`, `New`, `Sealed`
//! - [`AssetPath`] - Serialization address of an override
//! - [`AssetItem`] / [`Asset`] - An asset document and its location
//! - [`AssetCloner`] - Deep copy of object graphs with their item ids

pub mod asset;
pub mod cloner;
pub mod container;
pub mod errors;
pub mod graph;
pub mod linker;
pub mod override_type;
pub mod overrides;
pub mod path;
mod reconcile;

pub use asset::{Asset, AssetId, AssetItem, AssetReference};
pub use cloner::{AssetCloner, ClonerFlags};
pub use container::AssetPropertyGraphContainer;
pub use errors::AssetError;
pub use graph::AssetPropertyGraph;
pub use linker::AssetToBaseNodeLinker;
pub use override_type::OverrideType;
pub use overrides::OverrideMap;
pub use path::{AssetPath, AssetPathElement};

use crate::quantum::ContentNode;

/// True when items of the collection held by `node` carry ids.
pub(crate) fn is_identifiable_collection(node: &ContentNode) -> bool {
    node.descriptor()
        .is_none_or(|descriptor| !descriptor.has_non_identifiable_items())
}
