//! Exchange of overrides with the text format.
//!
//! On save, the overrides of a graph are collected into a map from [`AssetPath`] to
//! [`OverrideType`]. On load, the map read from the text is applied back to the nodes the
//! paths address.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::asset::{AssetId, AssetItem};
use super::container::AssetPropertyGraphContainer;
use super::errors::AssetError;
use super::graph::AssetPropertyGraph;
use super::is_identifiable_collection;
use super::override_type::OverrideType;
use super::path::{AssetPath, AssetPathElement};
use crate::Result;
use crate::identity::{ItemId, generate_missing_item_ids};
use crate::quantum::{
    ContentNode, GraphNodePath, GraphVisitor, NodeContainer, NodeId, PathElement, VisitContext,
    walk_node,
};

/// Override map of a document, keyed by the path of each overridden member, item or key.
pub type OverrideMap = HashMap<AssetPath, OverrideType>;

/// What an override path addresses once resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OverrideTarget {
    Content(NodeId),
    Item(NodeId, ItemId),
    Key(NodeId, ItemId),
}

impl AssetPropertyGraphContainer {
    /// Collects the overrides of the graph below `node`, with paths relative to it.
    ///
    /// A member node holding an object is treated as the object itself, so the result is the
    /// same for a member, for a collection item and for the object node they point to.
    pub fn generate_overrides_for_serialization(&self, node: NodeId) -> Result<OverrideMap> {
        let asset = self.owner_of(node)?;
        let graph = self.graph(asset)?;
        let start = self.node_container().node(node)?;
        let start = match start.target() {
            Some(target) if start.is_member() => target,
            _ => node,
        };
        let mut collector = OverrideCollector {
            graph,
            overrides: OverrideMap::new(),
        };
        collector.visit_graph(self.node_container(), start)?;
        debug!(
            asset = %asset,
            node = %start,
            count = collector.overrides.len(),
            "Collected overrides"
        );
        Ok(collector.overrides)
    }

    /// Brings an asset item up to date before it is written: item ids are generated, the
    /// overrides of its graph are collected into `item.overrides` and its archetype is set.
    pub fn prepare_for_save(&self, item: &mut AssetItem) -> Result<()> {
        let graph = self.graph(item.asset.id)?;
        generate_missing_item_ids(self.types(), &item.asset.root);
        item.overrides = self.generate_overrides_for_serialization(graph.root_node())?;
        if let Some(archetype) = graph.archetype() {
            item.asset.archetype = Some(archetype.clone());
        }
        Ok(())
    }

    /// Applies overrides read from a document to the graph of an asset. Paths that do not
    /// resolve are skipped. Returns how many overrides were applied.
    pub fn apply_overrides(&mut self, asset: AssetId, overrides: &OverrideMap) -> Result<usize> {
        let root = self.graph(asset)?.root_node();
        let mut paths: Vec<(&AssetPath, &OverrideType)> = overrides.iter().collect();
        paths.sort();
        let mut applied = 0;
        for (path, value) in paths {
            let target = match self.resolve_override_path(root, path) {
                Ok(target) => target,
                Err(err) => {
                    warn!(asset = %asset, path = %path, error = %err, "Ignoring override");
                    continue;
                }
            };
            let graph = self.graph_mut(asset)?;
            match target {
                OverrideTarget::Content(node) => graph.set_content_override(node, *value),
                OverrideTarget::Item(node, id) => graph.set_item_override(node, id, *value),
                OverrideTarget::Key(node, id) => graph.set_key_override(node, id, *value),
            }
            applied += 1;
        }
        debug!(asset = %asset, applied, "Applied overrides");
        Ok(applied)
    }

    fn resolve_override_path(&self, root: NodeId, path: &AssetPath) -> Result<OverrideTarget> {
        let nodes = self.node_container();
        let invalid = |reason: String| AssetError::InvalidOverridePath {
            path: path.to_string(),
            reason,
        };
        let elements = path.elements();
        let mut current = root;
        for (i, element) in elements.iter().enumerate() {
            let last = i + 1 == elements.len();
            match element {
                AssetPathElement::Member(name) => {
                    let node = nodes.node(current)?;
                    let owner = if node.is_member() {
                        node.target()
                            .ok_or_else(|| invalid(format!("no object holds member {name}")))?
                    } else {
                        current
                    };
                    current = nodes
                        .try_get_child(owner, name)
                        .ok_or_else(|| invalid(format!("no member {name}")))?;
                    if last {
                        return Ok(OverrideTarget::Content(current));
                    }
                }
                AssetPathElement::ItemId(id) => {
                    if last {
                        return Ok(OverrideTarget::Item(current, *id));
                    }
                    let key = nodes
                        .collection(current)?
                        .item_ids()
                        .get_key(id)
                        .ok_or_else(|| invalid(format!("no item {id}")))?;
                    current = nodes
                        .node(current)?
                        .item_target(&key)
                        .ok_or_else(|| invalid(format!("item {id} is not an object")))?;
                }
                AssetPathElement::Index(index) => {
                    let node = nodes.node(current)?;
                    if last {
                        if !is_identifiable_collection(&node) {
                            return Err(invalid(
                                "items without ids carry no key override".to_string(),
                            )
                            .into());
                        }
                        let id = nodes
                            .collection(current)?
                            .item_ids()
                            .get(index)
                            .ok_or_else(|| invalid(format!("no key {index}")))?;
                        return Ok(OverrideTarget::Key(current, id));
                    }
                    current = node
                        .item_target(index)
                        .ok_or_else(|| invalid(format!("item {index} is not an object")))?;
                }
            }
        }
        Err(invalid("the path is empty".to_string()).into())
    }
}

/// Converts a structural path into the path used in documents: items of identifiable
/// collections are addressed by id, target steps are implicit.
pub(crate) fn to_asset_path(nodes: &NodeContainer, path: &GraphNodePath) -> Result<AssetPath> {
    let unresolved = |reason: &str| AssetError::InvalidOverridePath {
        path: path.to_string(),
        reason: reason.to_string(),
    };
    let mut current = path.root();
    let mut result = AssetPath::new();
    for element in path.elements() {
        match element {
            PathElement::Member(name) => {
                result.push_member(name.clone());
                current = nodes
                    .try_get_child(current, name)
                    .ok_or_else(|| unresolved("missing member"))?;
            }
            PathElement::Target => {
                current = nodes
                    .node(current)?
                    .target()
                    .ok_or_else(|| unresolved("missing target"))?;
            }
            PathElement::Index(index) => {
                let node = nodes.node(current)?;
                let id = if is_identifiable_collection(&node) {
                    nodes.collection(current)?.item_ids().get(index)
                } else {
                    None
                };
                match id {
                    Some(id) => result.push_item_id(id),
                    None => result.push_index(index.clone()),
                }
                current = node
                    .item_target(index)
                    .ok_or_else(|| unresolved("missing item target"))?;
            }
        }
    }
    Ok(result)
}

struct OverrideCollector<'a> {
    graph: &'a AssetPropertyGraph,
    overrides: OverrideMap,
}

impl GraphVisitor for OverrideCollector<'_> {
    fn visit_node(
        &mut self,
        ctx: &mut VisitContext<'_>,
        node: &ContentNode,
        path: &GraphNodePath,
    ) -> Result<()> {
        if let Some(overrides) = self.graph.node_overrides(node.id()) {
            let asset_path = to_asset_path(ctx.container(), path)?;
            if node.is_member() && !overrides.content().is_base() {
                self.overrides
                    .insert(asset_path.clone(), overrides.content());
            }
            if let Ok(collection) = ctx.container().collection(node.id()) {
                let ids = collection.item_ids();
                for (id, value) in &overrides.items {
                    if !value.is_base() && ids.contains_id(id) {
                        self.overrides.insert(asset_path.with_item_id(*id), *value);
                    }
                }
                for (id, value) in &overrides.keys {
                    if value.is_base() {
                        continue;
                    }
                    if let Some(key) = ids.get_key(id) {
                        self.overrides.insert(asset_path.with_index(key), *value);
                    }
                }
            }
        }
        walk_node(self, ctx, node, path)
    }
}
