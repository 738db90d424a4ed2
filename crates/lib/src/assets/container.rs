//! Property graphs of all loaded assets.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::asset::{AssetId, AssetItem};
use super::errors::AssetError;
use super::graph::AssetPropertyGraph;
use super::is_identifiable_collection;
use super::linker::AssetToBaseNodeLinker;
use super::override_type::OverrideType;
use crate::Result;
use crate::identity::{CollectionItemIdentifiers, ItemId, generate_missing_item_ids};
use crate::quantum::{
    ContentChange, ContentNode, GraphNodeLinker, GraphNodePath, GraphVisitor, NodeContainer,
    NodeId, VisitContext, walk_node,
};
use crate::reflection::{Index, ObjectRef, TypeDescriptorFactory, TypeRegistry, Value};

/// Owns the property graph of every loaded asset and applies edits to them.
///
/// Every edit of an asset goes through this container: it updates the content, keeps item ids
/// in sync, records overrides on derived assets and propagates the edit to the assets deriving
/// from the edited one. Archetypes must be initialized before the assets deriving from them.
pub struct AssetPropertyGraphContainer {
    nodes: NodeContainer,
    graphs: HashMap<AssetId, AssetPropertyGraph>,
    owners: HashMap<NodeId, AssetId>,
}

impl AssetPropertyGraphContainer {
    pub fn new(types: TypeRegistry) -> Self {
        Self::with_node_container(NodeContainer::new(Arc::new(types)))
    }

    pub fn with_node_container(nodes: NodeContainer) -> Self {
        Self {
            nodes,
            graphs: HashMap::new(),
            owners: HashMap::new(),
        }
    }

    pub fn node_container(&self) -> &NodeContainer {
        &self.nodes
    }

    pub fn types(&self) -> &dyn TypeDescriptorFactory {
        self.nodes.types()
    }

    pub fn graph(&self, asset: AssetId) -> Result<&AssetPropertyGraph> {
        Ok(self
            .graphs
            .get(&asset)
            .ok_or_else(|| AssetError::GraphNotFound {
                asset: asset.to_string(),
            })?)
    }

    pub(crate) fn graph_mut(&mut self, asset: AssetId) -> Result<&mut AssetPropertyGraph> {
        Ok(self
            .graphs
            .get_mut(&asset)
            .ok_or_else(|| AssetError::GraphNotFound {
                asset: asset.to_string(),
            })?)
    }

    pub fn graphs(&self) -> impl Iterator<Item = &AssetPropertyGraph> {
        self.graphs.values()
    }

    pub fn contains_asset(&self, asset: AssetId) -> bool {
        self.graphs.contains_key(&asset)
    }

    pub fn root_node(&self, asset: AssetId) -> Result<NodeId> {
        Ok(self.graph(asset)?.root_node())
    }

    /// Asset owning a node.
    pub fn owner_of(&self, node: NodeId) -> Result<AssetId> {
        Ok(self
            .owners
            .get(&node)
            .copied()
            .ok_or(AssetError::NodeNotInGraph { node })?)
    }

    /// Snapshot of a node.
    pub fn node(&self, node: NodeId) -> Result<ContentNode> {
        self.nodes.node(node)
    }

    /// Resolves a structural path and returns its node.
    pub fn node_at(&self, path: &GraphNodePath) -> Result<NodeId> {
        path.get_node(&self.nodes)
    }

    /// Builds the property graph of an asset.
    ///
    /// Missing item ids are generated. For a derived asset the overrides of `item` are applied,
    /// the graph is linked to the graph of its archetype and reconciled with it.
    pub fn initialize_asset(&mut self, item: &AssetItem) -> Result<AssetId> {
        let asset = item.asset.id;
        if let Some(archetype) = &item.asset.archetype {
            if !self.graphs.contains_key(&archetype.id) {
                return Err(AssetError::GraphNotFound {
                    asset: archetype.to_string(),
                }
                .into());
            }
        }
        generate_missing_item_ids(self.nodes.types(), &item.asset.root);
        let root = self.nodes.get_or_create_node(&item.asset.root)?;
        let graph = AssetPropertyGraph::new(
            asset,
            item.location.clone(),
            root,
            item.asset.archetype.clone(),
        );
        if self.graphs.insert(asset, graph).is_some() {
            warn!(asset = %asset, "Replacing the property graph of an asset already loaded");
            self.owners.retain(|_, owner| *owner != asset);
        }
        self.register_nodes(asset)?;

        if item.asset.archetype.is_some() {
            self.apply_overrides(asset, &item.overrides)?;
            self.relink(asset)?;
            self.reconcile_with_base(asset)?;
        } else if !item.overrides.is_empty() {
            warn!(
                asset = %asset,
                count = item.overrides.len(),
                "Ignoring overrides of an asset without archetype"
            );
        }
        info!(
            asset = %asset,
            location = %item.location,
            nodes = self.graph(asset)?.node_count(),
            "Initialized asset property graph"
        );
        Ok(asset)
    }

    /// Drops the graph of an asset. Assets deriving from it keep their content but lose
    /// their base links.
    pub fn remove_asset(&mut self, asset: AssetId) -> Option<AssetPropertyGraph> {
        let graph = self.graphs.remove(&asset)?;
        self.owners.retain(|_, owner| *owner != asset);
        for derived in self.graphs.values_mut() {
            if derived.archetype().is_some_and(|a| a.id == asset) {
                derived.base_links.clear();
            }
        }
        self.purge_nodes();
        debug!(asset = %asset, "Removed asset property graph");
        Some(graph)
    }

    /// Frees the nodes no loaded asset reaches any more, such as the objects of removed
    /// items. Returns how many nodes were freed.
    pub fn purge_nodes(&mut self) -> usize {
        let roots: Vec<NodeId> = self
            .graphs
            .values()
            .map(AssetPropertyGraph::root_node)
            .collect();
        let freed = self.nodes.purge(&roots);
        let container = &self.nodes;
        self.owners.retain(|node, _| container.contains(*node));
        for graph in self.graphs.values_mut() {
            graph.overrides.retain(|node, _| container.contains(*node));
        }
        freed
    }

    /// Links the graph of a derived asset to its archetype again, taking custom links into
    /// account.
    pub fn refresh_base(&mut self, asset: AssetId) -> Result<()> {
        self.refresh_graph(asset)
    }

    /// Links a node of a derived asset to a node of its archetype. Takes effect on the next
    /// [`refresh_base`](Self::refresh_base).
    pub fn register_custom_link(&mut self, derived: NodeId, base: NodeId) -> Result<()> {
        let asset = self.owner_of(derived)?;
        self.graph_mut(asset)?.custom_links.insert(derived, base);
        debug!(derived = %derived, base = %base, "Registered custom link");
        Ok(())
    }

    /// Node of the archetype linked to `node`.
    pub fn base_node(&self, node: NodeId) -> Option<NodeId> {
        let asset = self.owners.get(&node)?;
        self.graphs.get(asset)?.base_node(node)
    }

    /// Item ids of the collection held by a node.
    pub fn item_ids(&self, node: NodeId) -> Result<CollectionItemIdentifiers> {
        Ok(self.nodes.collection(node)?.item_ids())
    }

    pub fn retrieve(&self, node: NodeId, index: &Index) -> Result<Value> {
        self.nodes.retrieve(node, index)
    }

    /// Replaces the value of a member, or of an item when `index` is not empty.
    ///
    /// On a derived asset the member or item becomes `New`.
    pub fn update(&mut self, node: NodeId, value: Value, index: &Index) -> Result<ContentChange> {
        let asset = self.owner_of(node)?;
        let change = self.nodes.update(node, value, index)?;
        let content = self.nodes.node(node)?;
        let linked = self.base_node(node).is_some();
        if index.is_empty() {
            let overridable = content
                .descriptor()
                .is_none_or(|descriptor| !descriptor.is_non_overridable());
            if linked && overridable {
                let graph = self.graph_mut(asset)?;
                let current = graph.content_override(node);
                graph.set_content_override(node, current | OverrideType::NEW);
            }
        } else if is_identifiable_collection(&content) {
            let collection = self.nodes.collection(node)?;
            let id = collection.with_item_ids(|ids| match ids.get(index) {
                Some(id) => id,
                None => {
                    let id = ItemId::new();
                    ids.set(index.clone(), id);
                    id
                }
            });
            if linked {
                let graph = self.graph_mut(asset)?;
                let current = graph.item_override(node, &id);
                graph.set_item_override(node, id, current | OverrideType::NEW);
            }
        }
        self.after_change(asset, node)?;
        Ok(change)
    }

    /// Adds an item to a collection. The item gets a new id and, on a derived asset, is `New`.
    pub fn add(&mut self, node: NodeId, value: Value, index: &Index) -> Result<ContentChange> {
        let asset = self.owner_of(node)?;
        let change = self.nodes.add(node, value, index)?;
        let content = self.nodes.node(node)?;
        if is_identifiable_collection(&content) {
            let collection = self.nodes.collection(node)?;
            let id = ItemId::new();
            insert_item_id(&collection, &change.index, id);
            if self.base_node(node).is_some() {
                self.graph_mut(asset)?
                    .set_item_override(node, id, OverrideType::NEW);
            }
        }
        self.after_change(asset, node)?;
        Ok(change)
    }

    /// Removes an item from a collection.
    ///
    /// On a derived asset, removing an item inherited from the base leaves its id marked as
    /// deleted so the item is not brought back by the base.
    pub fn remove(&mut self, node: NodeId, value: &Value, index: &Index) -> Result<ContentChange> {
        let asset = self.owner_of(node)?;
        let content = self.nodes.node(node)?;
        let collection = self.nodes.collection(node)?;
        let removed_id = collection.item_ids().get(index);
        let change = self.nodes.remove(node, value, index)?;
        if is_identifiable_collection(&content) {
            let inherited = match (removed_id, self.base_node(node)) {
                (Some(id), Some(base)) => self
                    .nodes
                    .collection(base)
                    .is_ok_and(|base| base.item_ids().contains_id(&id)),
                _ => false,
            };
            remove_item_id(&collection, index, inherited);
            if let Some(id) = removed_id {
                self.graph_mut(asset)?.forget_item(node, &id);
                debug!(node = %node, item = %id, inherited, "Removed item");
            }
        }
        self.after_change(asset, node)?;
        Ok(change)
    }

    /// Changes the key of a dictionary item. On a derived asset the key becomes `New`.
    pub fn rename_key(&mut self, node: NodeId, old: &Index, new: Index) -> Result<()> {
        let asset = self.owner_of(node)?;
        let content = self.nodes.node(node)?;
        let collection = self.nodes.collection(node)?;
        collection.rename_key(old, new.clone())?;
        if is_identifiable_collection(&content) {
            let id = collection.with_item_ids(|ids| -> Result<Option<ItemId>> {
                if !ids.contains_key(old) {
                    return Ok(None);
                }
                ids.rename_key(old, new.clone())?;
                Ok(ids.get(&new))
            })?;
            if let (Some(id), true) = (id, self.base_node(node).is_some()) {
                let graph = self.graph_mut(asset)?;
                let current = graph.key_override(node, &id);
                graph.set_key_override(node, id, current | OverrideType::NEW);
            }
        }
        self.nodes.update_references(node)?;
        self.after_change(asset, node)
    }

    pub fn get_content_override(&self, node: NodeId) -> OverrideType {
        self.owners
            .get(&node)
            .and_then(|asset| self.graphs.get(asset))
            .map(|graph| graph.content_override(node))
            .unwrap_or_default()
    }

    /// Override of the item at `index`; `Base` when the item has no id.
    pub fn get_item_override(&self, node: NodeId, index: &Index) -> OverrideType {
        self.item_id_at(node, index)
            .map(|(graph, id)| graph.item_override(node, &id))
            .unwrap_or_default()
    }

    /// Override of the key of the dictionary item at `index`.
    pub fn get_key_override(&self, node: NodeId, index: &Index) -> OverrideType {
        self.item_id_at(node, index)
            .map(|(graph, id)| graph.key_override(node, &id))
            .unwrap_or_default()
    }

    pub fn set_content_override(&mut self, node: NodeId, value: OverrideType) -> Result<()> {
        let asset = self.owner_of(node)?;
        self.graph_mut(asset)?.set_content_override(node, value);
        Ok(())
    }

    pub fn set_item_override(
        &mut self,
        node: NodeId,
        index: &Index,
        value: OverrideType,
    ) -> Result<()> {
        let asset = self.owner_of(node)?;
        let id = self.require_item_id(node, index)?;
        self.graph_mut(asset)?.set_item_override(node, id, value);
        Ok(())
    }

    pub fn set_key_override(
        &mut self,
        node: NodeId,
        index: &Index,
        value: OverrideType,
    ) -> Result<()> {
        let asset = self.owner_of(node)?;
        let id = self.require_item_id(node, index)?;
        self.graph_mut(asset)?.set_key_override(node, id, value);
        Ok(())
    }

    /// Clears the override of a member (`index` empty) or of an item, and takes the value of
    /// the base again.
    pub fn reset_override(&mut self, node: NodeId, index: &Index) -> Result<()> {
        let asset = self.owner_of(node)?;
        if self.base_node(node).is_none() {
            return Err(AssetError::NotLinked { node }.into());
        }
        if index.is_empty() {
            self.graph_mut(asset)?
                .set_content_override(node, OverrideType::BASE);
        } else {
            let id = self.require_item_id(node, index)?;
            let graph = self.graph_mut(asset)?;
            graph.set_item_override(node, id, OverrideType::BASE);
            graph.set_key_override(node, id, OverrideType::BASE);
        }
        debug!(node = %node, index = %index, "Reset override");
        self.reconcile_node(asset, node)?;
        self.after_change(asset, node)
    }

    /// Ids of the items of `node` that a derived asset overrides.
    pub fn overridden_items(&self, node: NodeId) -> Vec<(ItemId, OverrideType)> {
        self.owners
            .get(&node)
            .and_then(|asset| self.graphs.get(asset))
            .map(|graph| graph.overridden_items(node))
            .unwrap_or_default()
    }

    /// Reconciles the whole graph of a derived asset with its base, then every asset deriving
    /// from it.
    pub fn reconcile_with_base(&mut self, asset: AssetId) -> Result<()> {
        if !self.graph(asset)?.is_derived() {
            return Ok(());
        }
        self.refresh_graph(asset)?;
        const MAX_PASSES: usize = 8;
        for pass in 0..MAX_PASSES {
            let root = self.graph(asset)?.root_node();
            let order = self.collect_nodes(root)?;
            let mut changed = false;
            for node in order {
                if self.graph(asset)?.base_node(node).is_some() {
                    changed |= self.reconcile_node(asset, node)?;
                }
            }
            self.refresh_graph(asset)?;
            if !changed {
                debug!(asset = %asset, passes = pass + 1, "Reconciled asset with its base");
                break;
            }
            if pass + 1 == MAX_PASSES {
                warn!(asset = %asset, "Reconciliation did not settle");
            }
        }
        for derived in self.derived_assets(asset) {
            self.reconcile_with_base(derived)?;
        }
        Ok(())
    }

    fn item_id_at(&self, node: NodeId, index: &Index) -> Option<(&AssetPropertyGraph, ItemId)> {
        let graph = self.graphs.get(self.owners.get(&node)?)?;
        let id = self.nodes.collection(node).ok()?.item_ids().get(index)?;
        Some((graph, id))
    }

    fn require_item_id(&self, node: NodeId, index: &Index) -> Result<ItemId> {
        Ok(self
            .nodes
            .collection(node)?
            .item_ids()
            .try_get(index)?)
    }

    /// Assets whose archetype is `asset`.
    fn derived_assets(&self, asset: AssetId) -> Vec<AssetId> {
        let mut derived: Vec<AssetId> = self
            .graphs
            .values()
            .filter(|g| g.archetype().is_some_and(|a| a.id == asset))
            .map(AssetPropertyGraph::asset_id)
            .collect();
        derived.sort();
        derived
    }

    /// Bookkeeping after an edit of `node`: registers new nodes, relinks, and propagates the
    /// edit to the assets deriving from the edited one.
    fn after_change(&mut self, asset: AssetId, node: NodeId) -> Result<()> {
        self.refresh_graph(asset)?;
        self.relink_derived(asset)?;
        self.propagate(node)
    }

    fn propagate(&mut self, base_node: NodeId) -> Result<()> {
        let Ok(base_asset) = self.owner_of(base_node) else {
            return Ok(());
        };
        let mut targets: Vec<(AssetId, NodeId)> = self
            .graphs
            .values()
            .filter(|g| g.archetype().is_some_and(|a| a.id == base_asset))
            .flat_map(|g| {
                g.base_links()
                    .filter(|(_, base)| *base == base_node)
                    .map(|(derived, _)| (g.asset_id(), derived))
                    .collect::<Vec<_>>()
            })
            .collect();
        targets.sort();
        for (asset, derived) in targets {
            if !self.nodes.contains(derived) {
                continue;
            }
            let mut changed = self.reconcile_node(asset, derived)?;
            self.refresh_graph(asset)?;
            // A replaced object brings new values for the whole subtree.
            for node in self.collect_nodes(derived)?.into_iter().skip(1) {
                if self.graph(asset)?.base_node(node).is_some() {
                    changed |= self.reconcile_node(asset, node)?;
                }
            }
            if changed {
                debug!(base = %base_node, derived = %derived, "Propagated base change");
                self.refresh_graph(asset)?;
            }
            self.relink_derived(asset)?;
            self.propagate(derived)?;
        }
        Ok(())
    }

    /// Registers the nodes reachable from the root of an asset and relinks it to its base.
    fn refresh_graph(&mut self, asset: AssetId) -> Result<()> {
        self.register_nodes(asset)?;
        self.relink(asset)
    }

    fn relink_derived(&mut self, asset: AssetId) -> Result<()> {
        for derived in self.derived_assets(asset) {
            self.refresh_graph(derived)?;
        }
        Ok(())
    }

    fn register_nodes(&mut self, asset: AssetId) -> Result<()> {
        let root = self.graph(asset)?.root_node();
        let nodes: HashSet<NodeId> = self.collect_nodes(root)?.into_iter().collect();
        self.owners
            .retain(|node, owner| *owner != asset || nodes.contains(node));
        for node in &nodes {
            self.owners.insert(*node, asset);
        }
        // Freed nodes keep no overrides or links.
        let container = &self.nodes;
        let graph = self
            .graphs
            .get_mut(&asset)
            .ok_or_else(|| AssetError::GraphNotFound {
                asset: asset.to_string(),
            })?;
        graph.overrides.retain(|node, _| container.contains(*node));
        graph
            .custom_links
            .retain(|node, base| container.contains(*node) && container.contains(*base));
        graph.nodes = nodes;
        Ok(())
    }

    fn relink(&mut self, asset: AssetId) -> Result<()> {
        let graph = self.graph(asset)?;
        let Some(archetype) = graph.archetype() else {
            return Ok(());
        };
        let root = graph.root_node();
        let Some(base_root) = self.graphs.get(&archetype.id).map(AssetPropertyGraph::root_node)
        else {
            warn!(
                asset = %asset,
                archetype = %archetype,
                "Archetype is not loaded, clearing base links"
            );
            self.graph_mut(asset)?.base_links.clear();
            return Ok(());
        };
        let resolver = AssetToBaseNodeLinker::new(graph.custom_links.clone());
        let mut linker = GraphNodeLinker::new(resolver);
        linker.link_graph(&self.nodes, root, Some(base_root))?;
        let links = linker.into_resolver().into_links();
        self.graph_mut(asset)?.base_links = links;
        Ok(())
    }

    /// Nodes reachable from `root`, in visiting order.
    pub(crate) fn collect_nodes(&self, root: NodeId) -> Result<Vec<NodeId>> {
        let mut collector = NodeCollector::default();
        collector.visit_graph(&self.nodes, root)?;
        Ok(collector.order)
    }
}

/// Records every node of a graph once.
#[derive(Default)]
struct NodeCollector {
    seen: HashSet<NodeId>,
    order: Vec<NodeId>,
}

impl GraphVisitor for NodeCollector {
    fn visit_node(
        &mut self,
        ctx: &mut VisitContext<'_>,
        node: &ContentNode,
        path: &GraphNodePath,
    ) -> Result<()> {
        if !self.seen.insert(node.id()) {
            return Ok(());
        }
        self.order.push(node.id());
        walk_node(self, ctx, node, path)
    }

    fn should_visit_target(
        &self,
        _ctx: &VisitContext<'_>,
        _referencer: &ContentNode,
        target: NodeId,
    ) -> bool {
        !self.seen.contains(&target)
    }
}

/// Gives `id` to the item just inserted at `index`, shifting the ids of the following list
/// items.
pub(crate) fn insert_item_id(collection: &ObjectRef, index: &Index, id: ItemId) {
    let is_list = collection.is_list();
    collection.with_item_ids(|ids| match index.position() {
        Some(position) if is_list => ids.insert(position, id),
        _ => ids.set(index.clone(), id),
    });
}

/// Drops the id of the item just removed at `index`, shifting the ids of the following list
/// items.
pub(crate) fn remove_item_id(
    collection: &ObjectRef,
    index: &Index,
    mark_as_deleted: bool,
) -> Option<ItemId> {
    let is_list = collection.is_list();
    collection.with_item_ids(|ids| match index.position() {
        Some(position) if is_list => ids.delete_and_shift(position, mark_as_deleted),
        _ => ids.delete(index.clone(), mark_as_deleted),
    })
}
