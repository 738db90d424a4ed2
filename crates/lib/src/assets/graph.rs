//! Per-asset link and override state.

use std::collections::{HashMap, HashSet};

use super::asset::{AssetId, AssetReference};
use super::override_type::OverrideType;
use crate::identity::ItemId;
use crate::quantum::NodeId;

/// Overrides recorded on one node: on its value, on the items it holds and on their keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeOverrides {
    pub(crate) content: OverrideType,
    pub(crate) items: HashMap<ItemId, OverrideType>,
    pub(crate) keys: HashMap<ItemId, OverrideType>,
}

impl NodeOverrides {
    pub fn content(&self) -> OverrideType {
        self.content
    }

    pub fn item(&self, id: &ItemId) -> OverrideType {
        self.items.get(id).copied().unwrap_or_default()
    }

    pub fn key(&self, id: &ItemId) -> OverrideType {
        self.keys.get(id).copied().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_base()
            && self.items.values().all(|o| o.is_base())
            && self.keys.values().all(|o| o.is_base())
    }
}

/// The property graph of one asset.
///
/// Holds the links from each node of the asset to the matching node of its archetype, the
/// links registered by hand for collections without item ids, and the overrides of every node.
/// The content nodes themselves live in the shared [`crate::quantum::NodeContainer`].
#[derive(Debug, Clone)]
pub struct AssetPropertyGraph {
    asset_id: AssetId,
    location: String,
    root: NodeId,
    archetype: Option<AssetReference>,
    pub(crate) base_links: HashMap<NodeId, NodeId>,
    pub(crate) custom_links: HashMap<NodeId, NodeId>,
    pub(crate) overrides: HashMap<NodeId, NodeOverrides>,
    pub(crate) nodes: HashSet<NodeId>,
}

impl AssetPropertyGraph {
    pub(crate) fn new(
        asset_id: AssetId,
        location: String,
        root: NodeId,
        archetype: Option<AssetReference>,
    ) -> Self {
        Self {
            asset_id,
            location,
            root,
            archetype,
            base_links: HashMap::new(),
            custom_links: HashMap::new(),
            overrides: HashMap::new(),
            nodes: HashSet::new(),
        }
    }

    pub fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn root_node(&self) -> NodeId {
        self.root
    }

    pub fn archetype(&self) -> Option<&AssetReference> {
        self.archetype.as_ref()
    }

    pub fn is_derived(&self) -> bool {
        self.archetype.is_some()
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Node of the archetype linked to `node`.
    pub fn base_node(&self, node: NodeId) -> Option<NodeId> {
        self.base_links.get(&node).copied()
    }

    /// Links from nodes of this asset to nodes of its archetype.
    pub fn base_links(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.base_links.iter().map(|(d, b)| (*d, *b))
    }

    pub fn custom_link(&self, node: NodeId) -> Option<NodeId> {
        self.custom_links.get(&node).copied()
    }

    pub fn node_overrides(&self, node: NodeId) -> Option<&NodeOverrides> {
        self.overrides.get(&node)
    }

    pub fn content_override(&self, node: NodeId) -> OverrideType {
        self.overrides
            .get(&node)
            .map(NodeOverrides::content)
            .unwrap_or_default()
    }

    pub fn item_override(&self, node: NodeId, id: &ItemId) -> OverrideType {
        self.overrides
            .get(&node)
            .map(|o| o.item(id))
            .unwrap_or_default()
    }

    pub fn key_override(&self, node: NodeId, id: &ItemId) -> OverrideType {
        self.overrides
            .get(&node)
            .map(|o| o.key(id))
            .unwrap_or_default()
    }

    /// Ids of the items of `node` that carry an override other than `Base`.
    pub fn overridden_items(&self, node: NodeId) -> Vec<(ItemId, OverrideType)> {
        let mut items: Vec<_> = self
            .overrides
            .get(&node)
            .map(|o| {
                o.items
                    .iter()
                    .filter(|(_, ot)| !ot.is_base())
                    .map(|(id, ot)| (*id, *ot))
                    .collect()
            })
            .unwrap_or_default();
        items.sort();
        items
    }

    pub(crate) fn set_content_override(&mut self, node: NodeId, value: OverrideType) {
        self.overrides.entry(node).or_default().content = value;
        self.prune(node);
    }

    pub(crate) fn set_item_override(&mut self, node: NodeId, id: ItemId, value: OverrideType) {
        let overrides = self.overrides.entry(node).or_default();
        if value.is_base() {
            overrides.items.remove(&id);
        } else {
            overrides.items.insert(id, value);
        }
        self.prune(node);
    }

    pub(crate) fn set_key_override(&mut self, node: NodeId, id: ItemId, value: OverrideType) {
        let overrides = self.overrides.entry(node).or_default();
        if value.is_base() {
            overrides.keys.remove(&id);
        } else {
            overrides.keys.insert(id, value);
        }
        self.prune(node);
    }

    /// Drops the item and key overrides of an item that no longer exists.
    pub(crate) fn forget_item(&mut self, node: NodeId, id: &ItemId) {
        if let Some(overrides) = self.overrides.get_mut(&node) {
            overrides.items.remove(id);
            overrides.keys.remove(id);
        }
        self.prune(node);
    }

    fn prune(&mut self, node: NodeId) {
        if self.overrides.get(&node).is_some_and(NodeOverrides::is_empty) {
            self.overrides.remove(&node);
        }
    }
}
