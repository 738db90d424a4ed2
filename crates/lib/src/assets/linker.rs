//! Linking of a derived asset graph to the graph of its archetype.

use std::collections::HashMap;

use super::is_identifiable_collection;
use crate::Result;
use crate::quantum::{ContentNode, LinkResolver, NodeContainer, NodeId, ObjectReference};

/// Pairs the nodes of a derived asset with the nodes of its base.
///
/// Items of identifiable collections are matched by item id, so a derived item stays linked
/// to the same base item after either side is reordered. Items of collections without ids
/// are only linked through custom links registered by the caller.
#[derive(Debug, Default)]
pub struct AssetToBaseNodeLinker {
    custom_links: HashMap<NodeId, NodeId>,
    links: HashMap<NodeId, NodeId>,
}

impl AssetToBaseNodeLinker {
    pub fn new(custom_links: HashMap<NodeId, NodeId>) -> Self {
        Self {
            custom_links,
            links: HashMap::new(),
        }
    }

    pub fn links(&self) -> &HashMap<NodeId, NodeId> {
        &self.links
    }

    pub fn into_links(self) -> HashMap<NodeId, NodeId> {
        self.links
    }
}

impl LinkResolver for AssetToBaseNodeLinker {
    fn find_target(
        &mut self,
        _container: &NodeContainer,
        source: &ContentNode,
        default_target: Option<NodeId>,
    ) -> Result<Option<NodeId>> {
        Ok(self
            .custom_links
            .get(&source.id())
            .copied()
            .or(default_target))
    }

    fn find_target_reference(
        &mut self,
        container: &NodeContainer,
        source: &ContentNode,
        target: &ContentNode,
        source_reference: &ObjectReference,
    ) -> Result<Option<ObjectReference>> {
        if source_reference.index().is_empty() {
            return Ok(target.target_reference().cloned());
        }
        if !is_identifiable_collection(source) {
            return Ok(None);
        }
        let (Ok(source_items), Ok(target_items)) = (
            container.collection(source.id()),
            container.collection(target.id()),
        ) else {
            return Ok(None);
        };
        let Some(id) = source_items.item_ids().get(source_reference.index()) else {
            return Ok(None);
        };
        let Some(key) = target_items.item_ids().get_key(&id) else {
            return Ok(None);
        };
        Ok(target
            .item_references()
            .and_then(|refs| refs.get(&key))
            .cloned())
    }

    fn link_nodes(&mut self, source: NodeId, target: Option<NodeId>) {
        match target {
            Some(target) => {
                self.links.insert(source, target);
            }
            None => {
                self.links.remove(&source);
            }
        }
    }
}
