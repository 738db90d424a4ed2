//! Pairing of the nodes of two graphs of similar shape.

use std::collections::HashMap;

use tracing::debug;

use super::container::NodeContainer;
use super::node::{ContentNode, NodeId};
use super::path::GraphNodePath;
use super::reference::ObjectReference;
use super::visitor::{GraphVisitor, VisitContext, walk_children, walk_node, walk_reference};
use crate::Result;

/// Decisions and output of a [`GraphNodeLinker`].
pub trait LinkResolver {
    /// Chooses the target of a source node. `default_target` is the node found by structure
    /// (same member name, or the target of the matching reference).
    fn find_target(
        &mut self,
        _container: &NodeContainer,
        _source: &ContentNode,
        default_target: Option<NodeId>,
    ) -> Result<Option<NodeId>> {
        Ok(default_target)
    }

    /// Finds the reference of `target` matching `source_reference` of `source`.
    fn find_target_reference(
        &mut self,
        _container: &NodeContainer,
        _source: &ContentNode,
        target: &ContentNode,
        source_reference: &ObjectReference,
    ) -> Result<Option<ObjectReference>> {
        Ok(default_target_reference(target, source_reference))
    }

    /// Filters which reference targets of the source graph are followed.
    fn should_visit_source(
        &self,
        _container: &NodeContainer,
        _referencer: &ContentNode,
        _target: NodeId,
    ) -> bool {
        true
    }

    /// Receives every source node with the target it was paired with.
    fn link_nodes(&mut self, source: NodeId, target: Option<NodeId>);
}

/// Matches a reference by its index: the single reference of a member, or the item
/// reference with the same index.
pub fn default_target_reference(
    target: &ContentNode,
    source_reference: &ObjectReference,
) -> Option<ObjectReference> {
    if source_reference.index().is_empty() {
        target.target_reference().cloned()
    } else {
        target
            .item_references()
            .and_then(|refs| refs.get(source_reference.index()))
            .cloned()
    }
}

/// Walks a source graph and pairs each of its nodes with a node of a target graph.
///
/// Each source node is linked at most once per pass, even when several paths lead to it.
pub struct GraphNodeLinker<R> {
    resolver: R,
    visited_links: HashMap<NodeId, Option<NodeId>>,
}

impl<R: LinkResolver> GraphNodeLinker<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            visited_links: HashMap::new(),
        }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn into_resolver(self) -> R {
        self.resolver
    }

    /// Links every node reachable from `source_root` with the corresponding node reachable
    /// from `target_root`.
    pub fn link_graph(
        &mut self,
        container: &NodeContainer,
        source_root: NodeId,
        target_root: Option<NodeId>,
    ) -> Result<()> {
        self.visited_links.clear();
        self.visited_links.insert(source_root, target_root);
        self.visit_graph(container, source_root)?;
        debug!(
            source = %source_root,
            linked = self.visited_links.values().filter(|t| t.is_some()).count(),
            "Linked graph"
        );
        Ok(())
    }
}

impl<R: LinkResolver> GraphVisitor for GraphNodeLinker<R> {
    fn visit_node(
        &mut self,
        ctx: &mut VisitContext<'_>,
        node: &ContentNode,
        path: &GraphNodePath,
    ) -> Result<()> {
        let default_target = self.visited_links.get(&node.id()).copied().flatten();
        let target = self
            .resolver
            .find_target(ctx.container(), node, default_target)?;
        self.visited_links.insert(node.id(), target);
        self.resolver.link_nodes(node.id(), target);
        walk_node(self, ctx, node, path)
    }

    fn visit_children(
        &mut self,
        ctx: &mut VisitContext<'_>,
        node: &ContentNode,
        path: &GraphNodePath,
    ) -> Result<()> {
        if let Some(target) = self.visited_links.get(&node.id()).copied() {
            for member in node.members() {
                let child = ctx.container().node(*member)?;
                let child_target = target.and_then(|t| {
                    child
                        .name()
                        .and_then(|name| ctx.container().try_get_child(t, name))
                });
                self.visited_links.insert(*member, child_target);
            }
        }
        walk_children(self, ctx, node, path)
    }

    fn visit_reference(
        &mut self,
        ctx: &mut VisitContext<'_>,
        referencer: &ContentNode,
        reference: &ObjectReference,
        path: &GraphNodePath,
    ) -> Result<()> {
        if let Some(source_target) = reference.target_node() {
            if self.visited_links.contains_key(&source_target) {
                return Ok(());
            }
            if let Some(referencer_target) = self.visited_links.get(&referencer.id()).copied() {
                let target_reference = match referencer_target {
                    Some(target) => {
                        let target = ctx.container().node(target)?;
                        self.resolver.find_target_reference(
                            ctx.container(),
                            referencer,
                            &target,
                            reference,
                        )?
                    }
                    None => None,
                };
                self.visited_links.insert(
                    source_target,
                    target_reference.and_then(|r| r.target_node()),
                );
            }
        }
        walk_reference(self, ctx, referencer, reference, path)
    }

    fn should_visit_target(
        &self,
        ctx: &VisitContext<'_>,
        referencer: &ContentNode,
        target: NodeId,
    ) -> bool {
        self.resolver
            .should_visit_source(ctx.container(), referencer, target)
    }
}
