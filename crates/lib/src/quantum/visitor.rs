//! Depth-first traversal of a content graph.
//!
//! Implementors override the hooks they need and call the matching `walk_*` function to
//! continue the default traversal. Object nodes are visited before their members, members
//! before the targets of their references. A node is never entered while it is already on
//! the current traversal stack, which makes cyclic graphs terminate while still visiting a
//! shared object once per path leading to it.

use std::collections::HashSet;

use tracing::trace;

use super::container::NodeContainer;
use super::node::{ContentNode, NodeId};
use super::path::GraphNodePath;
use super::reference::{ObjectReference, Reference};
use crate::Result;

/// State of one traversal.
pub struct VisitContext<'a> {
    container: &'a NodeContainer,
    stack: HashSet<NodeId>,
}

impl<'a> VisitContext<'a> {
    pub fn new(container: &'a NodeContainer) -> Self {
        Self {
            container,
            stack: HashSet::new(),
        }
    }

    pub fn container(&self) -> &'a NodeContainer {
        self.container
    }

    /// True while `node` is being visited further up the stack.
    pub fn is_visiting(&self, node: NodeId) -> bool {
        self.stack.contains(&node)
    }
}

/// Hooks of a graph traversal.
pub trait GraphVisitor {
    /// Visits the graph rooted at `root`.
    fn visit_graph(&mut self, container: &NodeContainer, root: NodeId) -> Result<()> {
        let mut ctx = VisitContext::new(container);
        let node = container.node(root)?;
        self.visit_node(&mut ctx, &node, &GraphNodePath::new(root))
    }

    fn visit_node(
        &mut self,
        ctx: &mut VisitContext<'_>,
        node: &ContentNode,
        path: &GraphNodePath,
    ) -> Result<()> {
        walk_node(self, ctx, node, path)
    }

    fn visit_children(
        &mut self,
        ctx: &mut VisitContext<'_>,
        node: &ContentNode,
        path: &GraphNodePath,
    ) -> Result<()> {
        walk_children(self, ctx, node, path)
    }

    /// Called for each reference with a target; `path` already addresses the target.
    fn visit_reference(
        &mut self,
        ctx: &mut VisitContext<'_>,
        referencer: &ContentNode,
        reference: &ObjectReference,
        path: &GraphNodePath,
    ) -> Result<()> {
        walk_reference(self, ctx, referencer, reference, path)
    }

    /// Filters which targets are entered.
    fn should_visit_target(
        &self,
        _ctx: &VisitContext<'_>,
        _referencer: &ContentNode,
        _target: NodeId,
    ) -> bool {
        true
    }
}

pub fn walk_node<V: GraphVisitor + ?Sized>(
    visitor: &mut V,
    ctx: &mut VisitContext<'_>,
    node: &ContentNode,
    path: &GraphNodePath,
) -> Result<()> {
    trace!(node = %node.id(), path = %path, "Visiting node");
    ctx.stack.insert(node.id());
    let result = visitor
        .visit_children(ctx, node, path)
        .and_then(|()| walk_references(visitor, ctx, node, path));
    ctx.stack.remove(&node.id());
    result
}

pub fn walk_children<V: GraphVisitor + ?Sized>(
    visitor: &mut V,
    ctx: &mut VisitContext<'_>,
    node: &ContentNode,
    path: &GraphNodePath,
) -> Result<()> {
    for member in node.members() {
        let child = ctx.container().node(*member)?;
        let child_path = path.push_member(child.name().unwrap_or_default());
        visitor.visit_node(ctx, &child, &child_path)?;
    }
    Ok(())
}

pub fn walk_reference<V: GraphVisitor + ?Sized>(
    visitor: &mut V,
    ctx: &mut VisitContext<'_>,
    _referencer: &ContentNode,
    reference: &ObjectReference,
    path: &GraphNodePath,
) -> Result<()> {
    if let Some(target) = reference.target_node() {
        let target = ctx.container().node(target)?;
        visitor.visit_node(ctx, &target, path)?;
    }
    Ok(())
}

fn walk_references<V: GraphVisitor + ?Sized>(
    visitor: &mut V,
    ctx: &mut VisitContext<'_>,
    node: &ContentNode,
    path: &GraphNodePath,
) -> Result<()> {
    match node.reference() {
        None => Ok(()),
        Some(Reference::Object(reference)) => {
            visit_if_allowed(visitor, ctx, node, reference, &path.push_target())
        }
        Some(Reference::Enumerable(references)) => {
            for reference in references.iter() {
                let item_path = path.push_index(reference.index().clone());
                visit_if_allowed(visitor, ctx, node, reference, &item_path)?;
            }
            Ok(())
        }
    }
}

fn visit_if_allowed<V: GraphVisitor + ?Sized>(
    visitor: &mut V,
    ctx: &mut VisitContext<'_>,
    node: &ContentNode,
    reference: &ObjectReference,
    path: &GraphNodePath,
) -> Result<()> {
    let Some(target) = reference.target_node() else {
        return Ok(());
    };
    if ctx.is_visiting(target) || !visitor.should_visit_target(ctx, node, target) {
        return Ok(());
    }
    visitor.visit_reference(ctx, node, reference, path)
}
