//! Reconciliation of derived nodes with their base nodes.

use tracing::{debug, trace};

use super::asset::AssetId;
use super::cloner::{AssetCloner, ClonerFlags};
use super::container::{AssetPropertyGraphContainer, remove_item_id};
use super::graph::NodeOverrides;
use super::is_identifiable_collection;
use crate::Result;
use crate::identity::ItemId;
use crate::quantum::NodeId;
use crate::reflection::{Index, MemberDescriptor, ObjectRef, Value};

impl AssetPropertyGraphContainer {
    /// Restores the inherited parts of a derived node from its base node: the value of a
    /// member that is not overridden, and the items of a collection that are not overridden.
    ///
    /// Returns true if the derived content changed.
    pub(crate) fn reconcile_node(&mut self, asset: AssetId, node: NodeId) -> Result<bool> {
        let Some(base) = self.graph(asset)?.base_node(node) else {
            return Ok(false);
        };
        // Either side may have been freed by an earlier replacement in the same pass.
        if !self.node_container().contains(node) || !self.node_container().contains(base) {
            return Ok(false);
        }
        let content = self.node_container().node(node)?;
        let overrides = self
            .graph(asset)?
            .node_overrides(node)
            .cloned()
            .unwrap_or_default();
        let mut changed = false;

        if content.is_member() {
            let follows_base = overrides.content().is_base()
                || content
                    .descriptor()
                    .is_some_and(MemberDescriptor::is_non_overridable);
            if follows_base {
                let base_value = self.node_container().retrieve(base, &Index::Empty)?;
                let derived_value = self.node_container().retrieve(node, &Index::Empty)?;
                if let Some(value) = inherited_value(&base_value, &derived_value) {
                    trace!(node = %node, value = %value, "Restoring inherited value");
                    self.node_container().update(node, value, &Index::Empty)?;
                    changed = true;
                }
            }
        }

        if is_identifiable_collection(&content) {
            let collections = (
                self.node_container().collection(base),
                self.node_container().collection(node),
            );
            if let (Ok(base_items), Ok(derived_items)) = collections {
                if base_items.shape() == derived_items.shape() {
                    changed |=
                        self.reconcile_items(asset, node, &base_items, &derived_items, &overrides)?;
                }
            }
        }
        Ok(changed)
    }

    fn reconcile_items(
        &mut self,
        asset: AssetId,
        node: NodeId,
        base: &ObjectRef,
        derived: &ObjectRef,
        overrides: &NodeOverrides,
    ) -> Result<bool> {
        let base_ids = base.item_ids();
        let is_list = derived.is_list();
        let mut changed = false;

        // Items whose base item disappeared, last positions first.
        let mut stale: Vec<(Index, ItemId)> = derived
            .item_ids()
            .iter()
            .filter(|(_, id)| !base_ids.contains_id(id) && overrides.item(id).is_base())
            .map(|(key, id)| (key.clone(), id))
            .collect();
        if is_list {
            stale.reverse();
        }
        for (key, id) in stale {
            let value = derived.item(&key).unwrap_or_default();
            self.node_container().remove(node, &value, &key)?;
            remove_item_id(derived, &key, false);
            self.graph_mut(asset)?.forget_item(node, &id);
            debug!(node = %node, item = %id, "Removed item no longer in the base");
            changed = true;
        }

        let forgotten: Vec<ItemId> = derived
            .item_ids()
            .deleted_items()
            .filter(|id| !base_ids.contains_id(id))
            .collect();
        if !forgotten.is_empty() {
            derived.with_item_ids(|ids| {
                for id in &forgotten {
                    ids.unmark_as_deleted(id);
                }
            });
            changed = true;
        }

        let base_entries: Vec<(Index, ItemId)> =
            base_ids.iter().map(|(key, id)| (key.clone(), id)).collect();
        for (position, (base_key, id)) in base_entries.iter().enumerate() {
            let derived_ids = derived.item_ids();
            if derived_ids.is_deleted(id) {
                trace!(node = %node, item = %id, "Skipping item deleted in the derived asset");
                continue;
            }
            let base_value = base.item(base_key).unwrap_or_default();

            if let Some(mut key) = derived_ids.get_key(id) {
                if !is_list
                    && key != *base_key
                    && overrides.key(id).is_base()
                    && !derived.contains_item(base_key)
                {
                    derived.rename_key(&key, base_key.clone())?;
                    derived.with_item_ids(|ids| ids.rename_key(&key, base_key.clone()))?;
                    self.node_container().update_references(node)?;
                    debug!(node = %node, item = %id, key = %base_key, "Restored inherited key");
                    key = base_key.clone();
                    changed = true;
                }
                if overrides.item(id).is_base() {
                    let derived_value = derived.item(&key).unwrap_or_default();
                    if let Some(value) = inherited_value(&base_value, &derived_value) {
                        self.node_container().update(node, value, &key)?;
                        changed = true;
                    }
                }
                continue;
            }

            let value = AssetCloner::deep_clone(&base_value, ClonerFlags::empty());
            if is_list {
                let insert_at = base_entries[..position]
                    .iter()
                    .rev()
                    .find_map(|(_, previous)| derived_ids.get_key(previous))
                    .and_then(|key| key.position())
                    .map_or(0, |p| p + 1);
                self.node_container()
                    .add(node, value, &Index::from(insert_at))?;
                derived.with_item_ids(|ids| ids.insert(insert_at, *id));
                debug!(node = %node, item = %id, position = insert_at, "Inserted inherited item");
            } else if derived.contains_item(base_key) {
                derived.with_item_ids(|ids| ids.mark_as_deleted(*id));
                debug!(
                    node = %node,
                    item = %id,
                    key = %base_key,
                    "Key collision with a derived item, marking the base item as deleted"
                );
            } else {
                self.node_container().add(node, value, base_key)?;
                derived.with_item_ids(|ids| ids.set(base_key.clone(), *id));
                debug!(node = %node, item = %id, key = %base_key, "Added inherited item");
            }
            changed = true;
        }
        Ok(changed)
    }
}

/// Value a derived content must take to follow its base, or `None` if it already does.
///
/// Objects of the same type and shape are kept: their members and items are reconciled
/// through their own links. A base object replacing anything else is copied with its item ids.
pub(crate) fn inherited_value(base: &Value, derived: &Value) -> Option<Value> {
    match (base, derived) {
        (Value::Object(b), Value::Object(d))
            if b.type_name() == d.type_name() && b.shape() == d.shape() =>
        {
            None
        }
        (Value::Object(_), _) => Some(AssetCloner::deep_clone(base, ClonerFlags::empty())),
        (b, d) if b == d => None,
        (b, _) => Some(b.clone()),
    }
}
