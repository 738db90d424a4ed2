//! Assignment of ids to collection items that do not have one yet.

use std::collections::HashSet;

use tracing::debug;

use super::item_id::ItemId;
use crate::reflection::{Index, ObjectKey, ObjectRef, TypeDescriptorFactory, TypeKind, Value};

/// Walks the object graph reachable from `root` and gives an id to every item of every
/// identifiable collection that lacks one. Ids of keys that no longer exist are dropped.
///
/// Collections held by members flagged with `non_identifiable_items` are left without ids,
/// but their items are still walked. Returns the number of ids generated.
pub fn generate_missing_item_ids(types: &dyn TypeDescriptorFactory, root: &ObjectRef) -> usize {
    let mut visited = HashSet::new();
    let generated = visit(types, root, true, &mut visited);
    if generated > 0 {
        debug!(root = %root.type_name(), generated, "Generated missing item ids");
    }
    generated
}

fn visit(
    types: &dyn TypeDescriptorFactory,
    object: &ObjectRef,
    identifiable: bool,
    visited: &mut HashSet<ObjectKey>,
) -> usize {
    if !visited.insert(object.key()) {
        return 0;
    }
    let Some(descriptor) = types.find(object.type_name()) else {
        return 0;
    };

    let mut generated = 0;
    match descriptor.kind() {
        TypeKind::Primitive => {}
        TypeKind::Struct | TypeKind::Class => {
            for member in descriptor.members() {
                if let Some(Value::Object(child)) = object.field(member.name()) {
                    generated += visit(
                        types,
                        &child,
                        !member.has_non_identifiable_items(),
                        visited,
                    );
                }
            }
        }
        TypeKind::Collection { .. } | TypeKind::Dictionary { .. } => {
            let items = object.items();
            if identifiable {
                generated += object.with_item_ids(|ids| {
                    let stale: Vec<Index> = ids
                        .keys()
                        .filter(|key| !items.iter().any(|(k, _)| k == *key))
                        .cloned()
                        .collect();
                    for key in stale {
                        ids.delete(key, false);
                    }
                    let mut count = 0;
                    for (key, _) in &items {
                        if !ids.contains_key(key) {
                            ids.set(key.clone(), ItemId::new());
                            count += 1;
                        }
                    }
                    count
                });
            }
            for (_, item) in items {
                if let Value::Object(child) = item {
                    generated += visit(types, &child, true, visited);
                }
            }
        }
    }
    generated
}
