//! Deep copy of object graphs.

use std::collections::HashMap;

use bitflags::bitflags;

use crate::identity::{CollectionItemIdentifiers, ItemId};
use crate::reflection::{BodyShape, ObjectBody, ObjectKey, ObjectRef, Value};

bitflags! {
    /// Options of an [`AssetCloner`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClonerFlags: u8 {
        /// External references are replaced by null instead of being shared.
        const REFERENCE_AS_NULL = 1 << 0;
        /// Copies carry no item ids.
        const REMOVE_ITEM_IDS = 1 << 1;
        /// Copies get fresh item ids for the same keys.
        const GENERATE_NEW_IDS = 1 << 2;
    }
}

/// Deep copies values, keeping the shape of the graph: an object reached twice is copied
/// once and cycles are preserved. Item id tables are copied with their collections.
///
/// Objects registered with [`AssetCloner::with_external_reference`] belong to another asset
/// and are shared by the copy rather than duplicated.
#[derive(Debug, Default)]
pub struct AssetCloner {
    flags: ClonerFlags,
    external: HashMap<ObjectKey, ObjectRef>,
    copies: HashMap<ObjectKey, ObjectRef>,
}

impl AssetCloner {
    pub fn new(flags: ClonerFlags) -> Self {
        Self {
            flags,
            ..Default::default()
        }
    }

    /// One-shot deep copy of a value.
    pub fn deep_clone(value: &Value, flags: ClonerFlags) -> Value {
        Self::new(flags).clone_value(value)
    }

    pub fn with_external_reference(mut self, object: &ObjectRef) -> Self {
        self.external.insert(object.key(), object.clone());
        self
    }

    pub fn flags(&self) -> ClonerFlags {
        self.flags
    }

    pub fn clone_value(&mut self, value: &Value) -> Value {
        match value {
            Value::Object(object) if self.external.contains_key(&object.key()) => {
                if self.flags.contains(ClonerFlags::REFERENCE_AS_NULL) {
                    Value::Null
                } else {
                    value.clone()
                }
            }
            Value::Object(object) => Value::Object(self.clone_object(object)),
            other => other.clone(),
        }
    }

    /// Copies an object. The object itself is always copied, even when registered as an
    /// external reference.
    pub fn clone_object(&mut self, object: &ObjectRef) -> ObjectRef {
        if let Some(copy) = self.copies.get(&object.key()) {
            return copy.clone();
        }
        let copy = ObjectRef::new(object.type_name(), empty_body(object.shape()));
        self.copies.insert(object.key(), copy.clone());

        let body = match object.body() {
            ObjectBody::Struct(fields) => ObjectBody::Struct(
                fields
                    .into_iter()
                    .map(|(name, value)| (name, self.clone_value(&value)))
                    .collect(),
            ),
            ObjectBody::List(items) => {
                ObjectBody::List(items.iter().map(|item| self.clone_value(item)).collect())
            }
            ObjectBody::Dictionary(entries) => ObjectBody::Dictionary(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, self.clone_value(&value)))
                    .collect(),
            ),
        };
        copy.set_body(body);

        if object.has_item_ids() && !self.flags.contains(ClonerFlags::REMOVE_ITEM_IDS) {
            let ids = object.item_ids();
            let ids = if self.flags.contains(ClonerFlags::GENERATE_NEW_IDS) {
                let mut fresh = CollectionItemIdentifiers::new();
                for (key, _) in ids.iter() {
                    fresh.set(key.clone(), ItemId::new());
                }
                fresh
            } else {
                ids
            };
            copy.set_item_ids(Some(ids));
        }
        copy
    }
}

fn empty_body(shape: BodyShape) -> ObjectBody {
    match shape {
        BodyShape::Struct => ObjectBody::Struct(Default::default()),
        BodyShape::List => ObjectBody::List(Vec::new()),
        BodyShape::Dictionary => ObjectBody::Dictionary(Default::default()),
    }
}
