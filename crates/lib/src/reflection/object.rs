//! Shared object handles.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use super::errors::ReflectionError;
use super::value::{Index, Value};
use crate::identity::CollectionItemIdentifiers;

/// Body of an object: named members, an ordered list, or a keyed dictionary.
#[derive(Debug, Clone)]
pub enum ObjectBody {
    Struct(BTreeMap<String, Value>),
    List(Vec<Value>),
    Dictionary(BTreeMap<Index, Value>),
}

/// Shape of an [`ObjectBody`] without its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyShape {
    Struct,
    List,
    Dictionary,
}

impl fmt::Display for BodyShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyShape::Struct => write!(f, "a structure"),
            BodyShape::List => write!(f, "a list"),
            BodyShape::Dictionary => write!(f, "a dictionary"),
        }
    }
}

impl ObjectBody {
    pub fn shape(&self) -> BodyShape {
        match self {
            ObjectBody::Struct(_) => BodyShape::Struct,
            ObjectBody::List(_) => BodyShape::List,
            ObjectBody::Dictionary(_) => BodyShape::Dictionary,
        }
    }
}

struct ObjectCell {
    type_name: String,
    body: RwLock<ObjectBody>,
    // Item identifiers of a collection live next to its body, never inside it.
    item_ids: Mutex<Option<CollectionItemIdentifiers>>,
}

/// Shared handle to an object.
///
/// Cloning the handle shares the object. Identity is the identity of the allocation:
/// two handles are the same object when [`ObjectRef::ptr_eq`] returns true.
#[derive(Clone)]
pub struct ObjectRef(Arc<ObjectCell>);

/// Non-owning handle to an object, used by lookup tables that must not keep objects alive.
#[derive(Clone)]
pub struct WeakObjectRef(Weak<ObjectCell>);

/// Identity key of an object, stable for as long as the object is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey(usize);

impl WeakObjectRef {
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:p}", self.0.type_name, Arc::as_ptr(&self.0))
    }
}

impl fmt::Debug for WeakObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(weak)@{:p}", self.0.as_ptr())
    }
}

impl ObjectRef {
    pub fn new(type_name: impl Into<String>, body: ObjectBody) -> Self {
        ObjectRef(Arc::new(ObjectCell {
            type_name: type_name.into(),
            body: RwLock::new(body),
            item_ids: Mutex::new(None),
        }))
    }

    /// Creates an object with the given members.
    ///
    /// # Examples
    ///
    /// ```
    /// use assetgraph::reflection::{ObjectRef, Value};
    ///
    /// let obj = ObjectRef::new_struct("MyAsset", [("MyString", Value::from("String"))]);
    /// assert_eq!(obj.field("MyString"), Some(Value::from("String")));
    /// ```
    pub fn new_struct<K, I>(type_name: impl Into<String>, fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let fields = fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::new(type_name, ObjectBody::Struct(fields))
    }

    pub fn new_list<V, I>(type_name: impl Into<String>, items: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let items = items.into_iter().map(Into::into).collect();
        Self::new(type_name, ObjectBody::List(items))
    }

    pub fn new_dictionary<K, V, I>(type_name: impl Into<String>, entries: I) -> Self
    where
        K: Into<Index>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::new(type_name, ObjectBody::Dictionary(entries))
    }

    pub fn type_name(&self) -> &str {
        &self.0.type_name
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey(Arc::as_ptr(&self.0) as usize)
    }

    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Arc::downgrade(&self.0))
    }

    pub fn shape(&self) -> BodyShape {
        self.0.body.read().shape()
    }

    pub fn is_collection(&self) -> bool {
        self.shape() != BodyShape::Struct
    }

    pub fn is_list(&self) -> bool {
        self.shape() == BodyShape::List
    }

    pub fn is_dictionary(&self) -> bool {
        self.shape() == BodyShape::Dictionary
    }

    /// Snapshot of the whole body.
    pub fn body(&self) -> ObjectBody {
        self.0.body.read().clone()
    }

    /// Replaces the whole body and returns the previous one.
    pub fn set_body(&self, body: ObjectBody) -> ObjectBody {
        std::mem::replace(&mut *self.0.body.write(), body)
    }

    /// Value of a member, `None` when the object has no such member.
    pub fn field(&self, name: &str) -> Option<Value> {
        match &*self.0.body.read() {
            ObjectBody::Struct(fields) => fields.get(name).cloned(),
            _ => None,
        }
    }

    /// Sets a member and returns its previous value.
    pub fn set_field(
        &self,
        name: impl Into<String>,
        value: Value,
    ) -> Result<Option<Value>, ReflectionError> {
        match &mut *self.0.body.write() {
            ObjectBody::Struct(fields) => Ok(fields.insert(name.into(), value)),
            _ => Err(ReflectionError::NotAStruct {
                type_name: self.type_name().to_string(),
            }),
        }
    }

    /// Number of items of a collection, `None` for structures.
    pub fn item_count(&self) -> Option<usize> {
        match &*self.0.body.read() {
            ObjectBody::Struct(_) => None,
            ObjectBody::List(items) => Some(items.len()),
            ObjectBody::Dictionary(entries) => Some(entries.len()),
        }
    }

    pub fn item(&self, index: &Index) -> Option<Value> {
        match &*self.0.body.read() {
            ObjectBody::Struct(_) => None,
            ObjectBody::List(items) => index.position().and_then(|i| items.get(i).cloned()),
            ObjectBody::Dictionary(entries) => entries.get(index).cloned(),
        }
    }

    pub fn contains_item(&self, index: &Index) -> bool {
        match &*self.0.body.read() {
            ObjectBody::Struct(_) => false,
            ObjectBody::List(items) => index.position().is_some_and(|i| i < items.len()),
            ObjectBody::Dictionary(entries) => entries.contains_key(index),
        }
    }

    /// Snapshot of the items of a collection in order, empty for structures.
    pub fn items(&self) -> Vec<(Index, Value)> {
        match &*self.0.body.read() {
            ObjectBody::Struct(_) => Vec::new(),
            ObjectBody::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (Index::from(i), v.clone()))
                .collect(),
            ObjectBody::Dictionary(entries) => {
                entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
            }
        }
    }

    /// Replaces an existing item and returns its previous value.
    pub fn set_item(&self, index: &Index, value: Value) -> Result<Value, ReflectionError> {
        let type_name = self.type_name().to_string();
        match &mut *self.0.body.write() {
            ObjectBody::Struct(_) => Err(ReflectionError::NotACollection { type_name }),
            ObjectBody::List(items) => {
                let position = list_position(index, items.len(), false)?;
                Ok(std::mem::replace(&mut items[position], value))
            }
            ObjectBody::Dictionary(entries) => match entries.get_mut(index) {
                Some(slot) => Ok(std::mem::replace(slot, value)),
                None => Err(ReflectionError::KeyNotFound {
                    index: index.to_string(),
                }),
            },
        }
    }

    /// Inserts an item and returns the index it was stored at.
    ///
    /// Lists append on `Index::Empty` and insert before the given position otherwise.
    /// Dictionaries require a key that is not present yet.
    pub fn insert_item(&self, index: &Index, value: Value) -> Result<Index, ReflectionError> {
        let type_name = self.type_name().to_string();
        match &mut *self.0.body.write() {
            ObjectBody::Struct(_) => Err(ReflectionError::NotACollection { type_name }),
            ObjectBody::List(items) => {
                if index.is_empty() {
                    items.push(value);
                    return Ok(Index::from(items.len() - 1));
                }
                let position = list_position(index, items.len(), true)?;
                items.insert(position, value);
                Ok(Index::from(position))
            }
            ObjectBody::Dictionary(entries) => {
                if index.is_empty() {
                    return Err(ReflectionError::InvalidIndex {
                        index: index.to_string(),
                        reason: "a dictionary item requires a key".to_string(),
                    });
                }
                if entries.contains_key(index) {
                    return Err(ReflectionError::KeyAlreadyExists {
                        index: index.to_string(),
                    });
                }
                entries.insert(index.clone(), value);
                Ok(index.clone())
            }
        }
    }

    /// Removes an item and returns its value. List items after it shift down.
    pub fn remove_item(&self, index: &Index) -> Result<Value, ReflectionError> {
        let type_name = self.type_name().to_string();
        match &mut *self.0.body.write() {
            ObjectBody::Struct(_) => Err(ReflectionError::NotACollection { type_name }),
            ObjectBody::List(items) => {
                let position = list_position(index, items.len(), false)?;
                Ok(items.remove(position))
            }
            ObjectBody::Dictionary(entries) => {
                entries
                    .remove(index)
                    .ok_or_else(|| ReflectionError::KeyNotFound {
                        index: index.to_string(),
                    })
            }
        }
    }

    /// Moves a dictionary item to a new key.
    pub fn rename_key(&self, old: &Index, new: Index) -> Result<(), ReflectionError> {
        let type_name = self.type_name().to_string();
        match &mut *self.0.body.write() {
            ObjectBody::Dictionary(entries) => {
                if entries.contains_key(&new) {
                    return Err(ReflectionError::KeyAlreadyExists {
                        index: new.to_string(),
                    });
                }
                let value = entries
                    .remove(old)
                    .ok_or_else(|| ReflectionError::KeyNotFound {
                        index: old.to_string(),
                    })?;
                entries.insert(new, value);
                Ok(())
            }
            _ => Err(ReflectionError::NotACollection { type_name }),
        }
    }

    /// Snapshot of the item identifiers attached to this collection (empty when none are attached).
    pub fn item_ids(&self) -> CollectionItemIdentifiers {
        self.0.item_ids.lock().clone().unwrap_or_default()
    }

    pub fn has_item_ids(&self) -> bool {
        self.0.item_ids.lock().is_some()
    }

    /// Runs `f` on the item identifiers of this collection, attaching an empty table first if needed.
    pub fn with_item_ids<R>(&self, f: impl FnOnce(&mut CollectionItemIdentifiers) -> R) -> R {
        let mut slot = self.0.item_ids.lock();
        f(slot.get_or_insert_with(CollectionItemIdentifiers::new))
    }

    /// Replaces (or detaches, with `None`) the item identifiers of this collection.
    pub fn set_item_ids(&self, ids: Option<CollectionItemIdentifiers>) {
        *self.0.item_ids.lock() = ids;
    }
}

/// Validates a list index. `allow_end` accepts `len` itself, the position of an append.
fn list_position(index: &Index, len: usize, allow_end: bool) -> Result<usize, ReflectionError> {
    match index {
        Index::Int(i) => match index.position() {
            Some(position) if position < len || (allow_end && position == len) => Ok(position),
            _ => Err(ReflectionError::IndexOutOfRange { index: *i, len }),
        },
        _ => Err(ReflectionError::InvalidIndex {
            index: index.to_string(),
            reason: "a list item requires an integer position".to_string(),
        }),
    }
}
