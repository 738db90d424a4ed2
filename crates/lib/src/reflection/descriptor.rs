//! Type descriptors: the shape of every type an object graph may contain.

use std::collections::HashMap;

use super::object::{ObjectBody, ObjectRef};
use super::value::Value;
use crate::constants::types;

/// Kind of a described type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// A value without members, stored inline.
    Primitive,
    /// A value type with members. Copied on assignment and never shared between owners.
    Struct,
    /// A reference type with members. May be shared and may reference itself.
    Class,
    /// An ordered collection of `element`.
    Collection { element: String, has_indexer: bool },
    /// A keyed collection of `value` items.
    Dictionary { key: String, value: String },
}

/// Description of a member of a structure or class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDescriptor {
    name: String,
    type_name: String,
    non_overridable: bool,
    non_identifiable_items: bool,
}

impl MemberDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            non_overridable: false,
            non_identifiable_items: false,
        }
    }

    /// Marks the member as always following its base: it never records an override.
    pub fn non_overridable(mut self) -> Self {
        self.non_overridable = true;
        self
    }

    /// Marks the collection held by this member as having no item identifiers.
    pub fn non_identifiable_items(mut self) -> Self {
        self.non_identifiable_items = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type of the member.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_non_overridable(&self) -> bool {
        self.non_overridable
    }

    pub fn has_non_identifiable_items(&self) -> bool {
        self.non_identifiable_items
    }
}

/// Description of a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    name: String,
    kind: TypeKind,
    members: Vec<MemberDescriptor>,
}

impl TypeDescriptor {
    pub fn primitive(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Primitive,
            members: Vec::new(),
        }
    }

    pub fn structure(name: impl Into<String>, members: Vec<MemberDescriptor>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Struct,
            members,
        }
    }

    pub fn class(name: impl Into<String>, members: Vec<MemberDescriptor>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Class,
            members,
        }
    }

    pub fn list(name: impl Into<String>, element: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Collection {
                element: element.into(),
                has_indexer: true,
            },
            members: Vec::new(),
        }
    }

    /// A collection that can only be enumerated. The content graph refuses to build nodes for it.
    pub fn collection_without_indexer(name: impl Into<String>, element: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Collection {
                element: element.into(),
                has_indexer: false,
            },
            members: Vec::new(),
        }
    }

    pub fn dictionary(
        name: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Dictionary {
                key: key.into(),
                value: value.into(),
            },
            members: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn is_primitive(&self) -> bool {
        self.kind == TypeKind::Primitive
    }

    /// Primitives and structures are copied rather than shared.
    pub fn is_value_type(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive | TypeKind::Struct)
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Collection { .. } | TypeKind::Dictionary { .. }
        )
    }

    pub fn is_dictionary(&self) -> bool {
        matches!(self.kind, TypeKind::Dictionary { .. })
    }

    /// Item type of a collection, or value type of a dictionary.
    pub fn element_type(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Collection { element, .. } => Some(element),
            TypeKind::Dictionary { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn key_type(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Dictionary { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Body shape objects of this type must have, `None` for primitives.
    pub fn expected_body(&self) -> Option<super::BodyShape> {
        use super::BodyShape;
        match self.kind {
            TypeKind::Primitive => None,
            TypeKind::Struct | TypeKind::Class => Some(BodyShape::Struct),
            TypeKind::Collection { .. } => Some(BodyShape::List),
            TypeKind::Dictionary { .. } => Some(BodyShape::Dictionary),
        }
    }
}

/// Source of type descriptors.
pub trait TypeDescriptorFactory: Send + Sync {
    /// Returns the descriptor of the named type.
    fn find(&self, type_name: &str) -> Option<&TypeDescriptor>;

    /// Returns the descriptor of the runtime type of a value.
    fn descriptor_of(&self, value: &Value) -> Option<&TypeDescriptor> {
        match value {
            Value::Null => None,
            Value::Object(o) => self.find(o.type_name()),
            other => other.primitive_type_name().and_then(|name| self.find(name)),
        }
    }

    /// Creates an object of the named type with every member set to its default value.
    ///
    /// Returns `None` for primitives and unknown types.
    fn instantiate(&self, type_name: &str) -> Option<ObjectRef> {
        let descriptor = self.find(type_name)?;
        let body = match &descriptor.kind {
            TypeKind::Primitive => return None,
            TypeKind::Struct | TypeKind::Class => ObjectBody::Struct(
                descriptor
                    .members
                    .iter()
                    .map(|m| (m.name.clone(), self.default_value(&m.type_name)))
                    .collect(),
            ),
            TypeKind::Collection { .. } => ObjectBody::List(Vec::new()),
            TypeKind::Dictionary { .. } => ObjectBody::Dictionary(Default::default()),
        };
        Some(ObjectRef::new(type_name, body))
    }

    /// Default value of a member of the named type.
    ///
    /// Structures and collections are instantiated; classes and strings default to null.
    fn default_value(&self, type_name: &str) -> Value {
        match type_name {
            types::BOOL => return Value::Bool(false),
            types::INT => return Value::Int(0),
            types::FLOAT => return Value::Float(0.0),
            _ => {}
        }
        match self.find(type_name).map(TypeDescriptor::kind) {
            Some(TypeKind::Struct | TypeKind::Collection { .. } | TypeKind::Dictionary { .. }) => {
                self.instantiate(type_name).map_or(Value::Null, Value::Object)
            }
            _ => Value::Null,
        }
    }
}

/// In-memory registry of type descriptors.
///
/// A new registry knows the built-in primitives (`bool`, `int`, `float`, `string`, `guid`)
/// and the `object` type that accepts any value.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, TypeDescriptor>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut known = HashMap::new();
        for name in types::BUILT_IN_PRIMITIVES {
            known.insert(name.to_string(), TypeDescriptor::primitive(name));
        }
        known.insert(
            types::OBJECT.to_string(),
            TypeDescriptor::class(types::OBJECT, Vec::new()),
        );
        Self { types: known }
    }

    /// Registers a type, replacing any previous type of the same name.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> &mut Self {
        self.types.insert(descriptor.name.clone(), descriptor);
        self
    }

    /// Builder form of [`TypeRegistry::register`].
    pub fn with(mut self, descriptor: TypeDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    pub fn get(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }
}

impl TypeDescriptorFactory for TypeRegistry {
    fn find(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.get(type_name)
    }
}
