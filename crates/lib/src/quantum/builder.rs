//! Construction of the nodes of one object.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::trace;
use uuid::Uuid;

use super::errors::QuantumError;
use super::node::{NodeArena, NodeId, NodeKind};
use super::reference::{ObjectReference, Reference, ReferenceEnumerable};
use crate::constants::types;
use crate::reflection::{
    Index, ObjectRef, TypeDescriptor, TypeDescriptorFactory, TypeKind, Value,
};

/// Builds the object node of an object and the member nodes of its members.
///
/// Targets of references are left unresolved; the [`NodeContainer`](super::NodeContainer)
/// resolves them once the node is registered, which is what lets cycles terminate.
pub struct NodeBuilder {
    types: Arc<dyn TypeDescriptorFactory>,
    primitive_types: HashSet<String>,
}

impl NodeBuilder {
    pub fn new(types: Arc<dyn TypeDescriptorFactory>) -> Self {
        Self {
            types,
            primitive_types: HashSet::new(),
        }
    }

    pub fn types(&self) -> &dyn TypeDescriptorFactory {
        self.types.as_ref()
    }

    pub(crate) fn shared_types(&self) -> Arc<dyn TypeDescriptorFactory> {
        Arc::clone(&self.types)
    }

    /// Treats values of the named type as opaque: no member nodes and no references.
    pub fn register_primitive_type(&mut self, type_name: impl Into<String>) {
        self.primitive_types.insert(type_name.into());
    }

    /// Forgets a registered primitive type. Built-in primitives cannot be unregistered.
    pub fn unregister_primitive_type(&mut self, type_name: &str) -> Result<bool, QuantumError> {
        if types::BUILT_IN_PRIMITIVES.contains(&type_name) {
            return Err(QuantumError::BuiltInPrimitive {
                type_name: type_name.to_string(),
            });
        }
        Ok(self.primitive_types.remove(type_name))
    }

    pub fn is_primitive_type(&self, type_name: &str) -> bool {
        types::BUILT_IN_PRIMITIVES.contains(&type_name)
            || self.primitive_types.contains(type_name)
            || self
                .types
                .find(type_name)
                .is_some_and(TypeDescriptor::is_primitive)
    }

    /// True for structures, which get a fresh boxed node each time they are exposed.
    pub fn is_value_type(&self, type_name: &str) -> bool {
        self.types
            .find(type_name)
            .is_some_and(|d| d.kind() == &TypeKind::Struct)
    }

    fn descriptor(&self, type_name: &str) -> Result<&TypeDescriptor, QuantumError> {
        self.types
            .find(type_name)
            .ok_or_else(|| QuantumError::UnsupportedShape {
                type_name: type_name.to_string(),
                reason: "the type is not described".to_string(),
            })
    }

    fn check_collection(&self, descriptor: &TypeDescriptor) -> Result<(), QuantumError> {
        match descriptor.kind() {
            TypeKind::Collection {
                has_indexer: false, ..
            } => Err(QuantumError::UnsupportedShape {
                type_name: descriptor.name().to_string(),
                reason: "collections without an indexer are not supported".to_string(),
            }),
            TypeKind::Dictionary { key, .. } if !self.is_primitive_type(key) => {
                Err(QuantumError::UnsupportedShape {
                    type_name: descriptor.name().to_string(),
                    reason: format!("dictionary keys must be primitive, found {key}"),
                })
            }
            // Keys are integers or text; these would not read back as their type.
            TypeKind::Dictionary { key, .. }
                if key.as_str() == types::BOOL || key.as_str() == types::FLOAT =>
            {
                Err(QuantumError::UnsupportedShape {
                    type_name: descriptor.name().to_string(),
                    reason: format!("{key} values cannot be dictionary keys"),
                })
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn build(
        &self,
        arena: &mut NodeArena,
        object: &ObjectRef,
        guid: Uuid,
    ) -> Result<NodeId, QuantumError> {
        let descriptor = self.descriptor(object.type_name())?;
        let Some(expected) = descriptor.expected_body() else {
            return Err(QuantumError::UnsupportedShape {
                type_name: descriptor.name().to_string(),
                reason: "primitive values cannot be object nodes".to_string(),
            });
        };
        let observed = object.shape();
        if expected != observed {
            return Err(QuantumError::ConsistencyViolation {
                expected: format!("{expected} type"),
                observed: format!("{observed} type"),
                node: None,
            });
        }

        // Everything fallible happens before the first node is pushed.
        let reference = if descriptor.is_collection() {
            self.create_reference(descriptor.name(), &Value::Object(object.clone()))?
        } else {
            None
        };
        let mut members = Vec::with_capacity(descriptor.members().len());
        for member in descriptor.members() {
            let value = object.field(member.name()).unwrap_or_default();
            let member_reference = self.create_reference(member.type_name(), &value)?;
            members.push((member.clone(), member_reference));
        }

        let kind = if descriptor.kind() == &TypeKind::Struct {
            NodeKind::Boxed {
                object: object.clone(),
                members: Vec::new(),
                owner: None,
            }
        } else {
            NodeKind::Object {
                object: object.clone(),
                members: Vec::new(),
            }
        };
        let id = arena.push(guid, kind, descriptor.name(), false, reference);
        for (member, member_reference) in members {
            let is_primitive = self.is_primitive_type(member.type_name());
            let type_name = member.type_name().to_string();
            let member_id = arena.push(
                Uuid::new_v4(),
                NodeKind::Member {
                    parent: id,
                    descriptor: member,
                },
                &type_name,
                is_primitive,
                member_reference,
            );
            arena.add_member(id, member_id)?;
        }
        trace!(node = %id, type_name = %descriptor.name(), "Built object node");
        Ok(id)
    }

    /// Reference a node holding `value` must carry, with unresolved targets.
    ///
    /// Primitive values and collections of primitives carry none. A null value is
    /// classified by its declared type.
    pub(crate) fn create_reference(
        &self,
        declared_type: &str,
        value: &Value,
    ) -> Result<Option<Reference>, QuantumError> {
        match value {
            Value::Object(object) => {
                if self.is_primitive_type(object.type_name()) {
                    return Ok(None);
                }
                let descriptor = self.descriptor(object.type_name())?;
                if !descriptor.is_collection() {
                    return Ok(Some(Reference::Object(ObjectReference::new(Index::Empty))));
                }
                self.check_collection(descriptor)?;
                if descriptor
                    .element_type()
                    .is_some_and(|element| self.is_primitive_type(element))
                {
                    return Ok(None);
                }
                let items = object
                    .items()
                    .into_iter()
                    .map(|(index, _)| ObjectReference::new(index))
                    .collect();
                Ok(Some(Reference::Enumerable(ReferenceEnumerable::new(items))))
            }
            Value::Null => {
                if self.is_primitive_type(declared_type) {
                    return Ok(None);
                }
                match self.types.find(declared_type) {
                    Some(descriptor) if descriptor.is_collection() => {
                        self.check_collection(descriptor)?;
                        if descriptor
                            .element_type()
                            .is_some_and(|element| self.is_primitive_type(element))
                        {
                            Ok(None)
                        } else {
                            Ok(Some(Reference::Enumerable(ReferenceEnumerable::default())))
                        }
                    }
                    _ => Ok(Some(Reference::Object(ObjectReference::new(Index::Empty)))),
                }
            }
            _ => Ok(None),
        }
    }
}
