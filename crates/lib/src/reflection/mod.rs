//! Dynamic object model the content graph is built over.
//!
//! Assets are plain object trees made of primitive values and reference-counted objects.
//! Every object carries a runtime type name that is resolved through a [`TypeDescriptorFactory`]
//! (usually a [`TypeRegistry`]) to learn its members, whether it is a value type, and whether it
//! is a list or a dictionary.
//!
//! # Core Types
//!
//! - [`Value`] - A primitive value or a handle to an object
//! - [`ObjectRef`] - Shared, identity-bearing handle to an object body
//! - [`Index`] - Position in a list or key in a dictionary
//! - [`TypeDescriptor`] / [`MemberDescriptor`] - Shape of a type and of its members

pub mod descriptor;
pub mod errors;
pub mod object;
pub mod value;

pub use descriptor::{
    MemberDescriptor, TypeDescriptor, TypeDescriptorFactory, TypeKind, TypeRegistry,
};
pub use errors::ReflectionError;
pub use object::{BodyShape, ObjectBody, ObjectKey, ObjectRef, WeakObjectRef};
pub use value::{Index, Value};
