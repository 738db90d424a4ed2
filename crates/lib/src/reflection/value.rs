//! Values stored in object members and collection items.

use std::fmt;

use super::object::ObjectRef;
use crate::constants::types;

/// A value held by a member of an object or by an item of a collection.
///
/// Primitives are copied by value. Objects are shared through [`ObjectRef`], and two
/// `Value::Object`s are equal only when they point at the same object.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Object(ObjectRef),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for every value that is not an object.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Value::Object(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Name of the built-in primitive type of this value, `None` for null and objects.
    pub fn primitive_type_name(&self) -> Option<&'static str> {
        match self {
            Value::Bool(_) => Some(types::BOOL),
            Value::Int(_) => Some(types::INT),
            Value::Float(_) => Some(types::FLOAT),
            Value::String(_) => Some(types::STRING),
            Value::Null | Value::Object(_) => None,
        }
    }

    /// Runtime type name of the value, `None` for null.
    pub fn runtime_type_name(&self) -> Option<String> {
        match self {
            Value::Object(o) => Some(o.type_name().to_string()),
            other => other.primitive_type_name().map(str::to_string),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl PartialEq<i64> for Value {
    fn eq(&self, other: &i64) -> bool {
        self.as_int() == Some(*other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Object(o) => write!(f, "<{}>", o.type_name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Position of an item in a list or key of an item in a dictionary.
///
/// `Index::Empty` addresses the value of a node itself rather than one of its items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Index {
    #[default]
    Empty,
    Int(i64),
    Key(String),
}

impl Index {
    pub fn is_empty(&self) -> bool {
        matches!(self, Index::Empty)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Index::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_key(&self) -> Option<&str> {
        match self {
            Index::Key(k) => Some(k),
            _ => None,
        }
    }

    /// List position of a non-negative integer index.
    pub fn position(&self) -> Option<usize> {
        self.as_int().and_then(|i| usize::try_from(i).ok())
    }

    /// Converts a value into a dictionary key. Only integers and strings are keys.
    pub fn from_value(value: &Value) -> Option<Index> {
        match value {
            Value::Int(i) => Some(Index::Int(*i)),
            Value::String(s) => Some(Index::Key(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Index::Empty => Value::Null,
            Index::Int(i) => Value::Int(*i),
            Index::Key(k) => Value::String(k.clone()),
        }
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Index::Empty => Ok(()),
            Index::Int(i) => write!(f, "{i}"),
            Index::Key(k) => write!(f, "{k}"),
        }
    }
}

impl From<i64> for Index {
    fn from(i: i64) -> Self {
        Index::Int(i)
    }
}

impl From<i32> for Index {
    fn from(i: i32) -> Self {
        Index::Int(i64::from(i))
    }
}

impl From<usize> for Index {
    fn from(i: usize) -> Self {
        Index::Int(i as i64)
    }
}

impl From<&str> for Index {
    fn from(k: &str) -> Self {
        Index::Key(k.to_string())
    }
}

impl From<String> for Index {
    fn from(k: String) -> Self {
        Index::Key(k)
    }
}

impl From<&Index> for Index {
    fn from(i: &Index) -> Self {
        i.clone()
    }
}
