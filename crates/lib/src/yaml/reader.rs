//! Structural reader of documents.
//!
//! Documents are read with serde_yaml into an ordered tree of mappings, sequences and
//! scalars. Mapping keys are always read as strings, so that item ids made of digits keep
//! their text. Values keep the type YAML gives them and are decoded later against the
//! declared types.

use std::fmt;

use serde::de::{
    self, Deserialize, Deserializer, EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor,
};

use super::errors::YamlError;
use crate::constants::TAG_PREFIX;

#[derive(Debug, Clone)]
pub(crate) struct Document {
    pub tag: Option<String>,
    pub root: Node,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Node {
    /// Local tag (`!Type`) without its prefix.
    pub tag: Option<String>,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NodeKind {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Mapping(Vec<(String, Node)>),
    Sequence(Vec<Node>),
}

impl Node {
    fn untagged(kind: NodeKind) -> Self {
        Self { tag: None, kind }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, NodeKind::Null)
    }

    /// Text of a scalar that is not null.
    pub fn scalar_text(&self) -> Option<String> {
        match &self.kind {
            NodeKind::Bool(b) => Some(b.to_string()),
            NodeKind::Int(i) => Some(i.to_string()),
            NodeKind::Float(f) => Some(f.to_string()),
            NodeKind::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            NodeKind::Null => "null",
            NodeKind::Bool(_) => "a boolean",
            NodeKind::Int(_) => "an integer",
            NodeKind::Float(_) => "a float",
            NodeKind::String(_) => "a string",
            NodeKind::Mapping(_) => "a mapping",
            NodeKind::Sequence(_) => "a sequence",
        }
    }
}

pub(crate) fn parse_document(text: &str) -> Result<Document, YamlError> {
    let mut root =
        Node::deserialize(serde_yaml::Deserializer::from_str(text)).map_err(syntax_error)?;
    let tag = root.tag.take();
    Ok(Document { tag, root })
}

fn syntax_error(err: serde_yaml::Error) -> YamlError {
    match err.location() {
        Some(location) => YamlError::Syntax {
            line: location.line(),
            reason: err.to_string(),
        },
        None => YamlError::Scalar(err),
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a YAML node")
    }

    fn visit_unit<E>(self) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::untagged(NodeKind::Null))
    }

    fn visit_none<E>(self) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::untagged(NodeKind::Null))
    }

    fn visit_bool<E>(self, v: bool) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::untagged(NodeKind::Bool(v)))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::untagged(NodeKind::Int(v)))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Node, E>
    where
        E: de::Error,
    {
        let kind = match i64::try_from(v) {
            Ok(i) => NodeKind::Int(i),
            Err(_) => NodeKind::Float(v as f64),
        };
        Ok(Node::untagged(kind))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::untagged(NodeKind::Float(v)))
    }

    fn visit_str<E>(self, v: &str) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::untagged(NodeKind::String(v.to_owned())))
    }

    fn visit_string<E>(self, v: String) -> Result<Node, E>
    where
        E: de::Error,
    {
        Ok(Node::untagged(NodeKind::String(v)))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Node, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Node>()? {
            items.push(item);
        }
        Ok(Node::untagged(NodeKind::Sequence(items)))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Node, A::Error>
    where
        A: MapAccess<'de>,
    {
        // Keys go through `String` so they are never resolved to numbers or booleans.
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value::<Node>()?;
            entries.push((key, value));
        }
        Ok(Node::untagged(NodeKind::Mapping(entries)))
    }

    /// serde_yaml hands a tagged node over as an enum named by its tag.
    fn visit_enum<A>(self, data: A) -> Result<Node, A::Error>
    where
        A: EnumAccess<'de>,
    {
        let (tag, variant) = data.variant::<String>()?;
        let mut node = variant.newtype_variant::<Node>()?;
        let tag = tag.strip_prefix(TAG_PREFIX).unwrap_or(&tag).to_string();
        node.tag = Some(tag);
        Ok(node)
    }
}
