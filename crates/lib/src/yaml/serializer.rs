//! Saving and loading assets.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use tracing::{debug, warn};

use super::errors::YamlError;
use super::postfix::{parse_item_token, parse_override};
use super::reader::{Node, NodeKind, parse_document};
use super::writer::Writer;
use crate::Result;
use crate::assets::{
    Asset, AssetError, AssetId, AssetItem, AssetPath, AssetReference, OverrideMap,
};
use crate::constants::{ARCHETYPE_KEY, DEFAULT_INDENT, DELETED_MARKER, ID_KEY, TAGS_KEY, types};
use crate::identity::{CollectionItemIdentifiers, ItemId, generate_missing_item_ids};
use crate::reflection::{
    Index, ObjectBody, ObjectRef, TypeDescriptor, TypeDescriptorFactory, TypeKind, Value,
};

/// Options of an [`AssetFileSerializer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializerSettings {
    /// Spaces per nesting level.
    pub indent: usize,
}

impl Default for SerializerSettings {
    fn default() -> Self {
        Self {
            indent: DEFAULT_INDENT,
        }
    }
}

/// Reads and writes assets in the text format, overrides and item ids included.
///
/// # Examples
///
/// ```
/// use assetgraph::assets::{Asset, AssetId, AssetItem};
/// use assetgraph::reflection::{MemberDescriptor, ObjectRef, TypeDescriptor, TypeRegistry, Value};
/// use assetgraph::yaml::AssetFileSerializer;
///
/// let types = TypeRegistry::new().with(TypeDescriptor::class(
///     "Settings",
///     vec![MemberDescriptor::new("Name", "string")],
/// ));
/// let root = ObjectRef::new_struct("Settings", [("Name", Value::from("a"))]);
/// let item = AssetItem::new("Settings", Asset::new(AssetId::new(), root));
///
/// let serializer = AssetFileSerializer::new(&types);
/// let text = serializer.save_asset(&item)?;
/// assert!(text.starts_with("!Settings\n"));
///
/// let loaded = serializer.load_asset(&text, "Settings")?;
/// assert_eq!(loaded.asset.id, item.asset.id);
/// assert_eq!(loaded.asset.root.field("Name"), Some(Value::from("a")));
/// # Ok::<(), assetgraph::Error>(())
/// ```
pub struct AssetFileSerializer<'a> {
    types: &'a dyn TypeDescriptorFactory,
    settings: SerializerSettings,
}

impl<'a> AssetFileSerializer<'a> {
    pub fn new(types: &'a dyn TypeDescriptorFactory) -> Self {
        Self::with_settings(types, SerializerSettings::default())
    }

    pub fn with_settings(
        types: &'a dyn TypeDescriptorFactory,
        settings: SerializerSettings,
    ) -> Self {
        Self { types, settings }
    }

    pub fn settings(&self) -> SerializerSettings {
        self.settings
    }

    /// Writes an asset with the overrides of `item.overrides`.
    pub fn save_asset(&self, item: &AssetItem) -> Result<String> {
        let asset = &item.asset;
        generate_missing_item_ids(self.types, &asset.root);
        let mut writer = Writer::new(self.types, &item.overrides, self.settings.indent);
        writer.line(0, &format!("!{}", asset.type_name()));
        writer.line(0, &format!("{ID_KEY}: {}", asset.id));
        writer.write_string_list(0, TAGS_KEY, &asset.tags)?;
        if let Some(archetype) = &asset.archetype {
            writer.line(0, &format!("{ARCHETYPE_KEY}: {archetype}"));
        }
        writer.write_body(0, &asset.root, &AssetPath::new(), true)?;
        debug!(asset = %asset.id, location = %item.location, "Saved asset");
        Ok(writer.finish())
    }

    /// Reads an asset. The overrides found in the text are returned in `overrides` of the item.
    pub fn load_asset(&self, text: &str, location: impl Into<String>) -> Result<AssetItem> {
        let document = parse_document(text)?;
        let type_name = document
            .tag
            .ok_or_else(|| YamlError::format("the document has no type tag"))?;
        let entries = as_mapping(&document.root)?;

        let mut id = None;
        let mut tags = Vec::new();
        let mut archetype = None;
        for (key, node) in entries {
            match key.as_str() {
                ID_KEY => id = Some(parse_asset_id(node)?),
                TAGS_KEY => tags = read_string_list(node)?,
                ARCHETYPE_KEY if !node.is_null() => {
                    archetype = Some(scalar(node)?.parse::<AssetReference>()?);
                }
                _ => {}
            }
        }
        let id = id.ok_or_else(|| YamlError::format(format!("the asset has no {ID_KEY}")))?;

        let mut context = ReadContext {
            types: self.types,
            overrides: OverrideMap::new(),
        };
        let descriptor = context.descriptor(&type_name)?;
        let root = context.read_struct(
            descriptor,
            entries,
            &AssetPath::new(),
            &[ID_KEY, TAGS_KEY, ARCHETYPE_KEY],
        )?;

        let location = location.into();
        debug!(
            asset = %id,
            location = %location,
            overrides = context.overrides.len(),
            "Loaded asset"
        );
        let mut item = AssetItem::new(
            location,
            Asset {
                id,
                tags,
                archetype,
                root,
            },
        );
        item.overrides = context.overrides;
        Ok(item)
    }

    /// Writes a single object with its overrides, without asset header.
    pub fn save_object(&self, object: &ObjectRef, overrides: &OverrideMap) -> Result<String> {
        generate_missing_item_ids(self.types, object);
        let mut writer = Writer::new(self.types, overrides, self.settings.indent);
        writer.line(0, &format!("!{}", object.type_name()));
        writer.write_body(0, object, &AssetPath::new(), true)?;
        Ok(writer.finish())
    }

    /// Reads an object written by [`save_object`](Self::save_object) and its overrides.
    pub fn load_object(&self, text: &str) -> Result<(ObjectRef, OverrideMap)> {
        let document = parse_document(text)?;
        let type_name = document
            .tag
            .ok_or_else(|| YamlError::format("the document has no type tag"))?;
        let mut context = ReadContext {
            types: self.types,
            overrides: OverrideMap::new(),
        };
        let object = context.read_object(&type_name, &document.root, &AssetPath::new(), true)?;
        Ok((object, context.overrides))
    }

    pub fn save_to_path(&self, item: &AssetItem, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.save_asset(item)?;
        std::fs::write(path, text).map_err(|source| YamlError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    pub fn load_from_path(
        &self,
        path: impl AsRef<Path>,
        location: impl Into<String>,
    ) -> Result<AssetItem> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| YamlError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.load_asset(&text, location)
    }
}

struct ReadContext<'a> {
    types: &'a dyn TypeDescriptorFactory,
    overrides: OverrideMap,
}

impl<'a> ReadContext<'a> {
    fn descriptor(&self, type_name: &str) -> Result<&'a TypeDescriptor> {
        Ok(self
            .types
            .find(type_name)
            .ok_or_else(|| AssetError::UnknownType {
                type_name: type_name.to_string(),
            })?)
    }

    fn read_value(
        &mut self,
        declared: &str,
        node: &Node,
        path: &AssetPath,
        identifiable: bool,
    ) -> Result<Value> {
        let type_name = node.tag.as_deref().unwrap_or(declared);
        match &node.kind {
            NodeKind::Null => Ok(Value::Null),
            NodeKind::Mapping(_) | NodeKind::Sequence(_) => Ok(Value::Object(
                self.read_object(type_name, node, path, identifiable)?,
            )),
            _ => decode_scalar(self.types, type_name, node, path),
        }
    }

    fn read_object(
        &mut self,
        type_name: &str,
        node: &Node,
        path: &AssetPath,
        identifiable: bool,
    ) -> Result<ObjectRef> {
        let descriptor = self.descriptor(type_name)?;
        match descriptor.kind() {
            TypeKind::Primitive => Err(YamlError::format(format!(
                "{path}: {type_name} is not an object type"
            ))
            .into()),
            TypeKind::Struct | TypeKind::Class => {
                self.read_struct(descriptor, as_mapping(node)?, path, &[])
            }
            TypeKind::Collection { element, .. } => {
                self.read_list(descriptor, element, node, path, identifiable)
            }
            TypeKind::Dictionary { key, value } => {
                self.read_dictionary(descriptor, key, value, node, path, identifiable)
            }
        }
    }

    fn read_struct(
        &mut self,
        descriptor: &TypeDescriptor,
        entries: &[(String, Node)],
        path: &AssetPath,
        reserved: &[&str],
    ) -> Result<ObjectRef> {
        let object = ObjectRef::new(descriptor.name(), ObjectBody::Struct(BTreeMap::new()));
        let mut seen = HashSet::new();
        for (key, node) in entries {
            if reserved.contains(&key.as_str()) {
                continue;
            }
            let (name, value) = parse_override(key);
            let Some(member) = descriptor.member(name) else {
                warn!(type_name = %descriptor.name(), member = %name, "Ignoring unknown member");
                continue;
            };
            let member_path = path.with_member(name);
            if !value.is_base() {
                self.overrides.insert(member_path.clone(), value);
            }
            let content = self.read_value(
                member.type_name(),
                node,
                &member_path,
                !member.has_non_identifiable_items(),
            )?;
            object.set_field(name, content)?;
            seen.insert(name);
        }
        for member in descriptor.members() {
            if !seen.contains(member.name()) {
                object.set_field(member.name(), self.types.default_value(member.type_name()))?;
            }
        }
        Ok(object)
    }

    fn read_list(
        &mut self,
        descriptor: &TypeDescriptor,
        element: &str,
        node: &Node,
        path: &AssetPath,
        identifiable: bool,
    ) -> Result<ObjectRef> {
        let list = ObjectRef::new(descriptor.name(), ObjectBody::List(Vec::new()));
        match &node.kind {
            NodeKind::Sequence(items) => {
                for (position, item) in items.iter().enumerate() {
                    let item_path = path.with_index(Index::from(position));
                    let value = self.read_value(element, item, &item_path, true)?;
                    list.insert_item(&Index::Empty, value)?;
                }
            }
            NodeKind::Mapping(entries) => {
                let mut ids = CollectionItemIdentifiers::new();
                for (key, item) in entries {
                    let (token, value) = parse_override(key);
                    let id: ItemId = token.parse()?;
                    if is_deleted_marker(item) {
                        ids.mark_as_deleted(id);
                        continue;
                    }
                    let item_path = path.with_item_id(id);
                    if !value.is_base() {
                        self.overrides.insert(item_path.clone(), value);
                    }
                    let content = self.read_value(element, item, &item_path, true)?;
                    let index = list.insert_item(&Index::Empty, content)?;
                    ids.add(index, id)?;
                }
                if identifiable {
                    list.set_item_ids(Some(ids));
                }
            }
            _ => {
                return Err(YamlError::format(format!(
                    "{path}: expected the items of {}, found {}",
                    descriptor.name(),
                    node.kind_name()
                ))
                .into());
            }
        }
        Ok(list)
    }

    fn read_dictionary(
        &mut self,
        descriptor: &TypeDescriptor,
        key_type: &str,
        value_type: &str,
        node: &Node,
        path: &AssetPath,
        identifiable: bool,
    ) -> Result<ObjectRef> {
        let dictionary =
            ObjectRef::new(descriptor.name(), ObjectBody::Dictionary(BTreeMap::new()));
        let NodeKind::Mapping(entries) = &node.kind else {
            return Err(YamlError::format(format!(
                "{path}: expected the entries of {}, found {}",
                descriptor.name(),
                node.kind_name()
            ))
            .into());
        };
        let mut ids = CollectionItemIdentifiers::new();
        for (text, item) in entries {
            if !identifiable {
                let key = decode_key(key_type, text)?;
                let item_path = path.with_index(key.clone());
                let content = self.read_value(value_type, item, &item_path, true)?;
                dictionary.insert_item(&key, content)?;
                continue;
            }

            let token = parse_item_token(text)?;
            let id: ItemId = token.id.parse()?;
            let Some(key_text) = &token.key else {
                if is_deleted_marker(item) {
                    ids.mark_as_deleted(id);
                    continue;
                }
                return Err(YamlError::format(format!(
                    "{path}: dictionary entry {text} has no key"
                ))
                .into());
            };
            let key = decode_key(key_type, key_text)?;
            let item_path = path.with_item_id(id);
            if !token.id_override.is_base() {
                self.overrides.insert(item_path.clone(), token.id_override);
            }
            if !token.key_override.is_base() {
                self.overrides
                    .insert(path.with_index(key.clone()), token.key_override);
            }
            let content = self.read_value(value_type, item, &item_path, true)?;
            dictionary.insert_item(&key, content)?;
            ids.add(key, id)?;
        }
        if identifiable {
            dictionary.set_item_ids(Some(ids));
        }
        Ok(dictionary)
    }
}

fn as_mapping(node: &Node) -> Result<&[(String, Node)]> {
    match &node.kind {
        NodeKind::Mapping(entries) => Ok(entries),
        NodeKind::Null => Ok(&[]),
        _ => Err(
            YamlError::format(format!("expected a mapping, found {}", node.kind_name())).into(),
        ),
    }
}

fn scalar(node: &Node) -> Result<String> {
    node.scalar_text().ok_or_else(|| {
        YamlError::format(format!("expected a scalar, found {}", node.kind_name())).into()
    })
}

/// Only an untagged marker is a deleted item; the writer tags a string holding the marker.
fn is_deleted_marker(node: &Node) -> bool {
    node.tag.is_none() && matches!(&node.kind, NodeKind::String(text) if text == DELETED_MARKER)
}

fn parse_asset_id(node: &Node) -> Result<AssetId> {
    Ok(scalar(node)?.parse::<AssetId>()?)
}

fn read_string_list(node: &Node) -> Result<Vec<String>> {
    match &node.kind {
        NodeKind::Sequence(items) => items.iter().map(scalar).collect(),
        NodeKind::Null => Ok(Vec::new()),
        _ => {
            Err(YamlError::format(format!("expected a list, found {}", node.kind_name())).into())
        }
    }
}

fn decode_key(key_type: &str, text: &str) -> Result<Index> {
    if key_type == types::INT {
        let value = text
            .parse::<i64>()
            .map_err(|_| YamlError::format(format!("invalid integer key {text}")))?;
        return Ok(Index::Int(value));
    }
    Ok(Index::Key(text.to_string()))
}

fn decode_scalar(
    registry: &dyn TypeDescriptorFactory,
    type_name: &str,
    node: &Node,
    path: &AssetPath,
) -> Result<Value> {
    let mismatch = || -> crate::Error {
        YamlError::format(format!(
            "{path}: expected {type_name}, found {}",
            node.kind_name()
        ))
        .into()
    };
    let value = match (type_name, &node.kind) {
        (types::BOOL, NodeKind::Bool(b)) => Value::Bool(*b),
        (types::INT, NodeKind::Int(i)) => Value::Int(*i),
        (types::FLOAT, NodeKind::Float(f)) => Value::Float(*f),
        (types::FLOAT, NodeKind::Int(i)) => Value::Float(*i as f64),
        (types::BOOL | types::INT | types::FLOAT, _) => return Err(mismatch()),
        (types::OBJECT, kind) => match kind {
            NodeKind::Bool(b) => Value::Bool(*b),
            NodeKind::Int(i) => Value::Int(*i),
            NodeKind::Float(f) => Value::Float(*f),
            NodeKind::String(s) => Value::String(s.clone()),
            _ => return Err(mismatch()),
        },
        _ => match registry.find(type_name) {
            Some(descriptor) if !descriptor.is_primitive() => return Err(mismatch()),
            _ => Value::String(node.scalar_text().ok_or_else(mismatch)?),
        },
    };
    Ok(value)
}
