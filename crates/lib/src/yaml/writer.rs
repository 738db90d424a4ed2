//! Writing of object trees with their overrides and item ids.

use super::errors::YamlError;
use super::postfix::{format_item_token, format_override};
use crate::Result;
use crate::assets::{AssetError, AssetPath, OverrideMap, OverrideType};
use crate::constants::{DELETED_MARKER, TAG_PREFIX, types};
use crate::reflection::{ObjectRef, TypeDescriptor, TypeDescriptorFactory, TypeKind, Value};

pub(crate) struct Writer<'a> {
    types: &'a dyn TypeDescriptorFactory,
    overrides: &'a OverrideMap,
    indent: usize,
    out: String,
}

impl<'a> Writer<'a> {
    pub fn new(
        types: &'a dyn TypeDescriptorFactory,
        overrides: &'a OverrideMap,
        indent: usize,
    ) -> Self {
        Self {
            types,
            overrides,
            indent: indent.max(2),
            out: String::new(),
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    pub fn line(&mut self, depth: usize, text: &str) {
        self.out.push_str(&" ".repeat(depth * self.indent));
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Writes `key: [sequence of strings]`.
    pub fn write_string_list(&mut self, depth: usize, key: &str, values: &[String]) -> Result<()> {
        if values.is_empty() {
            self.line(depth, &format!("{key}: []"));
            return Ok(());
        }
        self.line(depth, &format!("{key}:"));
        for value in values {
            let text = format!("{}{}", self.dash(), encode_string(value)?);
            self.line(depth + 1, &text);
        }
        Ok(())
    }

    /// Writes the content of an object: its members, or its items.
    pub fn write_body(
        &mut self,
        depth: usize,
        object: &ObjectRef,
        path: &AssetPath,
        identifiable: bool,
    ) -> Result<()> {
        let descriptor = self.descriptor(object.type_name())?;
        match descriptor.kind() {
            TypeKind::Primitive => Err(YamlError::format(format!(
                "an object cannot be of primitive type {}",
                descriptor.name()
            ))
            .into()),
            TypeKind::Struct | TypeKind::Class => {
                for member in descriptor.members() {
                    let value = object.field(member.name()).unwrap_or_default();
                    let member_path = path.with_member(member.name());
                    let token = format_override(member.name(), self.override_at(&member_path));
                    self.write_entry(
                        depth,
                        &token,
                        member.type_name(),
                        &value,
                        &member_path,
                        !member.has_non_identifiable_items(),
                    )?;
                }
                Ok(())
            }
            TypeKind::Collection { element, .. } if identifiable => {
                let ids = object.item_ids();
                for (index, item) in object.items() {
                    let id = ids.try_get(&index)?;
                    let item_path = path.with_item_id(id);
                    let token = format_override(&id.to_string(), self.override_at(&item_path));
                    self.write_entry(depth, &token, element, &item, &item_path, true)?;
                }
                for id in ids.deleted_items() {
                    self.line(depth, &format!("{id}: {DELETED_MARKER}"));
                }
                Ok(())
            }
            TypeKind::Collection { element, .. } => {
                for (index, item) in object.items() {
                    let item_path = path.with_index(index);
                    self.write_sequence_item(depth, element, &item, &item_path)?;
                }
                Ok(())
            }
            TypeKind::Dictionary { value, .. } if identifiable => {
                let ids = object.item_ids();
                for (key, item) in object.items() {
                    let id = ids.try_get(&key)?;
                    let item_path = path.with_item_id(id);
                    let key_path = path.with_index(key.clone());
                    let token = format_item_token(
                        &id.to_string(),
                        self.override_at(&item_path),
                        &key.to_string(),
                        self.override_at(&key_path),
                    )?;
                    self.write_entry(depth, &token, value, &item, &item_path, true)?;
                }
                for id in ids.deleted_items() {
                    self.line(depth, &format!("{id}: {DELETED_MARKER}"));
                }
                Ok(())
            }
            TypeKind::Dictionary { value, .. } => {
                for (key, item) in object.items() {
                    let item_path = path.with_index(key.clone());
                    self.write_entry(depth, &key.to_string(), value, &item, &item_path, true)?;
                }
                Ok(())
            }
        }
    }

    /// Writes `key: value`, or `key:` followed by the body of an object.
    fn write_entry(
        &mut self,
        depth: usize,
        key: &str,
        declared: &str,
        value: &Value,
        path: &AssetPath,
        identifiable: bool,
    ) -> Result<()> {
        let key = encode_key(key)?;
        match value {
            Value::Object(object) => {
                self.write_object(depth, &format!("{key}:"), declared, object, path, identifiable)
            }
            scalar => {
                let text = format!("{key}: {}", encode_scalar(scalar)?);
                self.line(depth, &text);
                Ok(())
            }
        }
    }

    fn write_sequence_item(
        &mut self,
        depth: usize,
        declared: &str,
        value: &Value,
        path: &AssetPath,
    ) -> Result<()> {
        let Value::Object(object) = value else {
            let text = format!("{}{}", self.dash(), encode_scalar(value)?);
            self.line(depth, &text);
            return Ok(());
        };
        let descriptor = self.descriptor(object.type_name())?;
        let compact = object.type_name() == declared
            && matches!(descriptor.kind(), TypeKind::Struct | TypeKind::Class)
            && !descriptor.members().is_empty();
        if !compact {
            return self.write_object(depth, "-", declared, object, path, true);
        }
        // Members one level deeper, the first one moved onto the line of the dash.
        let start = self.out.len();
        self.write_body(depth + 1, object, path, true)?;
        let prefix = format!("{}{}", " ".repeat(depth * self.indent), self.dash());
        self.out.replace_range(start..start + prefix.len(), &prefix);
        Ok(())
    }

    /// Writes `header` with the type tag of the object if it is not the declared type, then
    /// the body of the object one level deeper.
    fn write_object(
        &mut self,
        depth: usize,
        header: &str,
        declared: &str,
        object: &ObjectRef,
        path: &AssetPath,
        identifiable: bool,
    ) -> Result<()> {
        let header = if object.type_name() == declared {
            header.to_string()
        } else {
            format!("{header} {TAG_PREFIX}{}", object.type_name())
        };
        let descriptor = self.descriptor(object.type_name())?;
        if let Some(empty) = empty_marker(descriptor, object, identifiable) {
            self.line(depth, &format!("{header} {empty}"));
            return Ok(());
        }
        self.line(depth, &header);
        self.write_body(depth + 1, object, path, identifiable)
    }

    fn descriptor(&self, type_name: &str) -> Result<&'a TypeDescriptor> {
        Ok(self
            .types
            .find(type_name)
            .ok_or_else(|| AssetError::UnknownType {
                type_name: type_name.to_string(),
            })?)
    }

    fn override_at(&self, path: &AssetPath) -> OverrideType {
        self.overrides.get(path).copied().unwrap_or_default()
    }

    fn dash(&self) -> String {
        format!("-{}", " ".repeat(self.indent - 1))
    }
}

/// Inline form of an object with nothing to write.
fn empty_marker(
    descriptor: &TypeDescriptor,
    object: &ObjectRef,
    identifiable: bool,
) -> Option<&'static str> {
    match descriptor.kind() {
        TypeKind::Primitive => None,
        TypeKind::Struct | TypeKind::Class => descriptor.members().is_empty().then_some("{}"),
        TypeKind::Collection { .. } | TypeKind::Dictionary { .. } => {
            let has_items = object.item_count().unwrap_or(0) > 0;
            let has_deleted = identifiable && object.item_ids().deleted_count() > 0;
            if has_items || has_deleted {
                None
            } else if identifiable || descriptor.is_dictionary() {
                Some("{}")
            } else {
                Some("[]")
            }
        }
    }
}

pub(crate) fn encode_scalar(value: &Value) -> Result<String> {
    Ok(match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => trim_document(serde_yaml::to_string(f).map_err(YamlError::from)?),
        // Tagged, so that it is never read back as a deleted item.
        Value::String(s) if s == DELETED_MARKER => format!(
            "{TAG_PREFIX}{} {}",
            types::STRING,
            serde_json::to_string(s).map_err(YamlError::from)?
        ),
        Value::String(s) => encode_string(s)?,
        Value::Object(object) => {
            return Err(YamlError::format(format!(
                "{} is not a scalar",
                object.type_name()
            ))
            .into());
        }
    })
}

/// Plain or single-quoted when that fits on one line, double-quoted otherwise.
pub(crate) fn encode_string(text: &str) -> Result<String> {
    let encoded = trim_document(serde_yaml::to_string(text).map_err(YamlError::from)?);
    let ambiguous = encoded.contains('\n')
        || encoded.contains(": ")
        || encoded.ends_with(':')
        || encoded.starts_with(TAG_PREFIX)
        || encoded.starts_with('-');
    if ambiguous {
        return Ok(serde_json::to_string(text).map_err(YamlError::from)?);
    }
    Ok(encoded)
}

const RESERVED_KEY_START: [char; 17] = [
    '"', '\'', '!', '&', '*', '#', '[', ']', '{', '}', '|', '>', '%', '@', '`', '-', ' ',
];

/// Keys are written as they are unless they could be read back as something else.
fn encode_key(key: &str) -> Result<String> {
    let plain = !key.is_empty()
        && !key.contains(": ")
        && !key.contains('\n')
        && !key.contains(" #")
        && !key.ends_with(':')
        && !key.starts_with(RESERVED_KEY_START)
        && !key.ends_with(' ');
    if plain {
        Ok(key.to_string())
    } else {
        Ok(serde_json::to_string(key).map_err(YamlError::from)?)
    }
}

fn trim_document(text: String) -> String {
    text.trim_end_matches('\n').to_string()
}
