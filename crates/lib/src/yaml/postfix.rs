//! Override markers on member names and item keys.

use std::borrow::Cow;

use super::errors::YamlError;
use crate::assets::OverrideType;
use crate::constants::{KEY_SEPARATOR, NEW_POSTFIX, SEALED_POSTFIX};

/// Splits the override markers off the end of a name.
///
/// Accepts `*`, `!`, `*!` and `!*`.
pub fn parse_override(token: &str) -> (&str, OverrideType) {
    let mut name = token;
    let mut value = OverrideType::BASE;
    for _ in 0..2 {
        if let Some(rest) = name.strip_suffix(NEW_POSTFIX) {
            if value.is_new() {
                break;
            }
            value |= OverrideType::NEW;
            name = rest;
        } else if let Some(rest) = name.strip_suffix(SEALED_POSTFIX) {
            if value.is_sealed() {
                break;
            }
            value |= OverrideType::SEALED;
            name = rest;
        } else {
            break;
        }
    }
    (name, value)
}

/// Appends the markers of `value` to a name.
pub fn format_override(name: &str, value: OverrideType) -> String {
    format!("{name}{}", value.postfix())
}

/// Parts of a dictionary item token `id[markers]~key[markers]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemToken {
    pub id: String,
    pub id_override: OverrideType,
    /// `None` for a bare id, as written for deleted items.
    pub key: Option<String>,
    pub key_override: OverrideType,
}

/// Reads a dictionary item token.
///
/// A key written as a JSON string is taken whole; only the markers after its closing quote
/// are overrides.
pub fn parse_item_token(token: &str) -> Result<ItemToken, YamlError> {
    let (id_part, key_part) = match token.split_once(KEY_SEPARATOR) {
        Some((id, key)) => (id, Some(key)),
        None => (token, None),
    };
    let (id, id_override) = parse_override(id_part);
    let (key, key_override) = match key_part {
        Some(part) => {
            let (key, value) = parse_key(part)?;
            (Some(key), value)
        }
        None => (None, OverrideType::BASE),
    };
    Ok(ItemToken {
        id: id.to_string(),
        id_override,
        key,
        key_override,
    })
}

/// Writes a dictionary item token.
pub fn format_item_token(
    id: &str,
    id_override: OverrideType,
    key: &str,
    key_override: OverrideType,
) -> Result<String, YamlError> {
    Ok(format!(
        "{}{KEY_SEPARATOR}{}",
        format_override(id, id_override),
        format_override(&encode_key(key)?, key_override)
    ))
}

/// Keys that could lose characters to the markers, or that look quoted, are written as
/// JSON strings.
fn encode_key(key: &str) -> Result<Cow<'_, str>, YamlError> {
    if key.starts_with('"') || key.ends_with([NEW_POSTFIX, SEALED_POSTFIX]) {
        Ok(Cow::Owned(serde_json::to_string(key)?))
    } else {
        Ok(Cow::Borrowed(key))
    }
}

fn parse_key(part: &str) -> Result<(String, OverrideType), YamlError> {
    if !part.starts_with('"') {
        let (key, value) = parse_override(part);
        return Ok((key.to_string(), value));
    }
    let mut stream = serde_json::Deserializer::from_str(part).into_iter::<String>();
    let key = stream
        .next()
        .ok_or_else(|| YamlError::format(format!("missing key in {part}")))??;
    let rest = &part[stream.byte_offset()..];
    match parse_override(rest) {
        ("", value) => Ok((key, value)),
        (trailing, _) => Err(YamlError::format(format!(
            "unexpected {trailing} after the key {key}"
        ))),
    }
}
