//! Constants used throughout the library.
//!
//! This module provides central definitions for the reserved characters and markers
//! of the asset text format, and the names of the built-in primitive types.

/// Postfix appended to a member name or item id whose value is overridden (`New`).
pub const NEW_POSTFIX: char = '*';

/// Postfix appended to a member name or item id whose value is sealed.
pub const SEALED_POSTFIX: char = '!';

/// Separator between the item id and the key of a dictionary entry (`id~key`).
pub const KEY_SEPARATOR: char = '~';

/// Value written in place of a deleted collection item.
pub const DELETED_MARKER: &str = "~(Deleted)";

/// Prefix of a type tag (`!TypeName`).
pub const TAG_PREFIX: char = '!';

/// Key of the asset identifier in a document.
pub const ID_KEY: &str = "Id";

/// Key of the asset tags in a document.
pub const TAGS_KEY: &str = "Tags";

/// Key of the archetype reference of a derived asset.
pub const ARCHETYPE_KEY: &str = "Archetype";

/// Default indentation width of the text format.
pub const DEFAULT_INDENT: usize = 4;

/// Built-in primitive type names.
pub mod types {
    pub const BOOL: &str = "bool";
    pub const INT: &str = "int";
    pub const FLOAT: &str = "float";
    pub const STRING: &str = "string";
    pub const GUID: &str = "guid";
    /// Declared type accepting any value.
    pub const OBJECT: &str = "object";

    /// All primitive types known without registration.
    pub const BUILT_IN_PRIMITIVES: [&str; 5] = [BOOL, INT, FLOAT, STRING, GUID];
}
