//! Text format of assets.
//!
//! Assets are written as YAML documents and read back with serde_yaml. Override markers are
//! appended to member names and item ids (`*` for `New`, `!` for `Sealed`). Items of
//! identifiable collections are keyed by their id (`id~key` for dictionaries, with the key
//! JSON-quoted when it ends with a marker) and deleted items are kept as `id: ~(Deleted)`.
//!
//! ```text
//! !MyAsset
//! Id: 00000002-0002-0000-0200-000002000000
//! Tags: []
//! Archetype: 00000001-0001-0000-0100-000001000000:MyAsset
//! MyStrings:
//!     0a0000000a0000000a0000000a000000: String1
//!     14000000140000001400000014000000*: MyDerivedString
//! ```

pub mod errors;
pub mod postfix;
mod reader;
pub mod serializer;
mod writer;

pub use errors::YamlError;
pub use postfix::{
    ItemToken, format_item_token, format_override, parse_item_token, parse_override,
};
pub use serializer::{AssetFileSerializer, SerializerSettings};
