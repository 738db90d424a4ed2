//!
//! Assetgraph: archetype-aware property graphs for asset documents.
//! This library tracks which properties of a derived asset override its base (its archetype),
//! keeps collection items addressable by stable identifiers, and persists both in a YAML-like text format.
//!
//! ## Core Concepts
//!
//! * **Reflection (`reflection`)**: Dynamic object values (`Value`, `ObjectRef`) described by a `TypeRegistry`.
//! * **Item identity (`identity::ItemId`)**: A stable 128-bit identifier for every item of an identifiable collection,
//!   kept in a `CollectionItemIdentifiers` table shadowing the collection.
//! * **Content graph (`quantum::NodeContainer`)**: A graph of content nodes mirroring an object tree, with
//!   references deduplicated by object identity so shared and cyclic references map to the same node.
//! * **Linking (`quantum::GraphNodeLinker`)**: Pairs nodes of a derived graph with the corresponding nodes of its base.
//! * **Property graphs (`assets::AssetPropertyGraphContainer`)**: Records per-property and per-item overrides and
//!   reconciles derived assets when their base changes.
//! * **Text format (`yaml::AssetFileSerializer`)**: Writes and reads assets with override markers (`*`, `!`) and item ids.

pub mod assets;
pub mod constants;
pub mod identity;
pub mod quantum;
pub mod reflection;
pub mod yaml;

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Structured errors from object access in the reflection module
    #[error(transparent)]
    Reflection(reflection::ReflectionError),

    /// Structured errors from the identity module
    #[error(transparent)]
    Identity(identity::IdentityError),

    /// Structured errors from the content graph
    #[error(transparent)]
    Quantum(quantum::QuantumError),

    /// Structured errors from the asset property graphs
    #[error(transparent)]
    Asset(assets::AssetError),

    /// Structured errors from the text format
    #[error(transparent)]
    Yaml(yaml::YamlError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Reflection(_) => "reflection",
            Error::Identity(_) => "identity",
            Error::Quantum(_) => "quantum",
            Error::Asset(_) => "assets",
            Error::Yaml(_) => "yaml",
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Reflection(err) => err.is_not_found(),
            Error::Identity(err) => err.is_not_found(),
            Error::Quantum(err) => err.is_not_found(),
            Error::Asset(err) => err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates a conflict (already exists).
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Reflection(err) => err.is_already_exists(),
            Error::Identity(err) => err.is_already_exists(),
            _ => false,
        }
    }

    /// Check if this error reports a graph that no longer matches the objects it mirrors.
    pub fn is_consistency_error(&self) -> bool {
        match self {
            Error::Quantum(err) => err.is_consistency_error(),
            _ => false,
        }
    }

    /// Check if this error reports an object shape the graph cannot represent.
    pub fn is_unsupported(&self) -> bool {
        match self {
            Error::Quantum(err) => err.is_unsupported(),
            _ => false,
        }
    }

    /// Check if this error is a malformed or mistyped document.
    pub fn is_format_error(&self) -> bool {
        match self {
            Error::Yaml(err) => err.is_format_error(),
            Error::Identity(err) => err.is_parse_error(),
            _ => false,
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Yaml(err) => err.is_io_error(),
            _ => false,
        }
    }
}
