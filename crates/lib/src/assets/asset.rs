//! Asset documents and their identity.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tracing::debug;
use uuid::Uuid;

use super::cloner::{AssetCloner, ClonerFlags};
use super::errors::AssetError;
use super::override_type::OverrideType;
use super::path::AssetPath;
use crate::identity::generate_missing_item_ids;
use crate::reflection::{ObjectRef, TypeDescriptorFactory};

/// Identifier of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(Uuid);

impl AssetId {
    /// A new random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AssetId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssetId {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| AssetError::InvalidAssetReference {
                text: s.to_string(),
            })
    }
}

/// Reference to another asset: its id and the location it was loaded from.
///
/// Written as `id:location`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetReference {
    pub id: AssetId,
    pub location: String,
}

impl AssetReference {
    pub fn new(id: AssetId, location: impl Into<String>) -> Self {
        Self {
            id,
            location: location.into(),
        }
    }
}

impl fmt::Display for AssetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.location)
    }
}

impl FromStr for AssetReference {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AssetError::InvalidAssetReference {
            text: s.to_string(),
        };
        let (id, location) = s.trim().split_once(':').ok_or_else(invalid)?;
        let id = id.parse().map_err(|_| invalid())?;
        Ok(Self::new(id, location))
    }
}

/// An asset: an identified object tree, optionally derived from an archetype.
#[derive(Debug, Clone)]
pub struct Asset {
    pub id: AssetId,
    pub tags: Vec<String>,
    /// Base asset this asset derives from.
    pub archetype: Option<AssetReference>,
    /// Root object of the asset content.
    pub root: ObjectRef,
}

impl Asset {
    pub fn new(id: AssetId, root: ObjectRef) -> Self {
        Self {
            id,
            tags: Vec::new(),
            archetype: None,
            root,
        }
    }

    pub fn type_name(&self) -> &str {
        self.root.type_name()
    }
}

/// An asset together with its location and the overrides read from or written to its file.
#[derive(Debug, Clone)]
pub struct AssetItem {
    pub location: String,
    pub asset: Asset,
    pub overrides: HashMap<AssetPath, OverrideType>,
}

impl AssetItem {
    pub fn new(location: impl Into<String>, asset: Asset) -> Self {
        Self {
            location: location.into(),
            asset,
            overrides: HashMap::new(),
        }
    }

    pub fn id(&self) -> AssetId {
        self.asset.id
    }

    /// Reference to this asset, as written in the archetype of derived assets.
    pub fn to_reference(&self) -> AssetReference {
        AssetReference::new(self.asset.id, self.location.clone())
    }

    /// Creates a new asset derived from this one.
    ///
    /// Missing item ids of this asset are generated first so the derived copy shares every
    /// item id with its base. The copy gets a new asset id and this asset as archetype.
    pub fn create_derived(
        &self,
        types: &dyn TypeDescriptorFactory,
        location: impl Into<String>,
    ) -> AssetItem {
        generate_missing_item_ids(types, &self.asset.root);
        let root = AssetCloner::new(ClonerFlags::empty()).clone_object(&self.asset.root);
        let asset = Asset {
            id: AssetId::new(),
            tags: self.asset.tags.clone(),
            archetype: Some(self.to_reference()),
            root,
        };
        let derived = AssetItem::new(location, asset);
        debug!(base = %self.asset.id, derived = %derived.asset.id, "Created derived asset");
        derived
    }
}
