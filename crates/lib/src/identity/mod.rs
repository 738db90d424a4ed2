//! Stable identity for collection items.
//!
//! Every item of an identifiable list or dictionary is assigned an [`ItemId`] that survives
//! reordering, insertion before it and re-keying. The ids of a collection are kept in a
//! [`CollectionItemIdentifiers`] table attached next to the collection (see
//! [`ObjectRef::with_item_ids`](crate::reflection::ObjectRef::with_item_ids)), together with
//! the ids of items that were deliberately removed.

pub mod errors;
pub mod generator;
pub mod identifiers;
pub mod item_id;

pub use errors::IdentityError;
pub use generator::generate_missing_item_ids;
pub use identifiers::CollectionItemIdentifiers;
pub use item_id::ItemId;
