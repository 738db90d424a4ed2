//! Deep copies of asset content and creation of derived assets.

use assetgraph::{
    assets::{Asset, AssetCloner, AssetItem, ClonerFlags},
    reflection::{Index, Value},
};

use crate::helpers::*;

#[test]
fn derived_assets_share_item_ids_with_their_base() {
    let types = test_types();
    let mut base = AssetItem::new(
        "Folder/MyAsset",
        Asset::new(guid(1), my_asset4(&["String1", "String2"], "String3")),
    );
    base.asset.tags = vec!["tag".to_string()];

    let derived = base.create_derived(&types, "Folder/MyDerivedAsset");
    assert_ne!(derived.id(), base.id());
    assert_eq!(derived.location, "Folder/MyDerivedAsset");
    assert_eq!(derived.asset.archetype, Some(base.to_reference()));
    assert_eq!(
        derived.asset.archetype.as_ref().unwrap().to_string(),
        "00000001-0001-0000-0100-000001000000:Folder/MyAsset"
    );
    assert_eq!(derived.asset.tags, base.asset.tags);
    assert!(derived.overrides.is_empty());
    assert!(!derived.asset.root.ptr_eq(&base.asset.root));

    let base_list = base.asset.root.field("MyObjects").unwrap();
    let derived_list = derived.asset.root.field("MyObjects").unwrap();
    let base_list = base_list.as_object().unwrap();
    let derived_list = derived_list.as_object().unwrap();
    assert_eq!(derived_list.item_ids().get(0), Some(item_id(10)));
    assert_eq!(derived_list.item_ids().get(1), Some(item_id(20)));
    assert_ne!(
        derived_list.item(&Index::from(0)),
        base_list.item(&Index::from(0))
    );
}

#[test]
fn base_ids_are_generated_before_deriving() {
    let types = test_types();
    let root = my_asset4(&[], "String");
    let list = root.field("MyObjects").unwrap();
    let list = list.as_object().unwrap();
    list.set_item_ids(None);
    list.insert_item(&Index::Empty, Value::from(some_object("a")))
        .unwrap();
    let base = AssetItem::new("MyAsset", Asset::new(guid(1), root.clone()));

    let derived = base.create_derived(&types, "MyDerivedAsset");
    let base_id = list.item_ids().get(0);
    assert!(base_id.is_some());
    let derived_list = derived.asset.root.field("MyObjects").unwrap();
    assert_eq!(derived_list.as_object().unwrap().item_ids().get(0), base_id);
}

#[test]
fn tombstones_are_copied_with_their_collection() {
    let list = string_list(&["String1", "String2"]);
    list.with_item_ids(|ids| ids.mark_as_deleted(item_id(30)));

    let copy = AssetCloner::deep_clone(&Value::from(list.clone()), ClonerFlags::empty());
    let ids = copy.as_object().unwrap().item_ids();
    assert!(ids.is_deleted(&item_id(30)));
    assert_eq!(ids.key_count(), 2);

    let fresh = AssetCloner::new(ClonerFlags::GENERATE_NEW_IDS).clone_object(&list);
    let fresh = fresh.item_ids();
    assert_eq!(fresh.key_count(), 2);
    assert_eq!(fresh.deleted_count(), 0);
    assert!(!fresh.contains_id(&item_id(10)));
}

#[test]
fn derived_copies_load_without_overrides() {
    let mut test = DeriveAssetTest::derive(my_asset2(&["String1", "String2"])).unwrap();
    let derived = test.derived_member("MyStrings");
    assert_eq!(strings(&test.value(derived)), vec!["String1", "String2"]);
    assert!(test.container.overridden_items(derived).is_empty());

    test.container.prepare_for_save(&mut test.derived).unwrap();
    assert!(test.derived.overrides.is_empty());
    assert_eq!(
        test.derived.asset.archetype.as_ref().map(|a| a.id),
        Some(guid(1))
    );
}
