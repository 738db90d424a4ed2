//! Item identity through edits and id generation.

use assetgraph::{
    assets::{Asset, AssetItem, AssetPropertyGraphContainer},
    identity::generate_missing_item_ids,
    reflection::{Index, ObjectRef, Value},
};

use crate::helpers::*;

#[test]
fn ids_survive_insertions_and_removals() {
    let mut container = AssetPropertyGraphContainer::new(test_types());
    let item = AssetItem::new(
        "MyAsset",
        Asset::new(guid(1), my_asset2(&["String1", "String2", "String3"])),
    );
    let asset = container.initialize_asset(&item).unwrap();
    let root = container.root_node(asset).unwrap();
    let strings = container.node_container().try_get_child(root, "MyStrings").unwrap();

    let change = container
        .add(strings, Value::from("String0"), &Index::from(0))
        .unwrap();
    assert_eq!(change.index, Index::Int(0));
    let appended = container
        .add(strings, Value::from("String4"), &Index::Empty)
        .unwrap();
    assert_eq!(appended.index, Index::Int(4));

    let ids = container.item_ids(strings).unwrap();
    assert_eq!(ids.key_count(), 5);
    assert_eq!(ids.get(1), Some(item_id(10)));
    assert_eq!(ids.get(2), Some(item_id(20)));
    assert_eq!(ids.get(3), Some(item_id(30)));
    let first = ids.get(0).unwrap();
    let last = ids.get(4).unwrap();

    container
        .remove(strings, &Value::from("String2"), &Index::from(2))
        .unwrap();
    container
        .update(strings, Value::from("Updated"), &Index::from(2))
        .unwrap();

    let ids = container.item_ids(strings).unwrap();
    assert_eq!(ids.key_count(), 4);
    assert_eq!(ids.get(0), Some(first));
    assert_eq!(ids.get(1), Some(item_id(10)));
    assert_eq!(ids.get(2), Some(item_id(30)));
    assert_eq!(ids.get(3), Some(last));
    // Removing from an asset without archetype leaves no tombstone.
    assert_eq!(ids.deleted_count(), 0);
    assert_eq!(
        strings_of(&container, strings),
        vec!["String0", "String1", "Updated", "String4"]
    );
}

#[test]
fn removing_inherited_items_leaves_tombstones() {
    let mut test = DeriveAssetTest::derive(my_asset2(&["String1", "String2", "String3"])).unwrap();
    let strings = test.derived_member("MyStrings");

    test.container
        .remove(strings, &Value::from("String1"), &Index::from(0))
        .unwrap();
    test.container
        .add(strings, Value::from("Local"), &Index::Empty)
        .unwrap();
    let local = test.ids(strings).get(2).unwrap();
    test.container
        .remove(strings, &Value::from("Local"), &Index::from(2))
        .unwrap();

    let ids = test.ids(strings);
    assert_eq!(ids.key_count(), 2);
    assert_eq!(ids.deleted_count(), 1);
    assert!(ids.is_deleted(&item_id(10)));
    assert!(!ids.is_deleted(&local));
}

#[test]
fn missing_ids_are_generated_for_identifiable_collections_only() {
    let types = test_types();
    let with_ids = ObjectRef::new_struct(
        "MyAsset4",
        [
            (
                "MyObjects",
                Value::from(ObjectRef::new_list(
                    "List<SomeObject>",
                    [some_object("a"), some_object("b")],
                )),
            ),
            ("MyObject", Value::Null),
        ],
    );
    assert_eq!(generate_missing_item_ids(&types, &with_ids), 2);
    assert_eq!(generate_missing_item_ids(&types, &with_ids), 0);
    let list = with_ids.field("MyObjects").unwrap();
    assert_eq!(list.as_object().unwrap().item_ids().key_count(), 2);

    let without_ids = my_asset8(&["a", "b"]);
    assert_eq!(generate_missing_item_ids(&types, &without_ids), 0);
    let list = without_ids.field("MyObjects").unwrap();
    assert!(!list.as_object().unwrap().has_item_ids());
}

fn strings_of(
    container: &AssetPropertyGraphContainer,
    node: assetgraph::quantum::NodeId,
) -> Vec<String> {
    strings(&container.retrieve(node, &Index::Empty).unwrap())
}
