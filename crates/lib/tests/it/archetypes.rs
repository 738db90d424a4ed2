//! Overrides and propagation between a base asset and the assets deriving from it.

use assetgraph::{
    assets::{Asset, AssetItem, AssetPath, AssetPropertyGraphContainer, OverrideType},
    reflection::{Index, ObjectRef, Value},
};

use crate::helpers::*;

fn my_asset9() -> ObjectRef {
    ObjectRef::new_struct(
        "MyAsset9",
        [
            ("Name", Value::from("BaseName")),
            ("Count", Value::from(1)),
            (
                "Numbers",
                Value::from(ObjectRef::new_dictionary(
                    "Dictionary<int,string>",
                    [(1, "One"), (2, "Two")],
                )),
            ),
        ],
    )
}

#[test]
fn member_follows_base_until_overridden() {
    let mut test = DeriveAssetTest::derive(my_asset1("String")).unwrap();
    let base = test.base_member("MyString");
    let derived = test.derived_member("MyString");
    assert_eq!(test.container.base_node(derived), Some(base));
    assert_eq!(test.value(derived), Value::from("String"));
    assert_eq!(test.container.get_content_override(derived), OverrideType::BASE);

    test.container
        .update(base, Value::from("Changed"), &Index::Empty)
        .unwrap();
    assert_eq!(test.value(derived), Value::from("Changed"));
    assert_eq!(test.container.get_content_override(derived), OverrideType::BASE);

    test.container
        .update(derived, Value::from("MyDerivedString"), &Index::Empty)
        .unwrap();
    assert_eq!(test.container.get_content_override(derived), OverrideType::NEW);
    // The base asset never records overrides.
    assert_eq!(test.container.get_content_override(base), OverrideType::BASE);

    test.container
        .update(base, Value::from("ChangedAgain"), &Index::Empty)
        .unwrap();
    assert_eq!(test.value(derived), Value::from("MyDerivedString"));

    test.container.reset_override(derived, &Index::Empty).unwrap();
    assert_eq!(test.value(derived), Value::from("ChangedAgain"));
    assert_eq!(test.container.get_content_override(derived), OverrideType::BASE);
}

#[test]
fn sealed_member_keeps_its_value() {
    let mut test = DeriveAssetTest::derive(my_asset1("String")).unwrap();
    let base = test.base_member("MyString");
    let derived = test.derived_member("MyString");

    test.container
        .set_content_override(derived, OverrideType::SEALED)
        .unwrap();
    test.container
        .update(base, Value::from("Changed"), &Index::Empty)
        .unwrap();
    assert_eq!(test.value(derived), Value::from("String"));

    test.container
        .set_content_override(derived, OverrideType::BASE)
        .unwrap();
    test.container.reconcile_with_base(test.derived.id()).unwrap();
    assert_eq!(test.value(derived), Value::from("Changed"));
}

#[test]
fn non_overridable_member_always_follows_base() {
    let mut test = DeriveAssetTest::derive(my_asset9()).unwrap();
    let base_name = test.base_member("Name");
    let derived_name = test.derived_member("Name");
    let derived_count = test.derived_member("Count");

    test.container
        .update(derived_name, Value::from("Mine"), &Index::Empty)
        .unwrap();
    assert_eq!(
        test.container.get_content_override(derived_name),
        OverrideType::BASE
    );
    test.container
        .update(derived_count, Value::from(5), &Index::Empty)
        .unwrap();
    assert_eq!(
        test.container.get_content_override(derived_count),
        OverrideType::NEW
    );

    test.container
        .update(base_name, Value::from("Renamed"), &Index::Empty)
        .unwrap();
    assert_eq!(test.value(derived_name), Value::from("Renamed"));
    assert_eq!(test.value(derived_count), Value::Int(5));
}

#[test]
fn int_keyed_dictionary_items_propagate() {
    let mut test = DeriveAssetTest::derive(my_asset9()).unwrap();
    let base = test.base_member("Numbers");
    let derived = test.derived_member("Numbers");
    assert_eq!(test.ids(base).get(1), test.ids(derived).get(1));

    test.container
        .update(derived, Value::from("Uno"), &Index::from(1))
        .unwrap();
    test.container
        .update(base, Value::from("Un"), &Index::from(1))
        .unwrap();
    test.container
        .update(base, Value::from("Deux"), &Index::from(2))
        .unwrap();
    test.container
        .add(base, Value::from("Trois"), &Index::from(3))
        .unwrap();

    assert_eq!(
        test.container.retrieve(derived, &Index::from(1)).unwrap(),
        Value::from("Uno")
    );
    assert_eq!(
        test.container.retrieve(derived, &Index::from(2)).unwrap(),
        Value::from("Deux")
    );
    assert_eq!(
        test.container.retrieve(derived, &Index::from(3)).unwrap(),
        Value::from("Trois")
    );
    assert_eq!(test.ids(base).get(3), test.ids(derived).get(3));
}

#[test]
fn list_item_overrides() {
    let mut test = DeriveAssetTest::derive(my_asset2(&["String1", "String2", "String3"])).unwrap();
    let base = test.base_member("MyStrings");
    let derived = test.derived_member("MyStrings");
    assert_eq!(test.ids(derived).get(1), Some(item_id(20)));

    test.container
        .update(derived, Value::from("MyDerivedString"), &Index::from(1))
        .unwrap();
    assert_eq!(
        test.container.get_item_override(derived, &Index::from(1)),
        OverrideType::NEW
    );
    assert_eq!(
        test.container.get_item_override(derived, &Index::from(0)),
        OverrideType::BASE
    );
    assert_eq!(
        test.container.overridden_items(derived),
        vec![(item_id(20), OverrideType::NEW)]
    );

    test.container
        .update(base, Value::from("Base1"), &Index::from(0))
        .unwrap();
    test.container
        .update(base, Value::from("Base2"), &Index::from(1))
        .unwrap();
    assert_eq!(
        strings(&test.value(derived)),
        vec!["Base1", "MyDerivedString", "String3"]
    );

    test.container
        .reset_override(derived, &Index::from(1))
        .unwrap();
    assert_eq!(strings(&test.value(derived)), vec!["Base1", "Base2", "String3"]);
    assert!(test.container.overridden_items(derived).is_empty());
}

#[test]
fn base_removal_keeps_overridden_items() {
    let mut test = DeriveAssetTest::derive(my_asset2(&["String1", "String2", "String3"])).unwrap();
    let base = test.base_member("MyStrings");
    let derived = test.derived_member("MyStrings");

    test.container
        .update(derived, Value::from("Mine"), &Index::from(2))
        .unwrap();
    test.container
        .remove(base, &Value::from("String1"), &Index::from(0))
        .unwrap();
    assert_eq!(strings(&test.value(derived)), vec!["String2", "Mine"]);
    assert_eq!(test.ids(derived).get(0), Some(item_id(20)));

    test.container
        .remove(base, &Value::from("String3"), &Index::from(1))
        .unwrap();
    assert_eq!(strings(&test.value(base)), vec!["String2"]);
    assert_eq!(strings(&test.value(derived)), vec!["String2", "Mine"]);
    assert_eq!(test.ids(derived).get(1), Some(item_id(30)));
    assert_eq!(test.ids(derived).deleted_count(), 0);
}

#[test]
fn item_removed_on_both_sides_leaves_no_tombstone() {
    let strings_in = ["String1", "String2", "String3", "String4"];
    let mut test = DeriveAssetTest::derive(my_asset2(&strings_in)).unwrap();
    let base = test.base_member("MyStrings");
    let derived = test.derived_member("MyStrings");

    test.container
        .remove(derived, &Value::from("String3"), &Index::from(2))
        .unwrap();
    assert_eq!(test.ids(derived).deleted_count(), 1);
    test.container
        .remove(base, &Value::from("String3"), &Index::from(2))
        .unwrap();

    let expected = vec!["String1", "String2", "String4"];
    assert_eq!(strings(&test.value(base)), expected);
    assert_eq!(strings(&test.value(derived)), expected);
    for (i, id) in [item_id(10), item_id(20), item_id(40)].into_iter().enumerate() {
        assert_eq!(test.ids(base).get(i), Some(id));
        assert_eq!(test.ids(derived).get(i), Some(id));
    }
    assert_eq!(test.ids(base).deleted_count(), 0);
    assert_eq!(test.ids(derived).deleted_count(), 0);
}

#[test]
fn item_deleted_in_derived_ignores_base_updates() {
    let strings_in = ["String1", "String2", "String3", "String4"];
    let mut test = DeriveAssetTest::derive(my_asset2(&strings_in)).unwrap();
    let base = test.base_member("MyStrings");
    let derived = test.derived_member("MyStrings");

    test.container
        .remove(derived, &Value::from("String3"), &Index::from(2))
        .unwrap();
    test.container
        .update(base, Value::from("String3.1"), &Index::from(2))
        .unwrap();

    assert_eq!(
        strings(&test.value(base)),
        vec!["String1", "String2", "String3.1", "String4"]
    );
    assert_eq!(
        strings(&test.value(derived)),
        vec!["String1", "String2", "String4"]
    );
    assert_eq!(test.ids(derived).deleted_count(), 1);
    assert!(test.ids(derived).is_deleted(&item_id(30)));
    assert_eq!(test.ids(base).get(3), test.ids(derived).get(2));
    assert_eq!(test.ids(derived).get(2), Some(item_id(40)));
}

#[test]
fn key_collision_keeps_the_derived_item() {
    let mut test =
        DeriveAssetTest::derive(my_asset3(&[("Key1", "String1"), ("Key2", "String2")])).unwrap();
    let base = test.base_member("MyDictionary");
    let derived = test.derived_member("MyDictionary");
    let key3 = Index::from("Key3");

    test.container
        .add(derived, Value::from("String3"), &key3)
        .unwrap();
    assert_eq!(
        test.container.get_item_override(derived, &key3),
        OverrideType::NEW
    );
    test.container
        .add(base, Value::from("String4"), &key3)
        .unwrap();

    assert_eq!(test.ids(base).key_count(), 3);
    assert_eq!(test.ids(derived).key_count(), 3);
    assert_eq!(
        test.container.retrieve(derived, &key3).unwrap(),
        Value::from("String3")
    );
    assert_eq!(
        test.container.get_item_override(derived, &key3),
        OverrideType::NEW
    );
    assert_eq!(test.ids(derived).deleted_count(), 1);
    let base_id = test.ids(base).get(&key3).unwrap();
    assert_ne!(Some(base_id), test.ids(derived).get(&key3));
    assert!(test.ids(derived).is_deleted(&base_id));

    // A later reconciliation does not bring the base item back.
    test.container.reconcile_with_base(test.derived.id()).unwrap();
    assert_eq!(
        test.container.retrieve(derived, &key3).unwrap(),
        Value::from("String3")
    );
    assert_eq!(test.ids(derived).deleted_count(), 1);
}

#[test]
fn items_added_on_both_sides_keep_their_order() {
    let strings_in = ["String1", "String2", "String3", "String4"];
    let mut test = DeriveAssetTest::derive(my_asset2(&strings_in)).unwrap();
    let base = test.base_member("MyStrings");
    let derived = test.derived_member("MyStrings");

    test.container
        .add(derived, Value::from("String3.5"), &Index::from(3))
        .unwrap();
    test.container
        .add(derived, Value::from("String1.5"), &Index::from(1))
        .unwrap();
    for (value, position) in [
        ("String1.1", 1),
        ("String2.1", 3),
        ("String3.1", 5),
        ("String4.1", 7),
        ("String0.1", 0),
    ] {
        test.container
            .add(base, Value::from(value), &Index::from(position))
            .unwrap();
    }

    assert_eq!(
        strings(&test.value(base)),
        vec![
            "String0.1",
            "String1",
            "String1.1",
            "String2",
            "String2.1",
            "String3",
            "String3.1",
            "String4",
            "String4.1",
        ]
    );
    assert_eq!(
        strings(&test.value(derived)),
        vec![
            "String0.1",
            "String1",
            "String1.1",
            "String1.5",
            "String2",
            "String2.1",
            "String3",
            "String3.1",
            "String3.5",
            "String4",
            "String4.1",
        ]
    );

    let base_ids = test.ids(base);
    let derived_ids = test.ids(derived);
    for (_, id) in base_ids.iter() {
        assert!(derived_ids.contains_id(&id));
    }
    for position in [3usize, 8] {
        assert_eq!(
            test.container
                .get_item_override(derived, &Index::from(position)),
            OverrideType::NEW
        );
    }
    assert_eq!(test.container.overridden_items(derived).len(), 2);
}

#[test]
fn renamed_key_still_follows_base_value() {
    let mut test =
        DeriveAssetTest::derive(my_asset3(&[("Key1", "String1"), ("Key2", "String2")])).unwrap();
    let base = test.base_member("MyDictionary");
    let derived = test.derived_member("MyDictionary");
    let renamed = Index::from("Key1b");

    test.container
        .rename_key(derived, &Index::from("Key1"), renamed.clone())
        .unwrap();
    assert_eq!(test.ids(derived).get(&renamed), Some(item_id(10)));
    assert_eq!(
        test.container.get_key_override(derived, &renamed),
        OverrideType::NEW
    );
    assert_eq!(
        test.container.get_item_override(derived, &renamed),
        OverrideType::BASE
    );

    test.container
        .update(base, Value::from("Changed"), &Index::from("Key1"))
        .unwrap();
    assert_eq!(
        test.container.retrieve(derived, &renamed).unwrap(),
        Value::from("Changed")
    );
    assert!(!test.ids(derived).contains_key("Key1"));

    test.container.reset_override(derived, &renamed).unwrap();
    assert!(!test.ids(derived).contains_key(&renamed));
    assert_eq!(test.ids(derived).get("Key1"), Some(item_id(10)));
    assert_eq!(
        test.container.retrieve(derived, &Index::from("Key1")).unwrap(),
        Value::from("Changed")
    );
}

#[test]
fn object_members_are_linked_and_reconciled() {
    let mut test =
        DeriveAssetTest::derive(my_asset4(&["String1", "String2"], "String3")).unwrap();
    let base_objects = test.base_member("MyObjects");
    let derived_objects = test.derived_member("MyObjects");
    let base_object = test.base_member("MyObject");
    let derived_object = test.derived_member("MyObject");

    assert_eq!(
        test.container.base_node(test.target(derived_object)),
        Some(test.target(base_object))
    );
    for i in 0..2 {
        assert_eq!(
            test.container
                .base_node(test.item_target(derived_objects, i)),
            Some(test.item_target(base_objects, i))
        );
    }

    let derived_value = test.member(test.item_target(derived_objects, 1), "Value");
    test.container
        .update(derived_value, Value::from("MyDerivedString"), &Index::Empty)
        .unwrap();
    assert_eq!(
        test.container.get_content_override(derived_value),
        OverrideType::NEW
    );

    for (i, value) in [(0, "Base1"), (1, "Base2")] {
        let base_value = test.member(test.item_target(base_objects, i), "Value");
        test.container
            .update(base_value, Value::from(value), &Index::Empty)
            .unwrap();
    }
    let first = test.member(test.item_target(derived_objects, 0), "Value");
    assert_eq!(test.value(first), Value::from("Base1"));
    assert_eq!(test.value(derived_value), Value::from("MyDerivedString"));

    // Replacing the base object brings its values to the derived object.
    test.container
        .update(base_object, Value::from(some_object("Replaced")), &Index::Empty)
        .unwrap();
    let derived_inner = test.member(test.target(derived_object), "Value");
    assert_eq!(test.value(derived_inner), Value::from("Replaced"));
    assert_eq!(
        test.container.base_node(test.target(derived_object)),
        Some(test.target(base_object))
    );
}

#[test]
fn overrides_are_collected_relative_to_a_node() {
    let mut test =
        DeriveAssetTest::derive(my_asset4(&["String1", "String2"], "String3")).unwrap();
    let derived_objects = test.derived_member("MyObjects");
    let derived_object = test.derived_member("MyObject");

    let inner = test.member(test.target(derived_object), "Value");
    test.container
        .update(inner, Value::from("Mine"), &Index::Empty)
        .unwrap();
    let item_value = test.member(test.item_target(derived_objects, 1), "Value");
    test.container
        .update(item_value, Value::from("MineToo"), &Index::Empty)
        .unwrap();

    let value_path = AssetPath::new().with_member("Value");
    let from_member = test
        .container
        .generate_overrides_for_serialization(derived_object)
        .unwrap();
    let from_object = test
        .container
        .generate_overrides_for_serialization(test.target(derived_object))
        .unwrap();
    assert_eq!(from_member, from_object);
    assert_eq!(from_member.len(), 1);
    assert_eq!(from_member.get(&value_path), Some(&OverrideType::NEW));

    let from_item = test
        .container
        .generate_overrides_for_serialization(test.item_target(derived_objects, 1))
        .unwrap();
    assert_eq!(from_item.len(), 1);
    assert_eq!(from_item.get(&value_path), Some(&OverrideType::NEW));

    let from_root = test
        .container
        .generate_overrides_for_serialization(test.derived_root())
        .unwrap();
    assert_eq!(from_root.len(), 2);
    let object_path = AssetPath::new()
        .with_member("MyObject")
        .with_member("Value");
    let item_path = AssetPath::new()
        .with_member("MyObjects")
        .with_item_id(item_id(20))
        .with_member("Value");
    assert_eq!(from_root.get(&object_path), Some(&OverrideType::NEW));
    assert_eq!(from_root.get(&item_path), Some(&OverrideType::NEW));
}

#[test]
fn items_without_ids_link_through_custom_links() {
    let mut test = DeriveAssetTest::derive(my_asset8(&["String1", "String2"])).unwrap();
    let base_objects = test.base_member("MyObjects");
    let derived_objects = test.derived_member("MyObjects");
    let first = test.item_target(derived_objects, 0);
    assert_eq!(test.container.base_node(first), None);

    for i in 0..2 {
        let derived_item = test.item_target(derived_objects, i);
        let base_item = test.item_target(base_objects, i);
        test.container
            .register_custom_link(derived_item, base_item)
            .unwrap();
    }
    test.container.refresh_base(test.derived.id()).unwrap();
    assert_eq!(
        test.container.base_node(first),
        Some(test.item_target(base_objects, 0))
    );

    let first_value = test.member(first, "Value");
    test.container
        .update(first_value, Value::from("MyDerivedString"), &Index::Empty)
        .unwrap();
    assert_eq!(
        test.container.get_content_override(first_value),
        OverrideType::NEW
    );

    let base_second = test.member(test.item_target(base_objects, 1), "Value");
    test.container
        .update(base_second, Value::from("Changed"), &Index::Empty)
        .unwrap();
    let second_value = test.member(test.item_target(derived_objects, 1), "Value");
    assert_eq!(test.value(second_value), Value::from("Changed"));
    assert_eq!(test.value(first_value), Value::from("MyDerivedString"));
}

#[test]
fn changes_flow_through_every_level() {
    let mut test = DeriveAssetTest::derive(my_asset1("String")).unwrap();
    let types = test_types();
    let mut second = test.derived.create_derived(&types, "MySecondDerivedAsset");
    second.asset.id = guid(3);
    let second_id = test.container.initialize_asset(&second).unwrap();
    let second_root = test.container.root_node(second_id).unwrap();
    let second_member = test.member(second_root, "MyString");
    assert_eq!(
        test.container.base_node(second_member),
        Some(test.derived_member("MyString"))
    );

    let base = test.base_member("MyString");
    test.container
        .update(base, Value::from("Changed"), &Index::Empty)
        .unwrap();
    assert_eq!(test.value(second_member), Value::from("Changed"));

    let derived = test.derived_member("MyString");
    test.container
        .update(derived, Value::from("Middle"), &Index::Empty)
        .unwrap();
    assert_eq!(test.value(second_member), Value::from("Middle"));
    assert_eq!(
        test.container.get_content_override(second_member),
        OverrideType::BASE
    );
}

#[test]
fn loading_reconciles_a_stale_derived_copy() {
    let base_root = my_asset2(&["String1", "String2", "String3"]);
    let base = AssetItem::new("MyAsset", Asset::new(guid(1), base_root));
    let types = test_types();
    let mut derived = base.create_derived(&types, "MyDerivedAsset");
    derived.asset.id = guid(2);

    // The base changed after the derived copy was written.
    let list = base.asset.root.field("MyStrings").unwrap();
    let list = list.as_object().unwrap();
    list.set_item(&Index::from(0), Value::from("Fresh")).unwrap();

    let test = DeriveAssetTest::load(base, derived).unwrap();
    let derived = test.derived_member("MyStrings");
    assert_eq!(
        strings(&test.value(derived)),
        vec!["Fresh", "String2", "String3"]
    );
}

#[test]
fn operations_without_a_base_fail() {
    let mut container = AssetPropertyGraphContainer::new(test_types());
    let item = AssetItem::new("MyAsset", Asset::new(guid(1), my_asset1("String")));
    let asset = container.initialize_asset(&item).unwrap();
    let root = container.root_node(asset).unwrap();
    let member = container.node_container().try_get_child(root, "MyString").unwrap();

    let err = container.reset_override(member, &Index::Empty).unwrap_err();
    assert_eq!(err.module(), "assets");

    let types = test_types();
    let orphan = AssetItem::new("Other", Asset::new(guid(7), my_asset1("x")))
        .create_derived(&types, "Orphan");
    let err = container.initialize_asset(&orphan).unwrap_err();
    assert!(err.is_not_found());
}
