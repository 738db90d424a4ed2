//! Content graph: references, value types, failures and the graph linker.

use std::collections::HashMap;
use std::sync::Arc;

use assetgraph::{
    Error,
    assets::{AssetCloner, ClonerFlags},
    quantum::{
        ContentChangeType, GraphNodeLinker, GraphNodePath, LinkResolver, NodeBuilder,
        NodeContainer, NodeId, QuantumError,
    },
    reflection::{Index, MemberDescriptor, ObjectRef, TypeDescriptor, TypeRegistry, Value},
};

fn graph_types() -> TypeRegistry {
    TypeRegistry::new()
        .with(TypeDescriptor::class(
            "Node",
            vec![
                MemberDescriptor::new("Name", "string"),
                MemberDescriptor::new("Next", "Node"),
                MemberDescriptor::new("Children", "NodeList"),
            ],
        ))
        .with(TypeDescriptor::list("NodeList", "Node"))
        .with(TypeDescriptor::structure(
            "Point",
            vec![MemberDescriptor::new("X", "int")],
        ))
        .with(TypeDescriptor::class(
            "Holder",
            vec![MemberDescriptor::new("Position", "Point")],
        ))
        .with(TypeDescriptor::dictionary("NodeMap", "Node", "string"))
        .with(TypeDescriptor::collection_without_indexer("NodeBag", "Node"))
        .with(TypeDescriptor::class(
            "MapHolder",
            vec![MemberDescriptor::new("Map", "NodeMap")],
        ))
        .with(TypeDescriptor::class(
            "BagHolder",
            vec![MemberDescriptor::new("Bag", "NodeBag")],
        ))
        .with(TypeDescriptor::dictionary("FlagMap", "bool", "string"))
        .with(TypeDescriptor::class(
            "FlagHolder",
            vec![MemberDescriptor::new("Flags", "FlagMap")],
        ))
}

fn graph_container() -> NodeContainer {
    NodeContainer::new(Arc::new(graph_types()))
}

fn named(name: &str) -> ObjectRef {
    ObjectRef::new_struct("Node", [("Name", Value::from(name))])
}

fn child(container: &NodeContainer, node: NodeId, name: &str) -> NodeId {
    container.try_get_child(node, name).unwrap()
}

#[test]
fn circular_references_share_nodes() {
    let container = graph_container();
    let a = named("a");
    let b = named("b");
    a.set_field("Next", Value::from(b.clone())).unwrap();
    b.set_field("Next", Value::from(a.clone())).unwrap();

    let a_node = container.get_or_create_node(&a).unwrap();
    let b_node = container.get_node(&b).unwrap();

    let a_next = child(&container, a_node, "Next");
    let b_next = child(&container, b_node, "Next");
    assert_eq!(container.node(a_next).unwrap().target(), Some(b_node));
    assert_eq!(container.node(b_next).unwrap().target(), Some(a_node));
    assert_eq!(container.get_or_create_node(&b).unwrap(), b_node);

    let reference = container.node(a_next).unwrap();
    let reference = reference.target_reference().unwrap();
    assert_eq!(
        reference.target_guid(),
        Some(container.node(b_node).unwrap().guid())
    );
}

#[test]
fn self_reference_targets_its_own_node() {
    let container = graph_container();
    let a = named("a");
    a.set_field("Next", Value::from(a.clone())).unwrap();

    let a_node = container.get_or_create_node(&a).unwrap();
    let next = child(&container, a_node, "Next");
    assert_eq!(container.node(next).unwrap().target(), Some(a_node));
}

#[test]
fn shared_items_resolve_to_one_node() {
    let container = graph_container();
    let shared = named("shared");
    let root = named("root");
    root.set_field(
        "Children",
        Value::from(ObjectRef::new_list("NodeList", [shared.clone(), shared.clone()])),
    )
    .unwrap();

    let root_node = container.get_or_create_node(&root).unwrap();
    let children = container.node(child(&container, root_node, "Children")).unwrap();
    let shared_node = container.get_node(&shared);
    assert!(shared_node.is_some());
    assert_eq!(children.item_target(&Index::from(0)), shared_node);
    assert_eq!(children.item_target(&Index::from(1)), shared_node);
}

#[test]
fn updating_a_reference_retargets_the_member() {
    let container = graph_container();
    let root = named("root");
    let old = named("old");
    root.set_field("Next", Value::from(old.clone())).unwrap();
    let root_node = container.get_or_create_node(&root).unwrap();
    let next = child(&container, root_node, "Next");
    let old_node = container.node(next).unwrap().target().unwrap();

    let new = named("new");
    let change = container
        .update(next, Value::from(new.clone()), &Index::Empty)
        .unwrap();
    assert_eq!(change.change_type, ContentChangeType::ValueChange);
    assert_eq!(change.old_value, Value::from(old));

    let new_node = container.node(next).unwrap().target().unwrap();
    assert_ne!(new_node, old_node);
    assert_eq!(container.get_node(&new), Some(new_node));
}

#[test]
fn collection_items_keep_their_references_across_edits() {
    let container = graph_container();
    let (first, second) = (named("first"), named("second"));
    let root = named("root");
    root.set_field(
        "Children",
        Value::from(ObjectRef::new_list("NodeList", [first.clone(), second.clone()])),
    )
    .unwrap();
    let root_node = container.get_or_create_node(&root).unwrap();
    let children = child(&container, root_node, "Children");
    let second_node = container.get_node(&second).unwrap();

    let inserted = named("inserted");
    let change = container
        .add(children, Value::from(inserted.clone()), &Index::from(0))
        .unwrap();
    assert_eq!(change.change_type, ContentChangeType::CollectionAdd);

    let node = container.node(children).unwrap();
    assert_eq!(node.item_target(&Index::from(0)), container.get_node(&inserted));
    assert_eq!(node.item_target(&Index::from(2)), Some(second_node));

    let change = container
        .remove(children, &Value::from(inserted), &Index::from(0))
        .unwrap();
    assert_eq!(change.change_type, ContentChangeType::CollectionRemove);
    let node = container.node(children).unwrap();
    assert_eq!(node.item_target(&Index::from(1)), Some(second_node));
    assert_eq!(node.item_references().unwrap().len(), 2);
}

#[test]
fn structures_are_boxed_and_write_through() {
    let container = graph_container();
    let point = ObjectRef::new_struct("Point", [("X", Value::from(1))]);
    let holder = ObjectRef::new_struct("Holder", [("Position", Value::from(point.clone()))]);

    let holder_node = container.get_or_create_node(&holder).unwrap();
    let position = child(&container, holder_node, "Position");
    let boxed = container.node(position).unwrap().target().unwrap();
    let boxed_node = container.node(boxed).unwrap();
    assert!(boxed_node.is_boxed());
    assert_eq!(boxed_node.owner(), Some(&(position, Index::Empty)));
    assert_eq!(container.get_node(&point), None);

    let x = child(&container, boxed, "X");
    container.update(x, Value::from(5), &Index::Empty).unwrap();
    assert_eq!(point.field("X"), Some(Value::Int(5)));
}

#[test]
fn unsupported_shapes_fail_to_build() {
    let container = graph_container();
    let map = ObjectRef::new_dictionary("NodeMap", Vec::<(Index, Value)>::new());
    let holder = ObjectRef::new_struct("MapHolder", [("Map", Value::from(map))]);
    let err = container.get_or_create_node(&holder).unwrap_err();
    assert!(err.is_unsupported());

    let bag = ObjectRef::new_list("NodeBag", Vec::<Value>::new());
    let holder = ObjectRef::new_struct("BagHolder", [("Bag", Value::from(bag))]);
    let err = container.get_or_create_node(&holder).unwrap_err();
    assert!(err.is_unsupported());
    assert_eq!(err.module(), "quantum");

    let flags = ObjectRef::new_dictionary("FlagMap", Vec::<(Index, Value)>::new());
    let holder = ObjectRef::new_struct("FlagHolder", [("Flags", Value::from(flags))]);
    let err = container.get_or_create_node(&holder).unwrap_err();
    assert!(err.is_unsupported());
}

#[test]
fn only_integers_and_strings_are_keys() {
    assert_eq!(Index::from_value(&Value::Int(3)), Some(Index::Int(3)));
    assert_eq!(Index::from_value(&Value::from("a")), Some(Index::from("a")));
    assert_eq!(Index::from_value(&Value::Bool(true)), None);
    assert_eq!(Index::from_value(&Value::Float(1.5)), None);
}

fn point(x: i64) -> ObjectRef {
    ObjectRef::new_struct("Point", [("X", Value::from(x))])
}

#[test]
fn replaced_structures_are_freed() {
    let container = graph_container();
    let holder = ObjectRef::new_struct("Holder", [("Position", Value::from(point(0)))]);
    let holder_node = container.get_or_create_node(&holder).unwrap();
    let position = child(&container, holder_node, "Position");
    let first = container.node(position).unwrap().target().unwrap();
    // Holder, its member, the boxed point and its member.
    assert_eq!(container.node_count(), 4);

    for x in 1..20 {
        container
            .update(position, Value::from(point(x)), &Index::Empty)
            .unwrap();
        assert_eq!(container.node_count(), 4);
    }
    assert!(!container.contains(first));
    assert!(container.node(first).is_err());

    let boxed = container.node(position).unwrap().target().unwrap();
    let x = child(&container, boxed, "X");
    assert_eq!(container.retrieve(x, &Index::Empty).unwrap(), Value::Int(19));
    container.update(x, Value::from(20), &Index::Empty).unwrap();
    assert_eq!(container.node(position).unwrap().target(), Some(boxed));
    assert_eq!(container.node_count(), 4);

    container
        .update(position, Value::Null, &Index::Empty)
        .unwrap();
    assert_eq!(container.node_count(), 2);
}

#[test]
fn purge_frees_nodes_out_of_reach() {
    let container = graph_container();
    let root = named("root");
    root.set_field("Next", Value::from(named("other"))).unwrap();
    let root_node = container.get_or_create_node(&root).unwrap();
    let next = child(&container, root_node, "Next");
    let other_node = container.node(next).unwrap().target().unwrap();
    assert_eq!(container.node_count(), 8);

    container.update(next, Value::Null, &Index::Empty).unwrap();
    assert!(container.contains(other_node));
    assert_eq!(container.purge(&[root_node]), 4);
    assert_eq!(container.node_count(), 4);
    assert!(!container.contains(other_node));
    assert_eq!(container.purge(&[root_node]), 0);

    // The freed slots are reused without confusing old handles.
    let again = named("again");
    container
        .update(next, Value::from(again.clone()), &Index::Empty)
        .unwrap();
    let again_node = container.node(next).unwrap().target().unwrap();
    assert_ne!(again_node, other_node);
    assert_eq!(container.get_node(&again), Some(again_node));
    assert_eq!(container.node_count(), 8);
}

#[test]
fn inconsistent_operations_report_the_node() {
    let container = graph_container();
    let root = named("root");
    let root_node = container.get_or_create_node(&root).unwrap();
    let name = child(&container, root_node, "Name");

    let err = container.collection(name).unwrap_err();
    assert!(err.is_consistency_error());
    match err {
        Error::Quantum(err) => assert_eq!(err.node(), Some(name)),
        other => panic!("unexpected error {other:?}"),
    }

    let err = container
        .update(root_node, Value::Null, &Index::Empty)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Quantum(QuantumError::InvalidArgument { .. })
    ));

    root.set_field("Children", Value::from(ObjectRef::new_list("NodeList", [named("a")])))
        .unwrap();
    container.update_references(root_node).unwrap();
    let children = child(&container, root_node, "Children");
    let err = container
        .remove(children, &Value::from(named("other")), &Index::from(0))
        .unwrap_err();
    assert!(err.is_consistency_error());
}

#[test]
fn registered_primitive_types_carry_no_reference() {
    let mut builder = NodeBuilder::new(Arc::new(graph_types()));
    builder.register_primitive_type("Node");
    assert!(builder.unregister_primitive_type("string").is_err());
    let container = NodeContainer::with_builder(builder);

    let root = named("root");
    root.set_field("Next", Value::from(named("next"))).unwrap();
    let root_node = container.get_or_create_node(&root).unwrap();
    let next = container.node(child(&container, root_node, "Next")).unwrap();
    assert!(next.is_primitive());
    assert!(next.reference().is_none());
}

#[test]
fn paths_address_corresponding_nodes_of_a_copy() {
    let container = graph_container();
    let root = named("root");
    root.set_field("Next", Value::from(named("next"))).unwrap();
    root.set_field(
        "Children",
        Value::from(ObjectRef::new_list("NodeList", [named("child")])),
    )
    .unwrap();
    let copy = AssetCloner::new(ClonerFlags::empty()).clone_object(&root);

    let root_node = container.get_or_create_node(&root).unwrap();
    let copy_node = container.get_or_create_node(&copy).unwrap();

    let path = GraphNodePath::new(root_node)
        .push_member("Children")
        .push_index(0)
        .push_member("Name");
    let original = path.get_node(&container).unwrap();
    let copied = path.clone_with_root(copy_node).get_node(&container).unwrap();
    assert_ne!(original, copied);
    assert_eq!(
        container.retrieve(copied, &Index::Empty).unwrap(),
        Value::from("child")
    );
}

#[derive(Default)]
struct RecordingResolver {
    links: HashMap<NodeId, Option<NodeId>>,
}

impl LinkResolver for RecordingResolver {
    fn link_nodes(&mut self, source: NodeId, target: Option<NodeId>) {
        self.links.insert(source, target);
    }
}

#[test]
fn linker_pairs_nodes_of_cyclic_graphs() {
    let container = graph_container();
    let a = named("a");
    let b = named("b");
    a.set_field("Next", Value::from(b.clone())).unwrap();
    b.set_field("Next", Value::from(a.clone())).unwrap();
    a.set_field(
        "Children",
        Value::from(ObjectRef::new_list("NodeList", [named("c")])),
    )
    .unwrap();
    let copy = AssetCloner::new(ClonerFlags::empty()).clone_object(&a);
    let copy_b = copy.field("Next").unwrap();
    let copy_b = copy_b.as_object().unwrap();

    let source = container.get_or_create_node(&a).unwrap();
    let target = container.get_or_create_node(&copy).unwrap();
    let mut linker = GraphNodeLinker::new(RecordingResolver::default());
    linker.link_graph(&container, source, Some(target)).unwrap();
    let links = linker.into_resolver().links;

    assert_eq!(links.get(&source), Some(&Some(target)));
    let b_node = container.get_node(&b).unwrap();
    assert_eq!(links.get(&b_node), Some(&container.get_node(copy_b)));
    assert_eq!(
        links.get(&child(&container, b_node, "Name")),
        Some(&Some(child(&container, container.get_node(copy_b).unwrap(), "Name")))
    );

    let children = container.node(child(&container, source, "Children")).unwrap();
    let copy_children = container.node(child(&container, target, "Children")).unwrap();
    let c_node = children.item_target(&Index::from(0)).unwrap();
    assert_eq!(
        links.get(&c_node),
        Some(&copy_children.item_target(&Index::from(0)))
    );
}
