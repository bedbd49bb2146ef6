//! Property tests over generated schemas and records.

use axl_shape::{
    resolve_tags, DataTree, DataValue, ElementDef, EmptySentinels, Extractor, Scalar, SchemaNode,
    SchemaTree, TagSelection,
};
use proptest::prelude::*;

/// Random element definitions whose `required` flags come from `required`.
/// Sibling names are unique (`f0`, `f1`, ...).
fn element(required: BoxedStrategy<bool>) -> impl Strategy<Value = ElementDef> {
    let leaf = required.clone().prop_map(|r| ElementDef {
        required: r,
        ..ElementDef::leaf("")
    });
    leaf.prop_recursive(3, 24, 4, move |inner| {
        (
            prop::collection::vec(inner, 1..4),
            required.clone(),
            any::<bool>(),
        )
            .prop_map(|(children, r, repeatable)| ElementDef {
                required: r,
                repeatable,
                ..ElementDef::composite("", named(children))
            })
    })
}

fn named(children: Vec<ElementDef>) -> Vec<ElementDef> {
    children
        .into_iter()
        .enumerate()
        .map(|(i, child)| ElementDef {
            name: format!("f{}", i),
            ..child
        })
        .collect()
}

fn operation(required: BoxedStrategy<bool>) -> impl Strategy<Value = ElementDef> {
    prop::collection::vec(element(required), 1..5)
        .prop_map(|children| ElementDef::composite("op", named(children)))
}

fn any_scalar() -> BoxedStrategy<DataValue> {
    prop_oneof![
        Just(DataValue::Absent),
        Just(DataValue::ExplicitNull),
        Just(DataValue::Scalar(Scalar::Int(-1))),
        Just(DataValue::Scalar(Scalar::Text(String::new()))),
        any::<i64>().prop_map(DataValue::from),
        any::<bool>().prop_map(DataValue::from),
        "[a-z]{1,6}".prop_map(DataValue::from),
    ]
    .boxed()
}

fn empty_scalar() -> BoxedStrategy<DataValue> {
    prop_oneof![
        Just(DataValue::Absent),
        Just(DataValue::Scalar(Scalar::Int(-1))),
        Just(DataValue::Scalar(Scalar::Text(String::new()))),
    ]
    .boxed()
}

/// A value shaped like `def`, with leaves drawn from `scalar`.
///
/// Repeated groups mix records with stray scalars; a few non-repeatable
/// groups come back as lists or as absent.
fn record_for(
    def: &ElementDef,
    scalar: fn() -> BoxedStrategy<DataValue>,
) -> BoxedStrategy<DataValue> {
    let Some(children) = &def.children else {
        return scalar();
    };
    let record = fields_for(children, scalar)
        .prop_map(DataValue::Composite)
        .boxed();
    let element = prop_oneof![3 => record.clone(), 1 => scalar()];
    let sequence = prop::collection::vec(element, 0..3)
        .prop_map(DataValue::Sequence)
        .boxed();
    if def.repeatable {
        sequence
    } else {
        prop_oneof![6 => record, 1 => sequence, 1 => Just(DataValue::Absent)].boxed()
    }
}

fn fields_for(
    children: &[ElementDef],
    scalar: fn() -> BoxedStrategy<DataValue>,
) -> BoxedStrategy<DataTree> {
    let fields: Vec<BoxedStrategy<(String, DataValue)>> = children
        .iter()
        .map(|child| {
            let name = child.name.clone();
            record_for(child, scalar)
                .prop_map(move |value| (name.clone(), value))
                .boxed()
        })
        .collect();
    fields
        .prop_map(|pairs| pairs.into_iter().collect::<DataTree>())
        .boxed()
}

fn case(
    required: BoxedStrategy<bool>,
    scalar: fn() -> BoxedStrategy<DataValue>,
) -> impl Strategy<Value = (SchemaTree, DataTree)> {
    operation(required).prop_flat_map(move |def| {
        let tree = SchemaTree::from_def("op", &def).unwrap();
        let children = def.children.clone().unwrap_or_default();
        fields_for(&children, scalar).prop_map(move |source| (tree.clone(), source))
    })
}

fn assert_ancestry(node: &SchemaNode) {
    for child in node.children() {
        assert_eq!(
            child.required_in_context(),
            node.required_in_context() || child.is_required(),
            "{} under {}",
            child.name(),
            node.name()
        );
        assert_ancestry(child);
    }
}

/// What extraction must return when every node is required: the source
/// restricted to schema fields, with absent values made explicit.
fn fully_required(node: &SchemaNode, source: &DataTree) -> DataTree {
    node.children()
        .iter()
        .filter_map(|field| {
            let value = source.get(field.name())?;
            Some((field.name().to_string(), required_value(field, value)))
        })
        .collect()
}

fn required_value(field: &SchemaNode, value: &DataValue) -> DataValue {
    match value {
        DataValue::Absent => DataValue::ExplicitNull,
        DataValue::Composite(sub) if field.has_children() => {
            DataValue::Composite(fully_required(field, sub))
        }
        DataValue::Sequence(items) => DataValue::Sequence(
            items.iter().map(|item| required_value(field, item)).collect(),
        ),
        other => other.clone(),
    }
}

/// True if `tree` has a non-empty leaf or a field required in context.
fn has_content(node: &SchemaNode, tree: &DataTree, sentinels: &EmptySentinels) -> bool {
    tree.iter().any(|(name, value)| {
        let Some(field) = node.child(name) else {
            return false;
        };
        field.required_in_context() || value_has_content(field, value, sentinels)
    })
}

fn value_has_content(field: &SchemaNode, value: &DataValue, sentinels: &EmptySentinels) -> bool {
    match value {
        DataValue::Composite(sub) => has_content(field, sub, sentinels),
        DataValue::Sequence(items) => items
            .iter()
            .any(|item| value_has_content(field, item, sentinels)),
        other => !sentinels.is_empty(other),
    }
}

/// A field of `source` survives in `result` exactly when it is required in
/// context or carries content, and the same holds all the way down.
fn assert_minimal(
    node: &SchemaNode,
    source: &DataTree,
    result: &DataTree,
    sentinels: &EmptySentinels,
) {
    for name in result.keys() {
        assert!(source.contains_key(name), "{} appeared from nowhere", name);
    }
    for field in node.children() {
        let Some(before) = source.get(field.name()) else {
            continue;
        };
        let expected =
            field.required_in_context() || value_has_content(field, before, sentinels);
        let kept = result.get(field.name());
        assert_eq!(
            kept.is_some(),
            expected,
            "{} = {:?} kept as {:?}",
            field.name(),
            before,
            kept
        );
        if let Some(after) = kept {
            assert_kept(field, before, after, sentinels);
        }
    }
}

fn assert_kept(
    field: &SchemaNode,
    before: &DataValue,
    after: &DataValue,
    sentinels: &EmptySentinels,
) {
    let required = field.required_in_context();
    match (before, after) {
        (DataValue::Composite(sub_before), DataValue::Composite(sub_after)) => {
            assert_minimal(field, sub_before, sub_after, sentinels);
        }
        (DataValue::Sequence(items), DataValue::Sequence(kept)) => {
            let expected: Vec<&DataValue> = items
                .iter()
                .filter(|item| required || value_has_content(field, item, sentinels))
                .collect();
            assert_eq!(kept.len(), expected.len(), "elements of {}", field.name());
            for (item_before, item_after) in expected.into_iter().zip(kept) {
                assert_kept(field, item_before, item_after, sentinels);
            }
        }
        (_, value) if !required => {
            assert!(!sentinels.is_empty(value), "kept empty value in {}", field.name());
        }
        _ => {}
    }
}

proptest! {
    #[test]
    fn requiredness_is_inherited(def in operation(any::<bool>().boxed())) {
        let tree = SchemaTree::from_def("op", &def).unwrap();
        assert_ancestry(tree.root());
    }

    #[test]
    fn fully_required_schema_keeps_everything(
        (tree, source) in case(Just(true).boxed(), any_scalar)
    ) {
        let result = Extractor::default().extract(&tree, &source, None).unwrap();
        prop_assert_eq!(result, fully_required(tree.root(), &source));
    }

    #[test]
    fn fully_optional_empty_record_extracts_to_nothing(
        (tree, source) in case(Just(false).boxed(), empty_scalar)
    ) {
        let result = Extractor::default().extract(&tree, &source, None).unwrap();
        prop_assert!(result.is_empty(), "got {:?}", result);
    }

    #[test]
    fn fields_survive_exactly_when_they_carry_content(
        (tree, source) in case(any::<bool>().boxed(), any_scalar)
    ) {
        let extractor = Extractor::default();
        let result = extractor.extract(&tree, &source, None).unwrap();
        assert_minimal(tree.root(), &source, &result, extractor.sentinels());
    }

    #[test]
    fn tag_resolution_is_idempotent(
        names in prop::sample::subsequence(vec!["name", "model", "lines", "description"], 0..=4)
    ) {
        let def = ElementDef::composite(
            "getPhone",
            vec![ElementDef::composite(
                "returnedTags",
                vec![
                    ElementDef::leaf("name"),
                    ElementDef::leaf("model"),
                    ElementDef::composite("lines", vec![ElementDef::leaf("line").repeatable()]),
                    ElementDef::leaf("description"),
                ],
            )],
        );
        let tree = SchemaTree::from_def("getPhone", &def).unwrap();

        let once = resolve_tags(&tree, &TagSelection::names(names)).unwrap();
        let twice = resolve_tags(&tree, &TagSelection::Nested(once.clone())).unwrap();
        prop_assert_eq!(once, twice);
    }
}
