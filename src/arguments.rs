//! Argument gate run before a request is dispatched.

use crate::error::ValidationFault;
use crate::schema::SchemaTree;
use crate::value::DataTree;

/// Check that every top-level key in `supplied` is a field of the operation.
///
/// With `child`, keys are checked against that child of the root instead
/// (e.g. `addPhone` nests its payload under `phone`). Nested values are not
/// inspected; see [`crate::validate_payload`] for a deep check.
///
/// # Errors
///
/// Returns a `ValidationFault` for a missing `child` or for the first key
/// the schema doesn't allow. A scalar target allows no keys at all.
pub fn validate_arguments(
    tree: &SchemaTree,
    supplied: &DataTree,
    child: Option<&str>,
) -> Result<(), ValidationFault> {
    let operation = tree.operation();
    let (node, path) = match child {
        Some(name) => match tree.root().child(name) {
            Some(node) => (node, vec![name]),
            None => return Err(ValidationFault::new(operation, &[], name)),
        },
        None => (tree.root(), Vec::new()),
    };

    for key in supplied.keys() {
        if !node.has_children() || node.child(key).is_none() {
            return Err(ValidationFault::new(operation, &path, key));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ElementDef;
    use crate::value::{tree_from_json, DataValue};
    use serde_json::json;

    fn tree() -> SchemaTree {
        let def = ElementDef::composite(
            "addPhone",
            vec![
                ElementDef::composite(
                    "phone",
                    vec![
                        ElementDef::leaf("name").required(),
                        ElementDef::leaf("description"),
                        ElementDef::composite("lines", vec![ElementDef::leaf("line")]),
                    ],
                )
                .required(),
                ElementDef::leaf("sequence"),
            ],
        );
        SchemaTree::from_def("addPhone", &def).unwrap()
    }

    #[test]
    fn accepts_legal_keys() {
        let args = tree_from_json(json!({"phone": {"anything": 1}, "sequence": 2})).unwrap();
        assert!(validate_arguments(&tree(), &args, None).is_ok());
    }

    #[test]
    fn first_unknown_key_wins() {
        let args = tree_from_json(json!({"phone": {}, "x": 1, "y": 2})).unwrap();
        let fault = validate_arguments(&tree(), &args, None).unwrap_err();
        assert_eq!(fault.field, "x");
        assert_eq!(fault.operation, "addPhone");
        assert!(fault.path.is_empty());
    }

    #[test]
    fn child_scopes_the_check() {
        let args = tree_from_json(json!({"name": "SEP1", "lines": null})).unwrap();
        assert!(validate_arguments(&tree(), &args, Some("phone")).is_ok());

        let args = tree_from_json(json!({"name": "SEP1", "sequence": 1})).unwrap();
        let fault = validate_arguments(&tree(), &args, Some("phone")).unwrap_err();
        assert_eq!(fault.field, "sequence");
        assert_eq!(fault.path, vec!["phone".to_string()]);
    }

    #[test]
    fn missing_child_faults() {
        let fault = validate_arguments(&tree(), &DataTree::new(), Some("gateway")).unwrap_err();
        assert_eq!(fault.field, "gateway");
    }

    #[test]
    fn scalar_target_rejects_every_key() {
        let mut args = DataTree::new();
        args.insert("value".into(), DataValue::from(1));
        let fault = validate_arguments(&tree(), &args, Some("sequence")).unwrap_err();
        assert_eq!(fault.field, "value");

        assert!(validate_arguments(&tree(), &DataTree::new(), Some("sequence")).is_ok());
    }

    #[test]
    fn does_not_mutate_input() {
        let args = tree_from_json(json!({"phone": {"name": "x"}})).unwrap();
        let before = args.clone();
        validate_arguments(&tree(), &args, None).unwrap();
        assert_eq!(args, before);
    }
}
