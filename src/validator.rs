//! Deep payload validation against a schema node.
//!
//! The argument gate only checks top-level keys and stops at the first
//! problem. This module exports a node as JSON Schema and runs a full
//! validation, collecting every error.

use serde_json::{json, Map, Value};

use crate::error::{LoadError, LookupError, PayloadError, ShapeError};
use crate::schema::SchemaNode;
use crate::value::{tree_to_json, DataTree, NIL_MARKER};

/// Export `node` as a JSON Schema.
///
/// Composite nodes become closed objects (or null) whose `required` lists
/// children marked required. Repeatable nodes accept one value or an array of them.
/// Scalars accept anything except a nested object (the explicit-null
/// marker excepted).
pub fn to_json_schema(node: &SchemaNode) -> Value {
    let mut schema = node_schema(node);
    if let Value::Object(map) = &mut schema {
        map.insert("title".to_string(), Value::String(node.name().to_string()));
    }
    schema
}

fn node_schema(node: &SchemaNode) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for child in node.children() {
        let child_schema = element_schema(child);
        properties.insert(child.name().to_string(), child_schema);
        if child.is_required() {
            required.push(Value::String(child.name().to_string()));
        }
    }

    let object = json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    });

    json!({ "anyOf": [object, nil_schema(), { "type": "null" }] })
}

fn element_schema(node: &SchemaNode) -> Value {
    let single = if node.has_children() {
        node_schema(node)
    } else {
        scalar_schema()
    };

    if node.is_repeatable() {
        json!({ "anyOf": [single, { "type": "array", "items": single }] })
    } else {
        single
    }
}

fn scalar_schema() -> Value {
    json!({
        "anyOf": [
            { "type": ["string", "number", "boolean", "null"] },
            nil_schema()
        ]
    })
}

fn nil_schema() -> Value {
    json!({
        "type": "object",
        "properties": { NIL_MARKER: { "const": true } },
        "required": [NIL_MARKER],
        "additionalProperties": false
    })
}

/// Validate a full payload against `node`, collecting every error.
///
/// # Errors
///
/// Returns `ShapeError::Invalid` listing each error with its JSON Pointer.
pub fn validate_payload(node: &SchemaNode, payload: &DataTree) -> Result<(), ShapeError> {
    let schema = to_json_schema(node);
    let validator = jsonschema::validator_for(&schema).map_err(|e| {
        ShapeError::Lookup(LookupError::Load(LoadError::InvalidDefinition {
            path: format!("/{}", node.name()),
            message: e.to_string(),
        }))
    })?;

    let instance = tree_to_json(payload);
    let errors: Vec<PayloadError> = validator
        .iter_errors(&instance)
        .map(|e| PayloadError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ShapeError::Invalid { errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ElementDef, SchemaTree};
    use crate::value::tree_from_json;

    fn phone() -> SchemaTree {
        let def = ElementDef::composite(
            "addPhone",
            vec![ElementDef::composite(
                "phone",
                vec![
                    ElementDef::leaf("name").required(),
                    ElementDef::leaf("description"),
                    ElementDef::composite(
                        "lines",
                        vec![ElementDef::composite(
                            "line",
                            vec![ElementDef::leaf("index").required()],
                        )
                        .repeatable()],
                    ),
                ],
            )],
        );
        SchemaTree::from_def("addPhone", &def).unwrap()
    }

    #[test]
    fn valid_payload_passes() {
        let tree = phone();
        let payload = tree_from_json(json!({
            "name": "SEP1",
            "description": {"@nil": true},
            "lines": {"line": [{"index": 1}, {"index": 2}]}
        }))
        .unwrap();
        assert!(validate_payload(tree.child("phone").unwrap(), &payload).is_ok());
    }

    #[test]
    fn single_element_accepted_for_repeatable() {
        let tree = phone();
        let payload =
            tree_from_json(json!({"name": "SEP1", "lines": {"line": {"index": 1}}})).unwrap();
        assert!(validate_payload(tree.child("phone").unwrap(), &payload).is_ok());
    }

    #[test]
    fn nested_unknown_and_missing_fields_reported() {
        let tree = phone();
        let payload = tree_from_json(json!({
            "lines": {"line": [{"index": 1, "bogus": true}]}
        }))
        .unwrap();
        let err = validate_payload(tree.child("phone").unwrap(), &payload).unwrap_err();
        match err {
            ShapeError::Invalid { errors } => assert!(!errors.is_empty()),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn scalar_rejects_objects() {
        let tree = phone();
        let payload = tree_from_json(json!({"name": {"first": "x"}})).unwrap();
        assert!(validate_payload(tree.child("phone").unwrap(), &payload).is_err());
    }

    #[test]
    fn exported_schema_lists_required_children() {
        let tree = phone();
        let schema = to_json_schema(tree.child("phone").unwrap());
        assert_eq!(schema["title"], "phone");
        assert_eq!(schema["anyOf"][0]["required"], json!(["name"]));
        assert_eq!(schema["anyOf"][0]["additionalProperties"], json!(false));
    }
}
