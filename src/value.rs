//! Caller-facing data trees.
//!
//! A record is a [`DataTree`]: an ordered map from field name to
//! [`DataValue`]. Absence (`Absent`) and the explicit-null marker
//! (`ExplicitNull`, "send this field, empty") are distinct variants.
//!
//! # JSON form
//!
//! | `DataValue` | JSON |
//! |-------------|------|
//! | `Absent` | `null` |
//! | `ExplicitNull` | `{"@nil": true}` |
//! | `Scalar` | string, number, or boolean |
//! | `Composite` | object |
//! | `Sequence` | array |

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// Object key marking an explicit null in JSON form.
pub const NIL_MARKER: &str = "@nil";

/// Ordered mapping of field name to value.
pub type DataTree = IndexMap<String, DataValue>;

/// Leaf values.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// One value inside a data tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DataValue {
    Scalar(Scalar),
    Composite(DataTree),
    Sequence(Vec<DataValue>),
    /// No value was returned or supplied.
    #[default]
    Absent,
    /// The field must be sent, cleared.
    ExplicitNull,
}

impl DataValue {
    /// Convert a JSON value into a data value.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => DataValue::Absent,
            Value::Bool(b) => DataValue::Scalar(Scalar::Bool(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => DataValue::Scalar(Scalar::Int(i)),
                None => DataValue::Scalar(Scalar::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            Value::String(s) => DataValue::Scalar(Scalar::Text(s)),
            Value::Array(items) => {
                DataValue::Sequence(items.into_iter().map(DataValue::from_json).collect())
            }
            Value::Object(map) => {
                if is_nil_marker(&map) {
                    DataValue::ExplicitNull
                } else {
                    DataValue::Composite(tree_from_map(map))
                }
            }
        }
    }

    /// Convert back into JSON.
    pub fn to_json(&self) -> Value {
        match self {
            DataValue::Absent => Value::Null,
            DataValue::ExplicitNull => {
                let mut map = Map::new();
                map.insert(NIL_MARKER.to_string(), Value::Bool(true));
                Value::Object(map)
            }
            DataValue::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
            DataValue::Scalar(Scalar::Int(i)) => Value::Number((*i).into()),
            DataValue::Scalar(Scalar::Float(f)) => {
                Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null)
            }
            DataValue::Scalar(Scalar::Text(s)) => Value::String(s.clone()),
            DataValue::Composite(tree) => tree_to_json(tree),
            DataValue::Sequence(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    pub fn as_tree(&self) -> Option<&DataTree> {
        match self {
            DataValue::Composite(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::Scalar(Scalar::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, DataValue::Absent)
    }

    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DataValue::Scalar(_) => "scalar",
            DataValue::Composite(_) => "composite",
            DataValue::Sequence(_) => "sequence",
            DataValue::Absent => "absent",
            DataValue::ExplicitNull => "explicit-null",
        }
    }
}

fn is_nil_marker(map: &Map<String, Value>) -> bool {
    map.len() == 1 && map.get(NIL_MARKER) == Some(&Value::Bool(true))
}

fn tree_from_map(map: Map<String, Value>) -> DataTree {
    map.into_iter()
        .map(|(k, v)| (k, DataValue::from_json(v)))
        .collect()
}

/// Build a data tree from a JSON object.
///
/// Returns `None` if `value` is not an object.
pub fn tree_from_json(value: Value) -> Option<DataTree> {
    match value {
        Value::Object(map) if !is_nil_marker(&map) => Some(tree_from_map(map)),
        _ => None,
    }
}

/// Render a data tree as a JSON object.
pub fn tree_to_json(tree: &DataTree) -> Value {
    Value::Object(
        tree.iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

impl Serialize for DataValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DataValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(DataValue::from_json)
    }
}

impl From<bool> for DataValue {
    fn from(b: bool) -> Self {
        DataValue::Scalar(Scalar::Bool(b))
    }
}

impl From<i32> for DataValue {
    fn from(i: i32) -> Self {
        DataValue::Scalar(Scalar::Int(i64::from(i)))
    }
}

impl From<i64> for DataValue {
    fn from(i: i64) -> Self {
        DataValue::Scalar(Scalar::Int(i))
    }
}

impl From<f64> for DataValue {
    fn from(f: f64) -> Self {
        DataValue::Scalar(Scalar::Float(f))
    }
}

impl From<&str> for DataValue {
    fn from(s: &str) -> Self {
        DataValue::Scalar(Scalar::Text(s.to_string()))
    }
}

impl From<String> for DataValue {
    fn from(s: String) -> Self {
        DataValue::Scalar(Scalar::Text(s))
    }
}

impl From<DataTree> for DataValue {
    fn from(tree: DataTree) -> Self {
        DataValue::Composite(tree)
    }
}

impl From<Vec<DataValue>> for DataValue {
    fn from(items: Vec<DataValue>) -> Self {
        DataValue::Sequence(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_is_absent_and_marker_is_explicit_null() {
        assert_eq!(DataValue::from_json(json!(null)), DataValue::Absent);
        assert_eq!(
            DataValue::from_json(json!({"@nil": true})),
            DataValue::ExplicitNull
        );
        // marker with extra keys is an ordinary object
        assert!(matches!(
            DataValue::from_json(json!({"@nil": true, "x": 1})),
            DataValue::Composite(_)
        ));
    }

    #[test]
    fn numbers_split_into_int_and_float() {
        assert_eq!(DataValue::from_json(json!(-1)), DataValue::from(-1));
        assert_eq!(DataValue::from_json(json!(1.5)), DataValue::from(1.5));
    }

    #[test]
    fn json_form_preserves_order_and_markers() {
        let input = json!({
            "name": "SEP0001",
            "description": null,
            "primaryPhoneName": {"@nil": true},
            "lines": {"line": [{"index": 1}]}
        });
        let tree = tree_from_json(input.clone()).unwrap();
        let keys: Vec<&str> = tree.keys().map(String::as_str).collect();
        assert_eq!(keys, ["name", "description", "primaryPhoneName", "lines"]);
        assert_eq!(tree_to_json(&tree), input);
    }

    #[test]
    fn tree_from_json_rejects_non_objects() {
        assert!(tree_from_json(json!([1, 2])).is_none());
        assert!(tree_from_json(json!("x")).is_none());
        assert!(tree_from_json(json!({"@nil": true})).is_none());
    }

    #[test]
    fn serde_round_trip_through_strings() {
        let text = r#"{"a":{"@nil":true},"b":null,"c":[true,"x"]}"#;
        let tree: DataTree = serde_json::from_str(text).unwrap();
        assert_eq!(tree["a"], DataValue::ExplicitNull);
        assert_eq!(tree["b"], DataValue::Absent);
        assert_eq!(serde_json::to_string(&tree).unwrap(), text);
    }
}
