//! Return tag resolution.
//!
//! Callers pick output fields either by name (`["name", "model"]`) or with an
//! explicit nested map. Names are checked against the operation's schema and
//! expanded into the canonical nested form; nested maps are trusted as given.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::ValidationFault;
use crate::schema::{SchemaNode, SchemaTree};
use crate::types::json_type_name;

/// Canonical tag selection: field name to leaf or nested selection.
pub type TagMap = IndexMap<String, TagEntry>;

/// One entry of a [`TagMap`]. Serialized as `{}` for a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagEntry {
    Leaf,
    Nested(TagMap),
}

impl TagEntry {
    pub fn nested(&self) -> Option<&TagMap> {
        match self {
            TagEntry::Leaf => None,
            TagEntry::Nested(map) => Some(map),
        }
    }
}

impl Serialize for TagEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TagEntry::Leaf => TagMap::new().serialize(serializer),
            TagEntry::Nested(map) => map.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for TagEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        entry_from_json(value).map_err(serde::de::Error::custom)
    }
}

fn entry_from_json(value: Value) -> Result<TagEntry, String> {
    match value {
        // "" and null were the historical leaf markers
        Value::Null => Ok(TagEntry::Leaf),
        Value::String(s) if s.is_empty() => Ok(TagEntry::Leaf),
        Value::Object(map) if map.is_empty() => Ok(TagEntry::Leaf),
        Value::Object(map) => {
            let mut nested = TagMap::new();
            for (k, v) in map {
                nested.insert(k, entry_from_json(v)?);
            }
            Ok(TagEntry::Nested(nested))
        }
        other => Err(format!(
            "expected {{}} or a nested tag map, got {}",
            json_type_name(&other)
        )),
    }
}

/// Requested output fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSelection", into = "RawSelection")]
pub enum TagSelection {
    /// Leaf names at the top level. Empty means "everything".
    Names(Vec<String>),
    /// An explicit nested selection, passed through unchecked.
    Nested(TagMap),
}

impl Default for TagSelection {
    fn default() -> Self {
        TagSelection::Names(Vec::new())
    }
}

impl TagSelection {
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TagSelection::Names(names.into_iter().map(Into::into).collect())
    }

    /// "Everything" selection.
    pub fn all() -> Self {
        Self::default()
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawSelection {
    Names(Vec<String>),
    // `[{...}]` is the single-element form carrying a nested map
    Wrapped(Vec<TagMap>),
    Nested(TagMap),
}

impl TryFrom<RawSelection> for TagSelection {
    type Error = String;

    fn try_from(raw: RawSelection) -> Result<Self, Self::Error> {
        match raw {
            RawSelection::Names(names) => Ok(TagSelection::Names(names)),
            RawSelection::Nested(map) => Ok(TagSelection::Nested(map)),
            RawSelection::Wrapped(mut maps) => {
                if maps.len() == 1 {
                    Ok(TagSelection::Nested(maps.remove(0)))
                } else {
                    Err(format!(
                        "expected a single nested tag map, got {}",
                        maps.len()
                    ))
                }
            }
        }
    }
}

impl From<TagSelection> for RawSelection {
    fn from(selection: TagSelection) -> Self {
        match selection {
            TagSelection::Names(names) => RawSelection::Names(names),
            TagSelection::Nested(map) => RawSelection::Nested(map),
        }
    }
}

/// Resolve requested tags for `tree` into canonical nested form.
///
/// Names are matched exactly (case-sensitive) against the operation's
/// selectable fields. Composite fields expand one level, so `"lines"` becomes
/// `{"lines": {"line": {}}}`.
///
/// # Errors
///
/// Returns a `ValidationFault` for the first name that isn't a legal field.
pub fn resolve_tags(
    tree: &SchemaTree,
    requested: &TagSelection,
) -> Result<TagMap, ValidationFault> {
    let node = tree.returned_tags();

    match requested {
        TagSelection::Nested(map) => Ok(map.clone()),
        TagSelection::Names(names) if names.is_empty() => Ok(node
            .children()
            .iter()
            .map(|child| (child.name().to_string(), expand(child)))
            .collect()),
        TagSelection::Names(names) => {
            let path = fault_path(tree, node);
            let mut resolved = TagMap::new();
            for name in names {
                let child = node
                    .child(name)
                    .ok_or_else(|| ValidationFault::new(tree.operation(), &path, name))?;
                resolved.insert(name.clone(), expand(child));
            }
            Ok(resolved)
        }
    }
}

fn expand(node: &SchemaNode) -> TagEntry {
    if node.children().is_empty() {
        TagEntry::Leaf
    } else {
        TagEntry::Nested(
            node.child_names()
                .map(|name| (name.to_string(), TagEntry::Leaf))
                .collect(),
        )
    }
}

fn fault_path<'a>(tree: &SchemaTree, node: &'a SchemaNode) -> Vec<&'a str> {
    if std::ptr::eq(node, tree.root()) {
        Vec::new()
    } else {
        vec![node.name()]
    }
}
