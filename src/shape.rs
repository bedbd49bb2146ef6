//! Response shaping.
//!
//! Raw responses carry wire artifacts: choice content arrives wrapped as
//! `{"_value_1": ...}`, and optional fields the caller never asked for come
//! back as nulls. [`Shaper::shape`] collapses the wrappers and drops those
//! unrequested nulls. It never fails; unexpected shapes pass through.

use tracing::trace;

use crate::error::ShapeError;
use crate::tags::{TagEntry, TagMap};
use crate::types::DEFAULT_WRAPPER_KEY;
use crate::value::{DataTree, DataValue};

/// Reshapes raw responses into caller-facing trees.
#[derive(Debug, Clone)]
pub struct Shaper {
    wrapper_key: String,
    collapse_with_siblings: bool,
}

impl Default for Shaper {
    fn default() -> Self {
        Self::new(DEFAULT_WRAPPER_KEY)
    }
}

impl Shaper {
    pub fn new(wrapper_key: impl Into<String>) -> Self {
        Self {
            wrapper_key: wrapper_key.into(),
            collapse_with_siblings: false,
        }
    }

    /// Also collapse wrappers that sit next to other keys, e.g. the `uuid`
    /// of a reference field. The siblings are dropped.
    pub fn collapse_with_siblings(mut self, enabled: bool) -> Self {
        self.collapse_with_siblings = enabled;
        self
    }

    /// Shape one record returned for `tags`.
    ///
    /// An empty tag map means "show everything": absent fields are kept.
    /// Otherwise an absent field is dropped unless it was requested. Nested
    /// levels follow the nested tag map; a leaf entry shows everything below.
    pub fn shape(&self, tags: &TagMap, raw: DataTree) -> DataTree {
        self.shape_tree(Some(tags), raw)
    }

    /// Shape every record of a list response.
    pub fn shape_all(&self, tags: &TagMap, raw: Vec<DataTree>) -> Vec<DataTree> {
        raw.into_iter().map(|record| self.shape(tags, record)).collect()
    }

    fn shape_tree(&self, tags: Option<&TagMap>, raw: DataTree) -> DataTree {
        let selective = tags.map(|t| !t.is_empty()).unwrap_or(false);
        let mut shaped = DataTree::with_capacity(raw.len());

        for (name, value) in raw {
            let entry = tags.and_then(|t| t.get(&name));
            if selective && entry.is_none() && value.is_absent() {
                trace!(field = %name, "dropping unrequested empty field");
                continue;
            }
            let value = self.shape_value(entry.and_then(TagEntry::nested), value);
            shaped.insert(name, value);
        }

        shaped
    }

    fn shape_value(&self, tags: Option<&TagMap>, value: DataValue) -> DataValue {
        match value {
            DataValue::Composite(tree) => match self.unwrap(tree) {
                Ok(inner) => self.shape_value(tags, inner),
                Err(tree) => DataValue::Composite(self.shape_tree(tags, tree)),
            },
            DataValue::Sequence(items) => DataValue::Sequence(
                items
                    .into_iter()
                    .map(|item| self.shape_value(tags, item))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Take the wrapped value out of a `{wrapper_key: value}` node.
    fn unwrap(&self, mut tree: DataTree) -> Result<DataValue, DataTree> {
        if tree.len() == 1 || self.collapse_with_siblings {
            if let Some(inner) = tree.shift_remove(&self.wrapper_key) {
                return Ok(inner);
            }
        }
        Err(tree)
    }
}

/// Follow `keys` down from `value`, e.g. `["return", "phone"]`.
///
/// List responses have nothing to descend into and are returned unchanged.
///
/// # Errors
///
/// Returns `ShapeError::MissingKey` naming the first key that isn't there
/// and the path walked so far.
pub fn descend(value: DataValue, keys: &[&str]) -> Result<DataValue, ShapeError> {
    if matches!(value, DataValue::Sequence(_)) {
        return Ok(value);
    }

    let mut current = value;
    let mut at = String::new();
    for key in keys {
        let next = match current {
            DataValue::Composite(mut tree) => tree.shift_remove(*key),
            _ => None,
        };
        current = next.ok_or_else(|| ShapeError::MissingKey {
            key: key.to_string(),
            at: at.clone(),
        })?;
        at.push('/');
        at.push_str(key);
    }
    Ok(current)
}
