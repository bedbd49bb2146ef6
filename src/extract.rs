//! Template extraction.
//!
//! A record read back from AXL carries every field UCM filled in, most of
//! them defaults. Re-submitting it to an `add*` operation fails: optional
//! fields must be left out entirely so the server assigns its own defaults,
//! while required ones must be sent even when empty (as an explicit null).
//!
//! [`Extractor::extract`] walks the target operation's schema and the record
//! side by side, in schema order, and keeps a field only if it carries a
//! non-empty value or is required in context. Fields the schema doesn't know
//! are ignored. Required fields missing from the record stay missing.

use tracing::trace;

use crate::error::LookupError;
use crate::schema::{SchemaNode, SchemaTree};
use crate::types::EmptySentinels;
use crate::value::{DataTree, DataValue};

/// Prunes records into minimal create payloads.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    sentinels: EmptySentinels,
}

impl Extractor {
    pub fn new(sentinels: EmptySentinels) -> Self {
        Self { sentinels }
    }

    pub fn sentinels(&self) -> &EmptySentinels {
        &self.sentinels
    }

    /// Derive a payload for `tree` (or its `child`) from `source`.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::ChildNotFound` if `child` isn't a child of the
    /// operation's root. Data never causes an error.
    pub fn extract(
        &self,
        tree: &SchemaTree,
        source: &DataTree,
        child: Option<&str>,
    ) -> Result<DataTree, LookupError> {
        let node = tree.target(child)?;
        let mut result = self.tree_match(node, source);
        self.finalize(node, &mut result);
        Ok(result)
    }

    /// Prune `source` against `node`'s children, in schema order.
    fn tree_match(&self, node: &SchemaNode, source: &DataTree) -> DataTree {
        let mut result = DataTree::new();
        for field in node.children() {
            let Some(value) = source.get(field.name()) else {
                continue;
            };
            match self.match_field(field, value) {
                Some(kept) => {
                    result.insert(field.name().to_string(), kept);
                }
                None => trace!(field = field.name(), kind = value.kind(), "pruned"),
            }
        }
        result
    }

    fn match_field(&self, node: &SchemaNode, value: &DataValue) -> Option<DataValue> {
        let required = node.required_in_context();

        match value {
            DataValue::Sequence(items) => {
                let kept: Vec<DataValue> = items
                    .iter()
                    .filter_map(|item| self.match_element(node, item))
                    .collect();
                if required || !kept.is_empty() {
                    Some(DataValue::Sequence(kept))
                } else {
                    None
                }
            }
            DataValue::Composite(sub) if node.has_children() => self.match_record(node, sub),
            DataValue::Absent if required => Some(DataValue::ExplicitNull),
            v if !node.has_children() && !self.sentinels.is_empty(v) => Some(v.clone()),
            // Shape mismatch: keep only what the schema insists on
            other if required => Some(other.clone()),
            _ => None,
        }
    }

    /// One element of a repeated field.
    fn match_element(&self, node: &SchemaNode, item: &DataValue) -> Option<DataValue> {
        match item {
            DataValue::Composite(sub) if node.has_children() => self.match_record(node, sub),
            DataValue::Sequence(_) => self.match_field(node, item),
            DataValue::Absent if node.required_in_context() => Some(DataValue::ExplicitNull),
            // Not a record; kept when it says something
            other if node.required_in_context() || !self.sentinels.is_empty(other) => {
                Some(other.clone())
            }
            _ => None,
        }
    }

    fn match_record(&self, node: &SchemaNode, sub: &DataTree) -> Option<DataValue> {
        let pruned = self.tree_match(node, sub);
        if node.required_in_context() || !self.is_removable(Some(node), &pruned) {
            Some(DataValue::Composite(pruned))
        } else {
            None
        }
    }

    /// True if every value in `tree` is empty, recursively, and none of its
    /// fields is required in context.
    ///
    /// Sequences count as empty when all of their elements do. `node` is
    /// `None` for data the schema doesn't cover.
    pub fn is_removable(&self, node: Option<&SchemaNode>, tree: &DataTree) -> bool {
        tree.iter().all(|(name, value)| {
            let field = node.and_then(|n| n.child(name));
            if field.map(SchemaNode::required_in_context).unwrap_or(false) {
                return false;
            }
            self.is_value_removable(field, value)
        })
    }

    fn is_value_removable(&self, node: Option<&SchemaNode>, value: &DataValue) -> bool {
        match value {
            DataValue::Composite(sub) => self.is_removable(node, sub),
            DataValue::Sequence(items) => items
                .iter()
                .all(|item| self.is_value_removable(node, item)),
            other => self.sentinels.is_empty(other),
        }
    }

    /// Cleanup pass over the surviving top-level fields.
    fn finalize(&self, node: &SchemaNode, result: &mut DataTree) {
        result.retain(|name, value| {
            let Some(field) = node.child(name) else {
                return true;
            };
            if field.required_in_context() {
                if value.is_absent() {
                    *value = DataValue::ExplicitNull;
                }
                return true;
            }
            if self.sentinels.is_empty(value) {
                return false;
            }
            match value {
                DataValue::Composite(sub) => !self.is_removable(Some(field), sub),
                _ => true,
            }
        });
    }
}

/// A read record prepared for extraction.
///
/// Overrides and removals apply to the record before pruning, e.g. renaming
/// the device and dropping `lines` and `versionStamp` from a phone template.
#[derive(Debug, Clone, Default)]
pub struct Template {
    record: DataTree,
}

impl Template {
    pub fn new(record: DataTree) -> Self {
        Self { record }
    }

    /// Set (or replace) a top-level field.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.record.insert(key.into(), value.into());
        self
    }

    /// Remove a top-level field if present.
    pub fn strip(mut self, key: &str) -> Self {
        self.record.shift_remove(key);
        self
    }

    pub fn record(&self) -> &DataTree {
        &self.record
    }

    /// Extract a payload for `tree` from the prepared record.
    ///
    /// # Errors
    ///
    /// See [`Extractor::extract`].
    pub fn extract(
        &self,
        extractor: &Extractor,
        tree: &SchemaTree,
        child: Option<&str>,
    ) -> Result<DataTree, LookupError> {
        extractor.extract(tree, &self.record, child)
    }
}
