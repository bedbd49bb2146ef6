//! Core types and options for schema-guided shaping.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::{DataValue, Scalar};

/// Key the wire representation uses to wrap union/choice content.
pub const DEFAULT_WRAPPER_KEY: &str = "_value_1";

/// Child element holding an operation's selectable output fields.
pub const RETURNED_TAGS: &str = "returnedTags";

/// Integer conventionally meaning "unset" in AXL records.
pub const DEFAULT_UNSET_INT: i64 = -1;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Values treated as "empty" when pruning a template.
///
/// `Absent` is always empty. The explicit-null marker never is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptySentinels {
    /// Integers meaning "unset".
    pub unset_ints: Vec<i64>,
    /// Whether `""` counts as empty.
    pub empty_string: bool,
}

impl Default for EmptySentinels {
    fn default() -> Self {
        Self {
            unset_ints: vec![DEFAULT_UNSET_INT],
            empty_string: true,
        }
    }
}

impl EmptySentinels {
    /// Returns true if `value` is one of the empty sentinels.
    pub fn is_empty(&self, value: &DataValue) -> bool {
        match value {
            DataValue::Absent => true,
            DataValue::Scalar(Scalar::Int(n)) => self.unset_ints.contains(n),
            DataValue::Scalar(Scalar::Text(s)) => self.empty_string && s.is_empty(),
            _ => false,
        }
    }
}

/// Options for the shaping engine.
///
/// Each check can be switched off independently; nothing here is global.
#[derive(Debug, Clone)]
pub struct ShapeOptions {
    /// Validate requested tags against the schema.
    pub check_tags: bool,
    /// Validate caller arguments against the schema.
    pub check_arguments: bool,
    /// Reshape raw responses before returning them.
    pub shape_responses: bool,
    /// What counts as empty during template extraction.
    pub sentinels: EmptySentinels,
    /// Wrapper key collapsed by the response shaper.
    pub wrapper_key: String,
    /// Collapse wrappers even when the node has other keys.
    pub collapse_with_siblings: bool,
}

impl Default for ShapeOptions {
    fn default() -> Self {
        Self {
            check_tags: true,
            check_arguments: true,
            shape_responses: true,
            sentinels: EmptySentinels::default(),
            wrapper_key: DEFAULT_WRAPPER_KEY.to_string(),
            collapse_with_siblings: false,
        }
    }
}

impl ShapeOptions {
    /// Create options with every check enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable tag validation.
    pub fn check_tags(mut self, enabled: bool) -> Self {
        self.check_tags = enabled;
        self
    }

    /// Enable or disable argument validation.
    pub fn check_arguments(mut self, enabled: bool) -> Self {
        self.check_arguments = enabled;
        self
    }

    /// Enable or disable response shaping.
    pub fn shape_responses(mut self, enabled: bool) -> Self {
        self.shape_responses = enabled;
        self
    }

    /// Replace the set of "unset" integers.
    pub fn unset_ints(mut self, ints: impl IntoIterator<Item = i64>) -> Self {
        self.sentinels.unset_ints = ints.into_iter().collect();
        self
    }

    /// Set whether the empty string counts as empty.
    pub fn empty_string_is_empty(mut self, enabled: bool) -> Self {
        self.sentinels.empty_string = enabled;
        self
    }

    /// Override the wrapper key (defaults to `_value_1`).
    pub fn wrapper_key(mut self, key: impl Into<String>) -> Self {
        self.wrapper_key = key.into();
        self
    }

    /// Collapse `{"_value_1": .., "uuid": ..}` style reference fields too.
    pub fn collapse_with_siblings(mut self, enabled: bool) -> Self {
        self.collapse_with_siblings = enabled;
        self
    }
}
