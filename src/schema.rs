//! Schema trees.
//!
//! A [`SchemaTree`] is the legal shape of one AXL operation: element names,
//! nesting, and required/repeatable markers. Trees are built once from an
//! [`ElementDef`] and never change afterwards.
//!
//! Requiredness propagates downwards: a node is *required in context* when it
//! or any ancestor is marked required. The flag is computed while building,
//! so nodes carry no parent pointers.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, LookupError};
use crate::types::RETURNED_TAGS;

/// Serialized definition of one element, as read from a schema provider.
///
/// An element is composite iff `children` is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElementDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub repeatable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ElementDef>>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl ElementDef {
    /// A scalar element.
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            repeatable: false,
            children: None,
        }
    }

    /// A composite element.
    pub fn composite(name: impl Into<String>, children: Vec<ElementDef>) -> Self {
        Self {
            children: Some(children),
            ..Self::leaf(name)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }
}

/// One immutable schema element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaNode {
    name: String,
    has_children: bool,
    children: Vec<SchemaNode>,
    is_repeatable: bool,
    is_required: bool,
    required_in_context: bool,
}

impl SchemaNode {
    /// Build a node (and its subtree) from a definition.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::InvalidDefinition` if two siblings share a name.
    pub fn from_def(def: &ElementDef) -> Result<Self, LoadError> {
        build_node(def, false, "")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_children(&self) -> bool {
        self.has_children
    }

    /// Children in schema order. Empty for scalar nodes.
    pub fn children(&self) -> &[SchemaNode] {
        &self.children
    }

    pub fn is_repeatable(&self) -> bool {
        self.is_repeatable
    }

    /// This node's own required marker.
    pub fn is_required(&self) -> bool {
        self.is_required
    }

    /// True if this node or any ancestor is marked required.
    pub fn required_in_context(&self) -> bool {
        self.required_in_context
    }

    /// Look up an immediate child by exact name.
    pub fn child(&self, name: &str) -> Option<&SchemaNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn child_names(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|c| c.name.as_str())
    }
}

fn build_node(
    def: &ElementDef,
    parent_required: bool,
    path: &str,
) -> Result<SchemaNode, LoadError> {
    let node_path = format!("{}/{}", path, def.name);
    let required_in_context = parent_required || def.required;

    let mut children = Vec::new();
    if let Some(defs) = &def.children {
        let mut seen = HashSet::new();
        for child in defs {
            if !seen.insert(child.name.as_str()) {
                return Err(LoadError::InvalidDefinition {
                    path: node_path,
                    message: format!("duplicate child '{}'", child.name),
                });
            }
            children.push(build_node(child, required_in_context, &node_path)?);
        }
    }

    Ok(SchemaNode {
        name: def.name.clone(),
        has_children: def.children.is_some(),
        children,
        is_repeatable: def.repeatable,
        is_required: def.required,
        required_in_context,
    })
}

/// The schema of one named operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaTree {
    operation: String,
    root: SchemaNode,
}

impl SchemaTree {
    /// Build the tree for `operation` from its definition.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::InvalidDefinition` if the root is not named after
    /// the operation, or if any node has duplicate children.
    pub fn from_def(operation: &str, def: &ElementDef) -> Result<Self, LoadError> {
        if def.name != operation {
            return Err(LoadError::InvalidDefinition {
                path: format!("/{}", def.name),
                message: format!("root element is not named '{}'", operation),
            });
        }
        Ok(Self {
            operation: operation.to_string(),
            root: SchemaNode::from_def(def)?,
        })
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// Descend into an immediate child of the root.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::ChildNotFound` if the root has no such child.
    pub fn child(&self, name: &str) -> Result<&SchemaNode, LookupError> {
        self.root.child(name).ok_or_else(|| LookupError::ChildNotFound {
            parent: self.operation.clone(),
            child: name.to_string(),
        })
    }

    /// The root, or the named child of it when `child` is given.
    pub fn target(&self, child: Option<&str>) -> Result<&SchemaNode, LookupError> {
        match child {
            Some(name) => self.child(name),
            None => Ok(&self.root),
        }
    }

    /// The node listing selectable output fields.
    ///
    /// Read operations keep these under `returnedTags`; operations without
    /// one expose their fields at the root.
    pub fn returned_tags(&self) -> &SchemaNode {
        self.root.child(RETURNED_TAGS).unwrap_or(&self.root)
    }
}
