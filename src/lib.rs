//! AXL Shape
//!
//! Schema-guided shaping of AXL configuration payloads.
//!
//! Every AXL operation has a schema tree describing the elements it accepts
//! and returns. This library uses those trees to:
//!
//! - resolve the return tags a caller asks for,
//! - reject unknown arguments before a request goes out,
//! - turn a read record into a minimal create payload (template extraction),
//! - and reshape raw responses into plain trees.
//!
//! # Example
//!
//! ```
//! use axl_shape::{
//!     tree_from_json, tree_to_json, ElementDef, Engine, ShapeOptions, StaticProvider,
//!     TagSelection,
//! };
//! use serde_json::json;
//!
//! let provider = StaticProvider::new().with(ElementDef::composite(
//!     "addLine",
//!     vec![ElementDef::composite(
//!         "line",
//!         vec![
//!             ElementDef::leaf("pattern").required(),
//!             ElementDef::leaf("description"),
//!             ElementDef::leaf("usage").required(),
//!         ],
//!     )],
//! ));
//! let engine = Engine::new(provider, ShapeOptions::default());
//!
//! // A read record with read-only and empty fields
//! let record = tree_from_json(json!({
//!     "pattern": "1001",
//!     "description": "",
//!     "usage": null,
//!     "uuid": "{ABC}"
//! }))
//! .unwrap();
//!
//! let payload = engine.extract_template("addLine", &record, Some("line")).unwrap();
//! assert_eq!(
//!     tree_to_json(&payload),
//!     json!({"pattern": "1001", "usage": {"@nil": true}})
//! );
//!
//! // `uuid` is read-only, so it is not a legal argument for `addLine`
//! assert!(engine.check_arguments("addLine", &record, Some("line")).is_err());
//! assert!(engine.resolve_tags("addLine", &TagSelection::names(["line"])).is_ok());
//! ```
//!
//! # Emptiness
//!
//! | Value | Empty by default |
//! |-------|------------------|
//! | absent (`null`) | always |
//! | explicit null (`{"@nil": true}`) | never |
//! | `""` | yes, unless disabled |
//! | `-1` | yes, configurable via `unset_ints` |
//!
//! A field required in context is never pruned, even when empty; an absent
//! required field is sent as an explicit null.

mod arguments;
mod cache;
mod engine;
mod error;
mod extract;
mod layout;
mod linter;
mod loader;
mod schema;
mod shape;
mod tags;
mod types;
mod validator;
mod value;

pub use arguments::validate_arguments;
pub use cache::SchemaCache;
pub use engine::Engine;
pub use error::{LoadError, LookupError, PayloadError, ShapeError, ValidationFault};
pub use extract::{Extractor, Template};
pub use layout::{render, LayoutOptions};
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{
    is_url, load_definition, load_definition_str, provider_for, DirectoryProvider,
    SchemaProvider, StaticProvider,
};
pub use schema::{ElementDef, SchemaNode, SchemaTree};
pub use shape::{descend, Shaper};
pub use tags::{resolve_tags, TagEntry, TagMap, TagSelection};
pub use types::{
    EmptySentinels, ShapeOptions, DEFAULT_UNSET_INT, DEFAULT_WRAPPER_KEY, RETURNED_TAGS,
};
pub use validator::{to_json_schema, validate_payload};
pub use value::{tree_from_json, tree_to_json, DataTree, DataValue, Scalar, NIL_MARKER};

#[cfg(feature = "remote")]
pub use loader::UrlProvider;
