//! One entry point tying the schema cache to the shaping operations.

use std::sync::Arc;

use tracing::debug;

use crate::arguments::validate_arguments;
use crate::cache::SchemaCache;
use crate::error::ShapeError;
use crate::extract::Extractor;
use crate::loader::SchemaProvider;
use crate::schema::SchemaTree;
use crate::shape::Shaper;
use crate::tags::{resolve_tags, TagEntry, TagMap, TagSelection};
use crate::types::ShapeOptions;
use crate::validator;
use crate::value::DataTree;

/// Shaping engine for one schema source.
///
/// Safe to share between worker threads; the only shared state is the
/// schema cache.
#[derive(Debug)]
pub struct Engine<P> {
    cache: SchemaCache<P>,
    options: ShapeOptions,
    extractor: Extractor,
    shaper: Shaper,
}

impl<P: SchemaProvider> Engine<P> {
    pub fn new(provider: P, options: ShapeOptions) -> Self {
        Self {
            cache: SchemaCache::new(provider),
            extractor: Extractor::new(options.sentinels.clone()),
            shaper: Shaper::new(options.wrapper_key.clone())
                .collapse_with_siblings(options.collapse_with_siblings),
            options,
        }
    }

    pub fn options(&self) -> &ShapeOptions {
        &self.options
    }

    pub fn cache(&self) -> &SchemaCache<P> {
        &self.cache
    }

    /// The schema tree for `operation`.
    ///
    /// # Errors
    ///
    /// Returns `ShapeError::Lookup` if the operation can't be loaded.
    pub fn tree(&self, operation: &str) -> Result<Arc<SchemaTree>, ShapeError> {
        Ok(self.cache.get(operation)?)
    }

    /// Resolve requested return tags for `operation`.
    ///
    /// With tag checking off, names become leaves without consulting the
    /// schema and an empty list stays empty ("everything").
    ///
    /// # Errors
    ///
    /// Returns `ShapeError::Validation` for an unknown tag, or
    /// `ShapeError::Lookup` if the operation can't be loaded.
    pub fn resolve_tags(
        &self,
        operation: &str,
        requested: &TagSelection,
    ) -> Result<TagMap, ShapeError> {
        if !self.options.check_tags {
            return Ok(match requested {
                TagSelection::Nested(map) => map.clone(),
                TagSelection::Names(names) => names
                    .iter()
                    .map(|n| (n.clone(), TagEntry::Leaf))
                    .collect(),
            });
        }

        let tree = self.tree(operation)?;
        let tags = resolve_tags(&tree, requested)?;
        debug!(operation, tags = tags.len(), "resolved return tags");
        Ok(tags)
    }

    /// Gate caller arguments before dispatch.
    ///
    /// # Errors
    ///
    /// Returns `ShapeError::Validation` for the first illegal key.
    pub fn check_arguments(
        &self,
        operation: &str,
        supplied: &DataTree,
        child: Option<&str>,
    ) -> Result<(), ShapeError> {
        if !self.options.check_arguments {
            return Ok(());
        }
        let tree = self.tree(operation)?;
        validate_arguments(&tree, supplied, child)?;
        Ok(())
    }

    /// Derive a create payload for `operation` from a read record.
    ///
    /// # Errors
    ///
    /// Returns `ShapeError::Lookup` if the operation or `child` is unknown.
    pub fn extract_template(
        &self,
        operation: &str,
        source: &DataTree,
        child: Option<&str>,
    ) -> Result<DataTree, ShapeError> {
        let tree = self.tree(operation)?;
        let payload = self.extractor.extract(&tree, source, child)?;
        debug!(
            operation,
            kept = payload.len(),
            source = source.len(),
            "extracted template"
        );
        Ok(payload)
    }

    /// Deep-validate a payload for `operation` (or its `child`).
    ///
    /// # Errors
    ///
    /// Returns `ShapeError::Invalid` with every problem found.
    pub fn validate_payload(
        &self,
        operation: &str,
        payload: &DataTree,
        child: Option<&str>,
    ) -> Result<(), ShapeError> {
        let tree = self.tree(operation)?;
        let node = tree.target(child)?;
        validator::validate_payload(node, payload)
    }

    /// Shape one raw record; returned untouched when shaping is off.
    pub fn shape_response(&self, tags: &TagMap, raw: DataTree) -> DataTree {
        if !self.options.shape_responses {
            return raw;
        }
        self.shaper.shape(tags, raw)
    }

    /// Shape every record of a list response.
    pub fn shape_responses(&self, tags: &TagMap, raw: Vec<DataTree>) -> Vec<DataTree> {
        if !self.options.shape_responses {
            return raw;
        }
        self.shaper.shape_all(tags, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LoadError, LookupError};
    use crate::loader::StaticProvider;
    use crate::schema::ElementDef;
    use crate::value::{tree_from_json, tree_to_json};
    use serde_json::json;

    fn provider() -> StaticProvider {
        StaticProvider::new()
            .with(ElementDef::composite(
                "getPhone",
                vec![
                    ElementDef::leaf("name"),
                    ElementDef::composite(
                        "returnedTags",
                        vec![ElementDef::leaf("name"), ElementDef::leaf("model")],
                    ),
                ],
            ))
            .with(ElementDef::composite(
                "addPhone",
                vec![ElementDef::composite(
                    "phone",
                    vec![
                        ElementDef::leaf("name").required(),
                        ElementDef::leaf("description"),
                    ],
                )],
            ))
    }

    #[test]
    fn resolves_and_caches() {
        let engine = Engine::new(provider(), ShapeOptions::default());
        let tags = engine
            .resolve_tags("getPhone", &TagSelection::names(["model"]))
            .unwrap();
        assert!(tags.contains_key("model"));
        assert!(engine.cache().contains("getPhone"));
    }

    #[test]
    fn disabled_tag_check_skips_schema() {
        let engine = Engine::new(provider(), ShapeOptions::new().check_tags(false));
        let tags = engine
            .resolve_tags("getNothing", &TagSelection::names(["whatever"]))
            .unwrap();
        assert_eq!(tags["whatever"], TagEntry::Leaf);
        assert!(engine.cache().is_empty());
    }

    #[test]
    fn disabled_argument_check_accepts_anything() {
        let args = tree_from_json(json!({"bogus": 1})).unwrap();

        let engine = Engine::new(provider(), ShapeOptions::default());
        let err = engine.check_arguments("addPhone", &args, Some("phone")).unwrap_err();
        assert_eq!(err.as_fault().unwrap().field, "bogus");

        let engine = Engine::new(provider(), ShapeOptions::new().check_arguments(false));
        assert!(engine.check_arguments("addPhone", &args, Some("phone")).is_ok());
    }

    #[test]
    fn extract_template_uses_configured_sentinels() {
        let source = tree_from_json(json!({"name": "SEP1", "description": ""})).unwrap();

        let engine = Engine::new(provider(), ShapeOptions::default());
        let payload = engine.extract_template("addPhone", &source, Some("phone")).unwrap();
        assert_eq!(tree_to_json(&payload), json!({"name": "SEP1"}));

        let engine = Engine::new(provider(), ShapeOptions::new().empty_string_is_empty(false));
        let payload = engine.extract_template("addPhone", &source, Some("phone")).unwrap();
        assert_eq!(tree_to_json(&payload), json!({"name": "SEP1", "description": ""}));
    }

    #[test]
    fn unknown_operation_is_lookup_failure() {
        let engine = Engine::new(provider(), ShapeOptions::default());
        let err = engine
            .extract_template("addGateway", &DataTree::new(), None)
            .unwrap_err();
        assert!(matches!(
            err,
            ShapeError::Lookup(LookupError::Load(LoadError::NotFound { .. }))
        ));
    }

    #[test]
    fn shaping_can_be_disabled() {
        let raw = tree_from_json(json!({"devicePoolName": {"_value_1": "Default"}})).unwrap();

        let engine = Engine::new(provider(), ShapeOptions::default());
        let shaped = engine.shape_response(&TagMap::new(), raw.clone());
        assert_eq!(tree_to_json(&shaped), json!({"devicePoolName": "Default"}));

        let reference = json!({"devicePoolName": {"_value_1": "Default", "uuid": "{AB}"}});
        let raw_ref = tree_from_json(reference).unwrap();
        let engine = Engine::new(provider(), ShapeOptions::new().collapse_with_siblings(true));
        let shaped = engine.shape_response(&TagMap::new(), raw_ref);
        assert_eq!(tree_to_json(&shaped), json!({"devicePoolName": "Default"}));

        let engine = Engine::new(provider(), ShapeOptions::new().shape_responses(false));
        assert_eq!(engine.shape_response(&TagMap::new(), raw.clone()), raw);
        assert_eq!(engine.shape_responses(&TagMap::new(), vec![raw.clone()]), vec![raw]);
    }

    #[test]
    fn deep_validation_through_engine() {
        let engine = Engine::new(provider(), ShapeOptions::default());
        let payload = tree_from_json(json!({"description": "x"})).unwrap();
        assert!(matches!(
            engine.validate_payload("addPhone", &payload, Some("phone")),
            Err(ShapeError::Invalid { .. })
        ));
    }
}
