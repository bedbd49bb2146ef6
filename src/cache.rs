//! Process-wide schema tree cache.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::LoadError;
use crate::loader::SchemaProvider;
use crate::schema::SchemaTree;

/// Caches one [`SchemaTree`] per operation name. Entries are never evicted.
///
/// Loading happens outside the lock, so two threads missing on the same
/// operation may both load it; the first to publish wins and both get the
/// same tree back. Trees are only inserted once fully built.
#[derive(Debug)]
pub struct SchemaCache<P> {
    provider: P,
    trees: RwLock<HashMap<String, Arc<SchemaTree>>>,
}

impl<P: SchemaProvider> SchemaCache<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            trees: RwLock::new(HashMap::new()),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get the tree for `operation`, loading it on first use.
    ///
    /// # Errors
    ///
    /// Returns the provider's `LoadError` (e.g. `NotFound`) or
    /// `InvalidDefinition` if the definition can't be built into a tree.
    pub fn get(&self, operation: &str) -> Result<Arc<SchemaTree>, LoadError> {
        if let Some(tree) = self.trees.read().get(operation) {
            return Ok(Arc::clone(tree));
        }

        let def = self.provider.load(operation)?;
        let tree = Arc::new(SchemaTree::from_def(operation, &def)?);

        let mut trees = self.trees.write();
        let published = trees
            .entry(operation.to_string())
            .or_insert_with(|| {
                debug!(operation, "publishing schema tree");
                tree
            });
        Ok(Arc::clone(published))
    }

    pub fn contains(&self, operation: &str) -> bool {
        self.trees.read().contains_key(operation)
    }

    pub fn len(&self) -> usize {
        self.trees.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.read().is_empty()
    }

    /// Cached operation names, sorted.
    pub fn operations(&self) -> Vec<String> {
        let mut ops: Vec<String> = self.trees.read().keys().cloned().collect();
        ops.sort();
        ops
    }
}
