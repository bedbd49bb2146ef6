//! Schema definition loading.
//!
//! A [`SchemaProvider`] turns an operation name into its [`ElementDef`].
//! Definitions are stored one per operation as `<operation>.json`, either in
//! a local directory or under a base URL.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::LoadError;
use crate::schema::ElementDef;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of schema definitions, keyed by operation name.
///
/// Must be deterministic for a given operation and schema version.
pub trait SchemaProvider: Send + Sync {
    /// Load the definition of `operation`.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::NotFound` for unknown operations.
    fn load(&self, operation: &str) -> Result<ElementDef, LoadError>;
}

/// Load a definition from a file path.
///
/// # Errors
///
/// Returns `LoadError::ReadError` if the file can't be read,
/// or `LoadError::InvalidJson` if it isn't a valid definition.
pub fn load_definition(path: &Path) -> Result<ElementDef, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_definition_str(&content)
}

/// Load a definition from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't a valid definition.
pub fn load_definition_str(content: &str) -> Result<ElementDef, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

fn is_plain_name(operation: &str) -> bool {
    !operation.is_empty()
        && operation
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Reads `<dir>/<operation>.json`.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    dir: PathBuf,
}

impl DirectoryProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Operation names with a definition file in the directory, sorted.
    pub fn operations(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut ops: Vec<String> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(String::from))
            .collect();
        ops.sort();
        ops
    }
}

impl SchemaProvider for DirectoryProvider {
    fn load(&self, operation: &str) -> Result<ElementDef, LoadError> {
        // Names come from callers; keep them from escaping the directory
        if !is_plain_name(operation) {
            return Err(LoadError::NotFound {
                operation: operation.to_string(),
            });
        }

        let path = self.dir.join(format!("{}.json", operation));
        if !path.is_file() {
            return Err(LoadError::NotFound {
                operation: operation.to_string(),
            });
        }

        debug!(operation, path = %path.display(), "loading schema definition");
        load_definition(&path)
    }
}

/// In-memory definitions.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    defs: HashMap<String, ElementDef>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition under its root element name.
    pub fn with(mut self, def: ElementDef) -> Self {
        self.insert(def);
        self
    }

    pub fn insert(&mut self, def: ElementDef) {
        self.defs.insert(def.name.clone(), def);
    }
}

impl SchemaProvider for StaticProvider {
    fn load(&self, operation: &str) -> Result<ElementDef, LoadError> {
        self.defs
            .get(operation)
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                operation: operation.to_string(),
            })
    }
}

/// Fetches `<base>/<operation>.json` over HTTP.
///
/// Requires the `remote` feature (enabled by default).
#[cfg(feature = "remote")]
#[derive(Debug, Clone)]
pub struct UrlProvider {
    base: String,
}

#[cfg(feature = "remote")]
impl UrlProvider {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, operation: &str) -> String {
        format!("{}/{}.json", self.base, operation)
    }
}

#[cfg(feature = "remote")]
impl SchemaProvider for UrlProvider {
    fn load(&self, operation: &str) -> Result<ElementDef, LoadError> {
        if !is_plain_name(operation) {
            return Err(LoadError::NotFound {
                operation: operation.to_string(),
            });
        }

        let url = self.url_for(operation);
        debug!(operation, url = %url, "fetching schema definition");

        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|source| LoadError::NetworkError {
                url: url.clone(),
                source,
            })?;

        let response = client
            .get(&url)
            .send()
            .map_err(|source| LoadError::NetworkError {
                url: url.clone(),
                source,
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(LoadError::NotFound {
                operation: operation.to_string(),
            });
        }

        // Check for HTTP errors before parsing
        let response = response
            .error_for_status()
            .map_err(|source| LoadError::NetworkError {
                url: url.clone(),
                source,
            })?;

        let body = response.text().map_err(|source| LoadError::NetworkError {
            url: url.clone(),
            source,
        })?;

        load_definition_str(&body)
    }
}

/// Build a provider from a directory path or base URL.
///
/// URL sources require the `remote` feature.
///
/// # Errors
///
/// Returns `LoadError::NotFound` for a URL when `remote` is disabled, or
/// `LoadError::ReadError` if a path is not a directory.
pub fn provider_for(source: &str) -> Result<Box<dyn SchemaProvider>, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            Ok(Box::new(UrlProvider::new(source)))
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::NotFound {
                operation: source.to_string(),
            })
        }
    } else {
        let dir = Path::new(source);
        if !dir.is_dir() {
            return Err(LoadError::ReadError {
                path: dir.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }
        Ok(Box::new(DirectoryProvider::new(dir)))
    }
}

impl<P: SchemaProvider + ?Sized> SchemaProvider for Box<P> {
    fn load(&self, operation: &str) -> Result<ElementDef, LoadError> {
        (**self).load(operation)
    }
}

impl<P: SchemaProvider + ?Sized> SchemaProvider for std::sync::Arc<P> {
    fn load(&self, operation: &str) -> Result<ElementDef, LoadError> {
        (**self).load(operation)
    }
}
