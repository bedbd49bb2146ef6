//! Error types for schema loading, lookup, and data shaping.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading a schema definition from a provider.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("no schema definition for operation '{operation}'")]
    NotFound { operation: String },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid definition at {path}: {message}")]
    InvalidDefinition { path: String, message: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::NotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Schema lookup failures.
///
/// `ChildNotFound` means integration code passed a hardcoded wrapper key that
/// the operation does not have. It is a defect to fix, not caller input.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("'{parent}' does not have a child named '{child}'")]
    ChildNotFound { parent: String, child: String },
}

/// A caller-supplied tag or argument name that the schema does not allow.
///
/// Only the first offending field is reported.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValidationFault {
    /// The offending field name.
    pub field: String,
    /// Names of the enclosing elements, outermost first.
    pub path: Vec<String>,
    /// Operation the validation ran under.
    pub operation: String,
}

impl ValidationFault {
    pub fn new(operation: &str, path: &[&str], field: &str) -> Self {
        Self {
            field: field.to_string(),
            path: path.iter().map(|p| p.to_string()).collect(),
            operation: operation.to_string(),
        }
    }

    /// Slash separated location of the field, e.g. `/phone/lines`.
    pub fn pointer(&self) -> String {
        let mut out = String::new();
        for part in self.path.iter().chain(std::iter::once(&self.field)) {
            out.push('/');
            out.push_str(part);
        }
        out
    }
}

impl std::fmt::Display for ValidationFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' is not a valid field for {} (at {})",
            self.field,
            self.operation,
            self.pointer()
        )
    }
}

/// Single deep-validation error with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PayloadError {
    /// JSON Pointer (RFC 6901) to the invalid field.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Errors surfaced by the shaping operations.
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("{0}")]
    Validation(ValidationFault),

    #[error("payload failed validation with {} error(s)", .errors.len())]
    Invalid { errors: Vec<PayloadError> },

    #[error("response does not contain '{key}'{}", at_suffix(.at))]
    MissingKey { key: String, at: String },
}

fn at_suffix(at: &str) -> String {
    if at.is_empty() {
        String::new()
    } else {
        format!(" at {}", at)
    }
}

impl From<ValidationFault> for ShapeError {
    fn from(fault: ValidationFault) -> Self {
        ShapeError::Validation(fault)
    }
}

impl From<LoadError> for ShapeError {
    fn from(err: LoadError) -> Self {
        ShapeError::Lookup(LookupError::Load(err))
    }
}

impl ShapeError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ShapeError::Lookup(LookupError::Load(e)) => e.exit_code(),
            ShapeError::Lookup(LookupError::ChildNotFound { .. }) => 2,
            ShapeError::Validation(_) | ShapeError::Invalid { .. } => 1,
            ShapeError::MissingKey { .. } => 2,
        }
    }

    /// The validation fault, if this error is one.
    pub fn as_fault(&self) -> Option<&ValidationFault> {
        match self {
            ShapeError::Validation(fault) => Some(fault),
            _ => None,
        }
    }
}
