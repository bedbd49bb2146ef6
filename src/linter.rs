//! Static checks over schema definition files.
//!
//! | Code | Severity | Finding |
//! |------|----------|---------|
//! | E001 | error | file unreadable, not JSON, or not a definition |
//! | E002 | error | two siblings share a name |
//! | E003 | error | root element not named after the file |
//! | E004 | error | empty element name, or one containing `/` |
//! | W001 | warning | composite element with no children |
//! | W002 | warning | root element marked repeatable |

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::schema::ElementDef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One finding inside a definition file.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    /// Element path of the finding, e.g. `/addPhone/phone/lines`
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn error(code: &'static str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            path: path.into(),
            message: message.into(),
        }
    }

    fn warning(code: &'static str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, path, message)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Findings for one file; `file` is relative to the linted root.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl FileResult {
    fn new(file: PathBuf, diagnostics: Vec<Diagnostic>) -> Self {
        let status = if diagnostics.iter().any(|d| d.severity == Severity::Error) {
            FileStatus::Error
        } else if diagnostics.is_empty() {
            FileStatus::Ok
        } else {
            FileStatus::Warning
        };
        Self {
            file,
            status,
            diagnostics,
        }
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Totals over every linted file.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub strict: bool,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// True when no file failed. In strict mode warnings fail a file.
    pub fn is_ok(&self) -> bool {
        self.failed == 0
    }
}

/// Lint one definition file, or every `.json` file under a directory.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let results: Vec<FileResult> = definition_files(path)
        .iter()
        .map(|file| lint_file(file, path))
        .collect();

    let failed = results
        .iter()
        .filter(|r| match r.status {
            FileStatus::Error => true,
            FileStatus::Warning => strict,
            FileStatus::Ok => false,
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        strict,
        files_checked: results.len(),
        passed: results.len() - failed,
        failed,
        errors: results.iter().map(|r| r.count(Severity::Error)).sum(),
        warnings: results.iter().map(|r| r.count(Severity::Warning)).sum(),
        results,
    }
}

/// Lint a single definition file. `root` only shortens the reported path.
pub fn lint_file(file: &Path, root: &Path) -> FileResult {
    let shown = file.strip_prefix(root).unwrap_or(file);
    let shown = if shown.as_os_str().is_empty() {
        file.file_name().map(PathBuf::from).unwrap_or_default()
    } else {
        shown.to_path_buf()
    };

    let def = match read_definition(file) {
        Ok(def) => def,
        Err(message) => {
            return FileResult::new(shown, vec![Diagnostic::error("E001", "/", message)]);
        }
    };

    let mut diagnostics = Vec::new();
    let root_path = format!("/{}", def.name);
    let stem = file.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    if def.name != stem {
        diagnostics.push(Diagnostic::error(
            "E003",
            &root_path,
            format!("root element '{}' does not match file name '{}'", def.name, stem),
        ));
    }
    if def.repeatable {
        diagnostics.push(Diagnostic::warning(
            "W002",
            &root_path,
            "root element is marked repeatable",
        ));
    }
    check_element(&def, "", &mut diagnostics);

    FileResult::new(shown, diagnostics)
}

fn read_definition(file: &Path) -> Result<ElementDef, String> {
    let content = std::fs::read_to_string(file).map_err(|e| format!("cannot read file: {}", e))?;
    let value: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| format!("syntax error: {}", e))?;
    serde_json::from_value(value).map_err(|e| format!("invalid definition: {}", e))
}

fn check_element(def: &ElementDef, parent: &str, out: &mut Vec<Diagnostic>) {
    let path = format!("{}/{}", parent, def.name);
    if def.name.is_empty() || def.name.contains('/') {
        out.push(Diagnostic::error(
            "E004",
            parent.to_string(),
            format!("invalid element name '{}'", def.name),
        ));
    }

    let Some(children) = &def.children else {
        return;
    };
    if children.is_empty() {
        out.push(Diagnostic::warning(
            "W001",
            &path,
            "composite element has no children",
        ));
    }

    let mut seen = HashSet::new();
    for child in children {
        if !seen.insert(child.name.as_str()) {
            out.push(Diagnostic::error(
                "E002",
                &path,
                format!("duplicate child element '{}'", child.name),
            ));
        }
        check_element(child, &path, out);
    }
}

/// `.json` files at `path`, sorted. Hidden entries are skipped.
fn definition_files(path: &Path) -> Vec<PathBuf> {
    let is_json = |p: &Path| p.extension().is_some_and(|e| e == "json");
    if !path.is_dir() {
        return if is_json(path) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        };
    }

    let mut files = Vec::new();
    let mut pending = vec![path.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let entry_path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if hidden {
                continue;
            }
            if entry_path.is_dir() {
                pending.push(entry_path);
            } else if is_json(&entry_path) {
                files.push(entry_path);
            }
        }
    }
    files.sort();
    files
}
