//! Endpoint definition linter for the Mirage mock server.
//!
//! Finds fixture bugs before a request hits them: rules without a `|`,
//! patterns that do not compile, legacy header rule lists and malformed
//! response headers. It can also rewrite legacy header lists in place.
//!
//! # Example
//!
//! ```no_run
//! use mirage_lint::{lint_directory, lint_file};
//! use std::path::Path;
//!
//! // Lint a single file
//! let result = lint_file(Path::new("fixtures/login.json"));
//!
//! // Lint a directory tree
//! let result = lint_directory(Path::new("./fixtures"));
//!
//! if result.has_errors() {
//!     eprintln!("Found {} errors", result.errors);
//! }
//! ```

mod checks;
mod types;

use mirage_server::definition::legacy::{migrate_header_rules, MigrationError};
use mirage_server::definition::NOT_FOUND_DEFINITION;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};

pub use checks::validate_definition;
pub use types::{FixReport, LintIssue, LintResult, Severity};

/// Why `--fix` could not rewrite a file.
#[derive(Debug, thiserror::Error)]
pub enum FixError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("{path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("cannot migrate {path}: {source}")]
    Migrate {
        path: PathBuf,
        source: MigrationError,
    },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Lint a single endpoint definition file.
///
/// A file named `404.json` is treated as the not-found fallback.
pub fn lint_file(path: &Path) -> LintResult {
    lint_file_as(path, is_not_found_fallback(path, path))
}

fn lint_file_as(path: &Path, fallback: bool) -> LintResult {
    let mut result = LintResult::new();
    result.files_checked = 1;

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            result.add_issue(LintIssue::error(
                "E001",
                format!("Failed to read file: {e}"),
                path,
            ));
            return result;
        }
    };

    lint_source(&content, path, fallback, &mut result);
    result
}

/// Lint every `*.json` file under `path`, recursively, in sorted order.
pub fn lint_directory(path: &Path) -> LintResult {
    let mut result = LintResult::new();
    let files = match collect_definition_files(path) {
        Ok(files) => files,
        Err(e) => {
            result.add_issue(LintIssue::error(
                "E001",
                format!("Failed to read directory: {e}"),
                path,
            ));
            return result;
        }
    };

    for file in files {
        let fallback = is_not_found_fallback(path, &file);
        result.merge(lint_file_as(&file, fallback));
    }
    result
}

/// Lint a file or a directory tree.
pub fn lint_path(path: &Path) -> LintResult {
    if path.is_dir() {
        lint_directory(path)
    } else {
        lint_file(path)
    }
}

/// Lint a JSON string directly (useful for in-memory validation).
pub fn lint_json(json: &str, source_name: &str) -> LintResult {
    let mut result = LintResult::new();
    result.files_checked = 1;
    let path = Path::new(source_name);
    lint_source(json, path, is_not_found_fallback(path, path), &mut result);
    result
}

fn lint_source(content: &str, path: &Path, fallback: bool, result: &mut LintResult) {
    let value: Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(e) => {
            result.add_issue(
                LintIssue::error("E002", format!("Invalid JSON: {e}"), path)
                    .with_suggestion("Check for JSON syntax errors"),
            );
            return;
        }
    };

    // The not-found fallback may be any JSON document.
    if fallback {
        return;
    }
    validate_definition(path, &value, result);
}

/// True when `file` is the not-found fallback the server reads for `root`.
///
/// For a directory that is only `<root>/404.json`; a nested `404.json` is an
/// ordinary endpoint. A `404.json` file linted on its own is the fallback.
pub fn is_not_found_fallback(root: &Path, file: &Path) -> bool {
    if root.is_dir() {
        file == root.join(NOT_FOUND_DEFINITION)
    } else {
        file.file_name()
            .is_some_and(|name| name == NOT_FOUND_DEFINITION)
    }
}

/// Every `*.json` file under `path`, sorted. A file path is returned as-is.
pub fn collect_definition_files(path: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if path.is_file() {
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path.to_path_buf());
        }
        return Ok(files);
    }

    let mut pending = vec![path.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry_path = entry?.path();
            if entry_path.is_dir() {
                pending.push(entry_path);
            } else if entry_path.extension().is_some_and(|ext| ext == "json") {
                files.push(entry_path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Rewrite legacy header rule lists in every definition under `path`.
///
/// The not-found fallback is skipped. Files that cannot be fixed are
/// reported and left untouched.
pub fn fix_path(path: &Path) -> io::Result<(Vec<FixReport>, Vec<FixError>)> {
    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for file in collect_definition_files(path)? {
        if is_not_found_fallback(path, &file) {
            continue;
        }
        match fix_file(&file) {
            Ok(Some(report)) => reports.push(report),
            Ok(None) => {}
            Err(e) => failures.push(e),
        }
    }
    Ok((reports, failures))
}

/// Rewrite legacy header rule lists in one file.
///
/// Returns `Ok(None)` when the file needs no changes; it is then left
/// untouched on disk.
pub fn fix_file(path: &Path) -> Result<Option<FixReport>, FixError> {
    let content = std::fs::read_to_string(path).map_err(|source| FixError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut value: Value = serde_json::from_str(&content).map_err(|source| FixError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let migrations = migrate_header_rules(&mut value).map_err(|source| FixError::Migrate {
        path: path.to_path_buf(),
        source,
    })?;
    if migrations.is_empty() {
        return Ok(None);
    }

    let mut output = serde_json::to_string_pretty(&value).map_err(|source| FixError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    output.push('\n');
    std::fs::write(path, output).map_err(|source| FixError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(FixReport {
        file: path.to_path_buf(),
        migrations,
    }))
}
