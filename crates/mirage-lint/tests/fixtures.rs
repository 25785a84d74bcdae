//! Linting and fixing fixture trees on disk.

use mirage_lint::{
    collect_definition_files, fix_file, fix_path, lint_directory, lint_file, Severity,
};
use mirage_server::definition::EndpointDefinition;
use std::fs;
use std::path::Path;

fn write(dir: &Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

#[test]
fn test_directory_is_walked_recursively_in_order() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "b.json", r#"{"Method": {"GET": {}}}"#);
    write(dir.path(), "a/nested.json", r#"{"Method": {"GET": {}}}"#);
    write(dir.path(), "a/readme.txt", "not a fixture");
    write(dir.path(), "404.json", "[]");

    let files = collect_definition_files(dir.path()).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|f| f.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["404.json", "a/nested.json", "b.json"]);

    let result = lint_directory(dir.path());
    assert_eq!(result.files_checked, 3);
    assert!(result.issues.is_empty(), "{:?}", result.issues);
}

#[test]
fn test_only_root_not_found_file_is_exempt() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "404.json", r#"{"msg": "not here"}"#);
    write(dir.path(), "a/404.json", r#"{"msg": "not here"}"#);

    let result = lint_directory(dir.path());
    assert_eq!(result.files_checked, 2);
    assert_eq!(result.codes(), vec!["E003"]);
    assert!(result.issues[0].file.ends_with("a/404.json"));
}

#[test]
fn test_fix_path_skips_fallback_and_fixes_nested_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "404.json", "<h1>not here</h1>");
    write(
        dir.path(),
        "a/404.json",
        r#"{"Method": {"GET": {"Header": {"Token": ["x|a"]}}}}"#,
    );

    let (reports, failures) = fix_path(dir.path()).unwrap();
    assert!(failures.is_empty(), "{failures:?}");
    assert_eq!(reports.len(), 1);
    assert!(reports[0].file.ends_with("a/404.json"));
    assert_eq!(
        fs::read_to_string(dir.path().join("404.json")).unwrap(),
        "<h1>not here</h1>"
    );
}

#[test]
fn test_issues_are_reported_per_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "broken.json", "{");
    write(
        dir.path(),
        "users.json",
        r#"{"Method": {"post": {"Query": {"id": "[0-9]+"}}}}"#,
    );

    let result = lint_directory(dir.path());
    assert_eq!(result.codes(), vec!["E002", "W002", "E005"]);
    assert_eq!(result.errors, 2);
    assert_eq!(result.warnings, 1);
    assert!(result
        .issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .all(|i| i.file.extension().is_some_and(|e| e == "json")));
}

#[test]
fn test_fix_rewrites_legacy_header_lists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("login.json");
    write(
        dir.path(),
        "login.json",
        r#"{"Method": {"POST": {"Header": {"Token": ["x|[a-f]+", "x|[0-9]+"], "Accept": "x|.*"}, "Resp": {"ok": true}}}}"#,
    );

    assert_eq!(lint_file(&path).codes(), vec!["W001"]);
    assert!(EndpointDefinition::from_slice(&fs::read(&path).unwrap()).is_err());

    let report = fix_file(&path).unwrap().unwrap();
    assert_eq!(report.migrations.len(), 1);
    assert!(report.loosened());

    assert!(lint_file(&path).issues.is_empty());
    let definition = EndpointDefinition::from_slice(&fs::read(&path).unwrap()).unwrap();
    let context = definition.context("POST").unwrap();
    assert_eq!(context.header_rules.get("Token"), Some("x|(?:[a-f]+)|(?:[0-9]+)"));
    assert_eq!(context.header_rules.get("Accept"), Some("x|.*"));

    // Second run has nothing to do.
    assert!(fix_file(&path).unwrap().is_none());
}

#[test]
fn test_fix_leaves_unfixable_files_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    let original = r#"{"Method": {"GET": {"Header": {"Token": ["x|a", 7]}}}}"#;
    write(dir.path(), "bad.json", original);

    assert!(fix_file(&path).is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), original);
}
