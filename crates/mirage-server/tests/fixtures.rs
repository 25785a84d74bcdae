//! Dispatcher behaviour against fixture directories on disk.

use hyper::StatusCode;
use mirage_server::config::Config;
use mirage_server::{MockDispatcher, MockRequest};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn dispatcher(dir: &TempDir, cache: bool) -> MockDispatcher {
    let mut config = Config {
        dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    config.cache.enabled = cache;
    MockDispatcher::from_config(&config)
}

#[test]
fn test_login_flow() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "login.json",
        r#"{
            "Method": {
                "POST": {
                    "Header": {"Content-Type": "x|application/json.*"},
                    "Query": {"lang": ""},
                    "Req": {"username": "x|[a-z]{3,}", "password": "x|.{8,}"},
                    "resp_header": {"Set-Cookie": ["session=abc"]},
                    "Resp": {"token": "abc", "expires": 3600}
                }
            }
        }"#,
    );
    let d = dispatcher(&dir, true);

    let ok = MockRequest::new("POST", "/login")
        .header("content-type", "application/json")
        .body(r#"{"username": "ada", "password": "lovelace1815"}"#);
    let response = d.handle(&ok);
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), Some(json!({"token": "abc", "expires": 3600})));
    assert_eq!(response.header("set-cookie"), Some("session=abc"));

    let short_password = MockRequest::new("POST", "/login")
        .header("content-type", "application/json")
        .body(r#"{"username": "ada", "password": "short"}"#);
    let response = d.handle(&short_password);
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json(),
        Some(json!({"msg": "body `password` does not match its rule"}))
    );

    let response = d.handle(&MockRequest::new("GET", "/login"));
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[test]
fn test_nested_paths_and_not_found_fallback() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "api/v1/users/1.json",
        r#"{"Method": {"GET": {"Resp": {"id": 1}}}}"#,
    );
    let d = dispatcher(&dir, true);

    assert_eq!(
        d.handle(&MockRequest::new("GET", "/api/v1/users/1")).json(),
        Some(json!({"id": 1}))
    );

    let response = d.handle(&MockRequest::new("GET", "/api/v1/users/2"));
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.body.is_empty());

    write(dir.path(), "404.json", r#"{"msg": "not mocked"}"#);
    let response = d.handle(&MockRequest::new("GET", "/api/v1/users/2"));
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json(), Some(json!({"msg": "not mocked"})));
}

#[test]
fn test_fixture_edit_visible_on_next_request() {
    for cache in [true, false] {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "ping.json", r#"{"Method": {"GET": {"Resp": "v1"}}}"#);
        let d = dispatcher(&dir, cache);

        assert_eq!(
            d.handle(&MockRequest::new("GET", "/ping")).json(),
            Some(json!("v1"))
        );
        assert_eq!(
            d.handle(&MockRequest::new("GET", "/ping")).json(),
            Some(json!("v1"))
        );

        write(dir.path(), "ping.json", r#"{"Method": {"GET": {"Resp": "v2"}}}"#);
        assert_eq!(
            d.handle(&MockRequest::new("GET", "/ping")).json(),
            Some(json!("v2"))
        );

        fs::remove_file(dir.path().join("ping.json")).unwrap();
        assert_eq!(
            d.handle(&MockRequest::new("GET", "/ping")).status,
            StatusCode::NOT_FOUND
        );
    }
}

#[test]
fn test_legacy_header_list_is_a_fixture_error() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "legacy.json",
        r#"{"Method": {"GET": {"Header": {"X-Token": ["x|a+", "x|b+"]}}}}"#,
    );
    let d = dispatcher(&dir, false);

    let response = d.handle(&MockRequest::new("GET", "/legacy"));
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = response.json().unwrap()["msg"].as_str().unwrap().to_string();
    assert!(message.contains("mirage-lint --fix"), "message: {message}");
}

#[test]
fn test_parent_segments_never_leave_the_directory() {
    let outer = tempfile::tempdir().unwrap();
    write(outer.path(), "secret.json", r#"{"Method": {"GET": {"Resp": "leak"}}}"#);
    let inner = outer.path().join("defs");
    fs::create_dir_all(&inner).unwrap();

    let config = Config {
        dir: inner,
        ..Config::default()
    };
    let d = MockDispatcher::from_config(&config);
    let response = d.handle(&MockRequest::new("GET", "/../secret"));
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_ne!(response.json(), Some(json!("leak")));
}
