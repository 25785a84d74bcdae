//! Request path + method to endpoint context.

use super::cache::DefinitionCache;
use super::source::DefinitionSource;
use super::types::{EndpointContext, EndpointDefinition};
use crate::error::ResolveError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// File consulted when a definition or method is missing.
pub const NOT_FOUND_DEFINITION: &str = "404.json";

const DEFINITION_SUFFIX: &str = ".json";

/// Loads endpoint definitions from `<base_dir><url_path>.json`.
pub struct Resolver {
    base_dir: PathBuf,
    source: Arc<dyn DefinitionSource>,
    cache: Option<DefinitionCache>,
}

impl Resolver {
    pub fn new(base_dir: impl Into<PathBuf>, source: Arc<dyn DefinitionSource>) -> Self {
        Self {
            base_dir: base_dir.into(),
            source,
            cache: None,
        }
    }

    /// Enable the decoded-definition cache.
    pub fn with_cache(mut self) -> Self {
        self.cache = Some(DefinitionCache::new());
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn cache(&self) -> Option<&DefinitionCache> {
        self.cache.as_ref()
    }

    /// File path for a URL path, or `None` if the path tries to leave the
    /// definitions directory.
    ///
    /// Only absolute paths are mapped; `*` (from `OPTIONS *`) or a bare name
    /// would otherwise land next to the base directory.
    pub fn definition_path(&self, url_path: &str) -> Option<PathBuf> {
        if !url_path.starts_with('/') {
            return None;
        }
        if url_path.split(['/', '\\']).any(|segment| segment == "..") {
            return None;
        }
        let mut path = OsString::from(self.base_dir.as_os_str());
        path.push(url_path);
        path.push(DEFINITION_SUFFIX);
        Some(PathBuf::from(path))
    }

    /// Load and decode the definition for `url_path`.
    pub fn load(&self, url_path: &str) -> Result<Arc<EndpointDefinition>, ResolveError> {
        let not_found = || ResolveError::DefinitionNotFound {
            path: url_path.to_string(),
        };

        let file = self.definition_path(url_path).ok_or_else(|| {
            warn!("refusing definition path outside base dir: {url_path}");
            not_found()
        })?;

        let raw = self.source.read(&file).map_err(|e| {
            debug!("definition {} unavailable: {e}", file.display());
            not_found()
        })?;

        let decoded = match &self.cache {
            Some(cache) => cache.get_or_decode(&file, raw),
            None => EndpointDefinition::from_slice(&raw).map(Arc::new),
        };

        decoded.map_err(|e| {
            warn!("malformed definition {}: {e}", file.display());
            ResolveError::MalformedDefinition {
                path: url_path.to_string(),
                message: e.to_string(),
            }
        })
    }

    /// Endpoint context for `method` at `url_path`.
    pub fn resolve(
        &self,
        url_path: &str,
        method: &str,
    ) -> Result<Arc<EndpointContext>, ResolveError> {
        let definition = self.load(url_path)?;
        definition
            .context(method)
            .cloned()
            .ok_or_else(|| ResolveError::MethodNotAllowed {
                path: url_path.to_string(),
                method: method.to_string(),
            })
    }

    /// Raw bytes of the not-found fallback, if it exists.
    pub fn load_not_found(&self) -> Option<Vec<u8>> {
        let path = self.base_dir.join(NOT_FOUND_DEFINITION);
        match self.source.read(&path) {
            Ok(raw) => Some(raw),
            Err(e) => {
                debug!("no fallback {}: {e}", path.display());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::MemorySource;
    use serde_json::json;

    fn resolver(source: MemorySource) -> Resolver {
        Resolver::new("defs", Arc::new(source))
    }

    #[test]
    fn test_definition_path_mirrors_url() {
        let r = resolver(MemorySource::new());
        assert_eq!(
            r.definition_path("/users/1"),
            Some(PathBuf::from("defs/users/1.json"))
        );
        assert_eq!(r.definition_path("/"), Some(PathBuf::from("defs/.json")));
    }

    #[test]
    fn test_definition_path_rejects_parent_segments() {
        let r = resolver(MemorySource::new());
        assert_eq!(r.definition_path("/../secrets"), None);
        assert_eq!(r.definition_path("/a/../../b"), None);
        // Dots inside a segment are fine.
        assert!(r.definition_path("/a..b").is_some());
    }

    #[test]
    fn test_definition_path_requires_leading_slash() {
        let r = resolver(MemorySource::new());
        assert_eq!(r.definition_path("*"), None);
        assert_eq!(r.definition_path("x"), None);
        assert_eq!(r.definition_path(""), None);
    }

    #[test]
    fn test_asterisk_does_not_reach_sibling_files() {
        let source = MemorySource::new().with_file(
            "defs*.json",
            r#"{"Method": {"OPTIONS": {"Resp": "outside"}}}"#,
        );
        let r = resolver(source);
        assert!(matches!(
            r.resolve("*", "OPTIONS").unwrap_err(),
            ResolveError::DefinitionNotFound { .. }
        ));
    }

    #[test]
    fn test_resolve_method() {
        let source = MemorySource::new().with_file(
            "defs/login.json",
            r#"{"Method": {"POST": {"Resp": {"token": "abc"}}}}"#,
        );
        let r = resolver(source);

        let context = r.resolve("/login", "POST").unwrap();
        assert_eq!(context.response_body, json!({"token": "abc"}));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let r = resolver(MemorySource::new());
        assert_eq!(
            r.resolve("/users/1", "GET").unwrap_err(),
            ResolveError::DefinitionNotFound {
                path: "/users/1".to_string()
            }
        );
    }

    #[test]
    fn test_traversal_is_not_found() {
        let r = resolver(MemorySource::new());
        assert!(matches!(
            r.resolve("/../etc/passwd", "GET").unwrap_err(),
            ResolveError::DefinitionNotFound { .. }
        ));
    }

    #[test]
    fn test_malformed_definition_keeps_decode_error() {
        let source = MemorySource::new().with_file("defs/login.json", "{\"Method\": ");
        let r = resolver(source);

        match r.resolve("/login", "POST").unwrap_err() {
            ResolveError::MalformedDefinition { path, message } => {
                assert_eq!(path, "/login");
                assert!(message.contains("EOF"), "message: {message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_method() {
        let source =
            MemorySource::new().with_file("defs/login.json", r#"{"Method": {"POST": {}}}"#);
        let r = resolver(source);

        assert_eq!(
            r.resolve("/login", "post").unwrap_err(),
            ResolveError::MethodNotAllowed {
                path: "/login".to_string(),
                method: "post".to_string()
            }
        );
    }

    #[test]
    fn test_cached_resolver_sees_updates() {
        let source = Arc::new(
            MemorySource::new().with_file("defs/ping.json", r#"{"Method": {"GET": {"Resp": 1}}}"#),
        );
        let r = Resolver::new("defs", source.clone()).with_cache();

        assert_eq!(r.resolve("/ping", "GET").unwrap().response_body, json!(1));
        assert_eq!(r.resolve("/ping", "GET").unwrap().response_body, json!(1));

        source.insert("defs/ping.json", r#"{"Method": {"GET": {"Resp": 2}}}"#);
        assert_eq!(r.resolve("/ping", "GET").unwrap().response_body, json!(2));

        let stats = r.cache().unwrap().stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn test_load_not_found_fallback() {
        let r = resolver(MemorySource::new());
        assert!(r.load_not_found().is_none());

        let r = resolver(MemorySource::new().with_file("defs/404.json", r#"{"msg": "nope"}"#));
        assert_eq!(r.load_not_found().unwrap(), br#"{"msg": "nope"}"#);
    }
}
