//! Mock dispatch: resolve the endpoint, validate the request, answer.
//!
//! The dispatcher is synchronous. It reads a definition file on every call, so
//! the transport runs it on a blocking thread.

use crate::config::Config;
use crate::definition::{EndpointContext, EndpointDefinition, FsSource, Resolver};
use crate::error::DispatchError;
use crate::metrics;
use crate::request::MockRequest;
use crate::response::{
    error_response, MockResponse, ResponseBuilder, HTML_CONTENT_TYPE, JSON_CONTENT_TYPE,
};
use crate::rule::RuleCache;
use crate::validator::validate_request;
use hyper::header::CONTENT_TYPE;
use hyper::StatusCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Extensions answered by the static asset handler.
pub const STATIC_EXTENSIONS: [&str; 4] = ["js", "css", "jpg", "png"];

/// How far back from the end of the URI a `.` is looked for.
const SUFFIX_SCAN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Static,
    Api,
}

/// Characters after the last `.` within the final few characters of `uri`.
///
/// The first character is never considered, and a URI without a nearby `.`
/// has an empty suffix. The query string is part of the scan.
pub fn request_suffix(uri: &str) -> &str {
    let bytes = uri.as_bytes();
    let scan = bytes.len().min(SUFFIX_SCAN);
    (1..scan)
        .map(|i| bytes.len() - i)
        .find(|&index| bytes[index] == b'.')
        .map(|index| &uri[index + 1..])
        .unwrap_or("")
}

pub fn route(uri: &str) -> Route {
    if STATIC_EXTENSIONS.contains(&request_suffix(uri)) {
        Route::Static
    } else {
        Route::Api
    }
}

/// Answers mock API calls from endpoint definitions.
pub struct MockDispatcher {
    resolver: Resolver,
    rules: RuleCache,
}

impl MockDispatcher {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver,
            rules: RuleCache::new(),
        }
    }

    /// Filesystem-backed dispatcher for `config.dir`.
    pub fn from_config(config: &Config) -> Self {
        let resolver = Resolver::new(config.dir.clone(), Arc::new(FsSource));
        let resolver = if config.cache.enabled {
            resolver.with_cache()
        } else {
            resolver
        };
        Self::new(resolver)
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn rule_cache(&self) -> &RuleCache {
        &self.rules
    }

    /// Resolve and validate; the matched context on success.
    pub fn dispatch(&self, request: &MockRequest) -> Result<Arc<EndpointContext>, DispatchError> {
        let context = self.resolver.resolve(&request.path, &request.method)?;
        validate_request(&context, request, &self.rules)?;
        Ok(context)
    }

    /// Full response for a mock API call. Never fails: every error becomes a
    /// response.
    pub fn handle(&self, request: &MockRequest) -> MockResponse {
        let started = Instant::now();

        let (response, outcome) = match self.dispatch(request) {
            Ok(context) => {
                debug!("{} {} -> 200", request.method, request.path);
                (success_response(&context), "ok")
            }
            Err(e) if e.is_not_found() => {
                debug!("{} {} -> 404: {e}", request.method, request.path);
                (self.not_found_response(&request.method), e.kind())
            }
            Err(e) => {
                let status = e.status();
                if status.is_server_error() {
                    warn!("{} {} -> {status}: {e}", request.method, request.path);
                } else {
                    debug!("{} {} -> {status}: {e}", request.method, request.path);
                }
                (error_response(status, &e.to_string()), e.kind())
            }
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        metrics::record_request(&request.method, outcome, elapsed_ms);
        response
    }

    /// 404 answer built from `404.json`, or an empty body when there is none.
    fn not_found_response(&self, method: &str) -> MockResponse {
        let Some(raw) = self.resolver.load_not_found() else {
            return ResponseBuilder::new(StatusCode::NOT_FOUND).cors().build();
        };

        let fallback_context = EndpointDefinition::from_slice(&raw)
            .ok()
            .and_then(|definition| definition.context(method).cloned());

        match fallback_context {
            Some(context) => ResponseBuilder::new(StatusCode::NOT_FOUND)
                .declared_headers(&context.response_headers)
                .cors()
                .json_body(&context.response_body)
                .build(),
            None => {
                let content_type = if serde_json::from_slice::<serde_json::Value>(&raw).is_ok() {
                    JSON_CONTENT_TYPE
                } else {
                    HTML_CONTENT_TYPE
                };
                ResponseBuilder::new(StatusCode::NOT_FOUND)
                    .cors()
                    .set_header(CONTENT_TYPE, content_type)
                    .body(raw)
                    .build()
            }
        }
    }
}

/// 200 with the declared headers and the canned body.
fn success_response(context: &EndpointContext) -> MockResponse {
    ResponseBuilder::new(StatusCode::OK)
        .declared_headers(&context.response_headers)
        .cors()
        .json_body(&context.response_body)
        .build()
}
