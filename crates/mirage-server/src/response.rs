//! Response assembly.
//!
//! The dispatcher produces a [`MockResponse`]; the transport turns it into a
//! hyper response with [`MockResponse::into_http`].

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use hyper::http::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Response, StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

pub const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";
pub const HTML_CONTENT_TYPE: &str = "text/html";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// A fully assembled response.
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl MockResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body decoded as JSON, if it is JSON.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    pub fn into_http(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Builder that silently drops headers which are not valid HTTP.
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        ResponseBuilder {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Append a header value, keeping earlier values for the same name.
    pub fn append_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => warn!("dropping invalid response header `{name}: {value}`"),
        }
        self
    }

    /// Set a header, replacing any earlier values.
    pub fn set_header(mut self, name: HeaderName, value: &'static str) -> Self {
        self.headers.insert(name, HeaderValue::from_static(value));
        self
    }

    /// Declared response headers; only the first value of each is sent.
    pub fn declared_headers(self, declared: &BTreeMap<String, Vec<String>>) -> Self {
        declared
            .iter()
            .filter_map(|(name, values)| values.first().map(|value| (name, value)))
            .fold(self, |builder, (name, value)| {
                builder.append_header(name, value)
            })
    }

    pub fn cors(self) -> Self {
        self.set_header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
    }

    /// Serialize `value` as the body with a JSON content type, or fall back to
    /// a debug rendering as `text/html` if it cannot be serialized.
    pub fn json_body(self, value: &Value) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.set_header(CONTENT_TYPE, JSON_CONTENT_TYPE).body(bytes),
            Err(e) => {
                warn!("response body is not serializable: {e}");
                self.set_header(CONTENT_TYPE, HTML_CONTENT_TYPE)
                    .body(format!("{value:?}"))
            }
        }
    }

    pub fn build(self) -> MockResponse {
        MockResponse {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

/// `{"msg": "<text>"}` error response with CORS enabled.
pub fn error_response(status: StatusCode, message: &str) -> MockResponse {
    ResponseBuilder::new(status)
        .cors()
        .json_body(&serde_json::json!({ "msg": message }))
        .build()
}

/// Plain-text response, used by the static asset and metrics listeners.
pub fn text_response(status: StatusCode, text: impl Into<Bytes>) -> MockResponse {
    ResponseBuilder::new(status)
        .set_header(CONTENT_TYPE, TEXT_CONTENT_TYPE)
        .body(text)
        .build()
}
