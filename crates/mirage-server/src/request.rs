//! Transport-agnostic view of an incoming request.

use bytes::Bytes;
use hyper::http::request::Parts;
use std::collections::HashMap;

/// Field name to every value received under that name, in arrival order.
pub type MultiMap = HashMap<String, Vec<String>>;

/// What the dispatcher needs from a request.
#[derive(Debug, Clone, Default)]
pub struct MockRequest {
    pub method: String,
    /// Request target as received (path plus query), used for asset routing.
    pub uri: String,
    /// Percent-decoded path without the query string.
    pub path: String,
    /// Header names in `Title-Case`.
    pub headers: MultiMap,
    pub query: MultiMap,
    pub body: Bytes,
}

impl MockRequest {
    /// Start a request for tests and embedding; `uri` may carry a query.
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let (raw_path, raw_query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (uri.as_str(), None),
        };
        Self {
            method: method.into(),
            path: decode_component(raw_path, false),
            query: parse_query(raw_query),
            uri: uri.clone(),
            headers: MultiMap::new(),
            body: Bytes::new(),
        }
    }

    /// Build from hyper request parts and the collected body.
    pub fn from_parts(parts: &Parts, body: Bytes) -> Self {
        let mut headers = MultiMap::new();
        for (name, value) in parts.headers.iter() {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            headers
                .entry(header_to_title_case(name.as_str()))
                .or_default()
                .push(value);
        }

        let uri = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        Self {
            method: parts.method.as_str().to_string(),
            uri,
            path: decode_component(parts.uri.path(), false),
            headers,
            query: parse_query(parts.uri.query()),
            body,
        }
    }

    /// Append a header value; the name is canonicalized.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .entry(header_to_title_case(name))
            .or_default()
            .push(value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// `content-type` -> `Content-Type`, `x-api-key` -> `X-Api-Key`.
pub fn header_to_title_case(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join("-")
}

/// Parse a query string into a multimap. `+` decodes to a space.
pub fn parse_query(query: Option<&str>) -> MultiMap {
    let mut params = MultiMap::new();
    let Some(query) = query else {
        return params;
    };

    for pair in query.split(['&', ';']) {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params
            .entry(decode_component(key, true))
            .or_default()
            .push(decode_component(value, true));
    }
    params
}

fn decode_component(raw: &str, plus_as_space: bool) -> String {
    let raw = if plus_as_space {
        raw.replace('+', " ")
    } else {
        raw.to_string()
    };
    match urlencoding::decode(&raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw,
    }
}
