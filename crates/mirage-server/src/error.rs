//! Error taxonomy for request handling.
//!
//! Every error here is request-scoped: it is turned into an HTTP response and
//! the server keeps serving. Validation failures come from the rule engine,
//! resolution failures from loading the endpoint definition.

use hyper::StatusCode;
use std::fmt;

/// Which part of the request a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Header,
    Query,
    Body,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Header => "header",
            Location::Query => "query",
            Location::Body => "body",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON container shape expected by a rule tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Object,
    Array,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Object => f.write_str("object"),
            Shape::Array => f.write_str("array"),
        }
    }
}

/// Outcome of a failed validation. `Ok(())` is the passing outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A field with a non-empty rule had no value.
    #[error("missing {location} {}", field_label(.name, .index))]
    MissingField {
        location: Location,
        name: String,
        index: Option<usize>,
    },

    /// A value did not fully match the rule's pattern.
    #[error("{location} {} does not match its rule", field_label(.name, .index))]
    PatternMismatch {
        location: Location,
        name: String,
        index: Option<usize>,
    },

    /// The rule itself cannot be used (fixture-authoring bug).
    #[error("rule `{rule}` is malformed: {reason}")]
    MalformedRule { rule: String, reason: String },

    /// The request body is not valid JSON.
    #[error("body must be valid JSON")]
    NotJson,

    /// The body has the wrong container shape at `path`.
    #[error("body {} must be a JSON {expected}", path_label(.path))]
    WrongShape { path: String, expected: Shape },
}

fn field_label(name: &str, index: &Option<usize>) -> String {
    match index {
        Some(i) => format!("`{name}[{i}]`"),
        None => format!("`{name}`"),
    }
}

fn path_label(path: &str) -> String {
    if path.is_empty() {
        "root".to_string()
    } else {
        format!("`{path}`")
    }
}

impl ValidationError {
    pub fn missing(location: Location, name: impl Into<String>, index: Option<usize>) -> Self {
        ValidationError::MissingField {
            location,
            name: name.into(),
            index,
        }
    }

    pub fn mismatch(location: Location, name: impl Into<String>, index: Option<usize>) -> Self {
        ValidationError::PatternMismatch {
            location,
            name: name.into(),
            index,
        }
    }

    pub fn malformed_rule(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::MalformedRule {
            rule: rule.into(),
            reason: reason.into(),
        }
    }

    pub fn wrong_shape(path: impl Into<String>, expected: Shape) -> Self {
        ValidationError::WrongShape {
            path: path.into(),
            expected,
        }
    }
}

/// Failure to turn a request path and method into an endpoint context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("no endpoint definition for `{path}`")]
    DefinitionNotFound { path: String },

    #[error("endpoint definition for `{path}` is malformed: {message}")]
    MalformedDefinition { path: String, message: String },

    #[error("method {method} is not defined for `{path}`")]
    MethodNotAllowed { path: String, method: String },
}

/// Any reason a mock API call did not produce its canned response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl DispatchError {
    /// HTTP status written for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::Resolve(ResolveError::DefinitionNotFound { .. })
            | DispatchError::Resolve(ResolveError::MethodNotAllowed { .. }) => {
                StatusCode::NOT_FOUND
            }
            DispatchError::Resolve(ResolveError::MalformedDefinition { .. })
            | DispatchError::Validation(ValidationError::MalformedRule { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            DispatchError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// True when the 404 fallback definition should be consulted.
    pub fn is_not_found(&self) -> bool {
        self.status() == StatusCode::NOT_FOUND
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Resolve(ResolveError::DefinitionNotFound { .. }) => {
                "definition_not_found"
            }
            DispatchError::Resolve(ResolveError::MalformedDefinition { .. }) => {
                "malformed_definition"
            }
            DispatchError::Resolve(ResolveError::MethodNotAllowed { .. }) => "method_not_allowed",
            DispatchError::Validation(ValidationError::MissingField { .. }) => "missing_field",
            DispatchError::Validation(ValidationError::PatternMismatch { .. }) => {
                "pattern_mismatch"
            }
            DispatchError::Validation(ValidationError::MalformedRule { .. }) => "malformed_rule",
            DispatchError::Validation(ValidationError::NotJson) => "not_json",
            DispatchError::Validation(ValidationError::WrongShape { .. }) => "wrong_shape",
        }
    }
}
