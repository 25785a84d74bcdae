//! Mirage: a fixture-driven HTTP mock server.
//!
//! Each request path maps to a JSON endpoint definition on disk. The request
//! is checked against the definition's header, query and body rules, and the
//! canned response is returned when every rule passes.

// ===== Request validation =====
pub mod definition;
pub mod error;
pub mod rule;
pub mod validator;

// ===== Serving =====
pub mod config;
pub mod dispatcher;
pub mod metrics;
pub mod request;
pub mod response;
pub mod server;
pub mod static_files;

pub use config::Config;
pub use dispatcher::MockDispatcher;
pub use error::{DispatchError, Location, ResolveError, ValidationError};
pub use request::MockRequest;
pub use response::MockResponse;
pub use server::MockServer;
