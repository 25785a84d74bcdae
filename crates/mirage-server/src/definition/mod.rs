//! Endpoint definitions and how they are loaded.
//!
//! An endpoint definition is a JSON file whose path mirrors the URL it serves:
//! `/users/1` is answered from `<dir>/users/1.json`.
//!
//! ## Module Structure
//!
//! - `types`: the decoded definition (`EndpointDefinition`, `EndpointContext`, `RuleMap`)
//! - `source`: where definition bytes come from (`DefinitionSource`)
//! - `cache`: decoded-definition cache keyed on file content
//! - `resolver`: path + method to endpoint context
//! - `legacy`: migration of the list-per-header rule form

mod cache;
pub mod legacy;
mod resolver;
mod source;
mod types;

pub use cache::DefinitionCache;
pub use resolver::{Resolver, NOT_FOUND_DEFINITION};
pub use source::{DefinitionSource, FsSource, MemorySource};
pub use types::{EndpointContext, EndpointDefinition, RuleMap};
