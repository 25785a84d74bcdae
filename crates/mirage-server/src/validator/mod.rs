//! Request validation against an endpoint context.
//!
//! - `fields`: header and query rules (flat name -> rule maps)
//! - `body`: recursive JSON rule trees
//!
//! Every check short-circuits on the first failure; there is no aggregation.

mod body;
mod fields;

pub use body::{validate_body, validate_value};
pub use fields::validate_fields;

use crate::definition::EndpointContext;
use crate::error::{Location, ValidationError};
use crate::request::MockRequest;
use crate::rule::RuleCache;

/// Run header, query and body checks in that order.
pub fn validate_request(
    context: &EndpointContext,
    request: &MockRequest,
    rules: &RuleCache,
) -> Result<(), ValidationError> {
    validate_fields(Location::Header, &request.headers, &context.header_rules, rules)?;
    validate_fields(Location::Query, &request.query, &context.query_rules, rules)?;
    validate_body(&request.body, &context.body_rules, rules)
}
