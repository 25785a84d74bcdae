//! Header and query parameter validation.

use crate::definition::RuleMap;
use crate::error::{Location, ValidationError};
use crate::request::MultiMap;
use crate::rule::RuleCache;

/// Check every declared rule against the received values.
///
/// - An empty rule always passes, present or not.
/// - A non-empty rule with no received value is `MissingField(name, 0)`.
/// - Every received value under the name must match; the first that does not
///   is reported with its index.
pub fn validate_fields(
    location: Location,
    actual: &MultiMap,
    rules: &RuleMap,
    cache: &RuleCache,
) -> Result<(), ValidationError> {
    for (name, rule) in rules.iter() {
        if rule.is_empty() {
            continue;
        }

        // Compile first so a broken rule is reported even when the field is absent.
        let regex = cache.compile(rule)?;

        let values = actual.get(name).map(Vec::as_slice).unwrap_or_default();
        if values.is_empty() {
            return Err(ValidationError::missing(location, name, Some(0)));
        }

        if let Some(index) = values.iter().position(|value| !regex.is_match(value)) {
            return Err(ValidationError::mismatch(location, name, Some(index)));
        }
    }
    Ok(())
}
