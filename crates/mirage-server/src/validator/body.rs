//! Recursive validation of JSON bodies against rule trees.
//!
//! The rule tree mirrors the expected body:
//!
//! | rule node | body must be | then                                         |
//! |-----------|--------------|----------------------------------------------|
//! | `null`    | anything     | pass                                         |
//! | object    | object       | each rule key checked against `body[key]`    |
//! | array     | array        | rule element `i` checked against body `i`    |
//! | string    | any value    | its text form must match the rule expression |
//!
//! Keys and trailing elements the rules do not mention are ignored. An absent
//! value fails a string rule with `MissingField` and a container rule with
//! `WrongShape`. An empty string rule accepts anything, including absence.

use crate::error::{Location, Shape, ValidationError};
use crate::rule::RuleCache;
use serde_json::Value;

/// Validate raw body bytes. A `null` rule tree skips decoding entirely.
pub fn validate_body(raw: &[u8], rules: &Value, cache: &RuleCache) -> Result<(), ValidationError> {
    if rules.is_null() {
        return Ok(());
    }
    let body: Value = serde_json::from_slice(raw).map_err(|_| ValidationError::NotJson)?;
    validate_value(Some(&body), rules, "", cache)
}

/// Validate one node; `path` is the dotted location of `body`.
pub fn validate_value(
    body: Option<&Value>,
    rules: &Value,
    path: &str,
    cache: &RuleCache,
) -> Result<(), ValidationError> {
    match rules {
        Value::Null => Ok(()),

        Value::Object(fields) => {
            let object = body
                .and_then(Value::as_object)
                .ok_or_else(|| ValidationError::wrong_shape(path, Shape::Object))?;
            for (key, rule) in fields {
                validate_value(object.get(key), rule, &child_key(path, key), cache)?;
            }
            Ok(())
        }

        Value::Array(elements) => {
            let items = body
                .and_then(Value::as_array)
                .ok_or_else(|| ValidationError::wrong_shape(path, Shape::Array))?;
            for (index, rule) in elements.iter().enumerate() {
                validate_value(items.get(index), rule, &child_index(path, index), cache)?;
            }
            Ok(())
        }

        Value::String(rule) => {
            if rule.is_empty() {
                return Ok(());
            }
            let regex = cache.compile(rule)?;
            let value = body.ok_or_else(|| ValidationError::missing(Location::Body, path, None))?;
            if regex.is_match(&text_form(value)) {
                Ok(())
            } else {
                Err(ValidationError::mismatch(Location::Body, path, None))
            }
        }

        Value::Bool(_) | Value::Number(_) => Err(ValidationError::malformed_rule(
            rules.to_string(),
            format!(
                "rule tree leaf at {} must be a rule string",
                if path.is_empty() { "root" } else { path }
            ),
        )),
    }
}

/// Strings as-is, everything else as compact JSON (`42`, `true`, `null`).
///
/// Integral floats drop their fraction (`42.0` and `1e3` read `42` and
/// `1000`) so integer rules accept them.
fn text_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

fn child_key(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn child_index(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}
