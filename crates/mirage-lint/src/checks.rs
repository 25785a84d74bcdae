//! Structural checks for endpoint definition files.
//!
//! Issue codes:
//!
//! | code | meaning                                            |
//! |------|----------------------------------------------------|
//! | E001 | file cannot be read                                |
//! | E002 | file is not valid JSON                             |
//! | E003 | missing or non-object `Method`                     |
//! | E004 | method context is not an object                    |
//! | E005 | rule is malformed (no `\|`, or not a string)       |
//! | E006 | rule pattern does not compile                      |
//! | E007 | `resp_header` value is not a list of strings       |
//! | E008 | non-string scalar in a `Req` rule tree             |
//! | W001 | legacy list of header rules                        |
//! | W002 | method name is not upper-case                      |
//! | W003 | `resp_header` entry with more than one value       |
//! | W004 | no methods declared                                |
//! | W005 | key spelled differently from the one the server reads |

use crate::types::{LintIssue, LintResult};
use mirage_server::rule::RuleExpr;
use serde_json::{Map, Value};
use std::path::Path;

const METHOD_KEY: &str = "Method";
const CONTEXT_KEYS: [&str; 5] = ["Header", "Query", "resp_header", "Req", "Resp"];

/// Canonical key that `key` was probably meant to be, ignoring case and `_`.
fn misspelled_key(key: &str, known: &[&'static str]) -> Option<&'static str> {
    let folded = |k: &str| k.replace('_', "").to_lowercase();
    known
        .iter()
        .copied()
        .find(|canonical| *canonical != key && folded(canonical) == folded(key))
}

/// W005 for keys the server ignores because of their spelling.
fn check_key_spelling(
    file: &Path,
    location: &str,
    object: &Map<String, Value>,
    known: &[&'static str],
    result: &mut LintResult,
) {
    for key in object.keys() {
        if let Some(canonical) = misspelled_key(key, known) {
            let key_location = if location.is_empty() {
                key.clone()
            } else {
                format!("{location}.{key}")
            };
            result.add_issue(
                LintIssue::warning(
                    "W005",
                    format!("key `{key}` is ignored; the server only reads `{canonical}`"),
                    file,
                )
                .with_location(key_location)
                .with_suggestion(format!("Rename to `{canonical}`")),
            );
        }
    }
}

/// Check a decoded endpoint definition.
pub fn validate_definition(file: &Path, value: &Value, result: &mut LintResult) {
    let Some(root) = value.as_object() else {
        result.add_issue(
            LintIssue::error("E003", "definition must be a JSON object", file)
                .with_suggestion("Wrap the file in {\"Method\": {...}}"),
        );
        return;
    };

    check_key_spelling(file, "", root, &[METHOD_KEY], result);

    let Some(methods) = root.get(METHOD_KEY) else {
        result.add_issue(
            LintIssue::error("E003", "missing `Method` object", file)
                .with_suggestion("Declare contexts under {\"Method\": {\"GET\": {...}}}"),
        );
        return;
    };

    let Some(methods) = methods.as_object() else {
        result.add_issue(
            LintIssue::error("E003", "`Method` must be an object keyed by HTTP method", file)
                .with_location(METHOD_KEY),
        );
        return;
    };

    if methods.is_empty() {
        result.add_issue(
            LintIssue::warning("W004", "no methods declared; every request will 404", file)
                .with_location(METHOD_KEY),
        );
    }

    for (method, context) in methods {
        let location = format!("{METHOD_KEY}.{method}");

        if method.to_uppercase() != *method {
            result.add_issue(
                LintIssue::warning(
                    "W002",
                    format!("method `{method}` is not upper-case; lookup is case-sensitive"),
                    file,
                )
                .with_location(&location)
                .with_suggestion(format!("Rename to `{}`", method.to_uppercase())),
            );
        }

        match context {
            Value::Object(context) => validate_context(file, &location, context, result),
            _ => result.add_issue(
                LintIssue::error("E004", "method context must be an object", file)
                    .with_location(&location),
            ),
        }
    }
}

fn validate_context(
    file: &Path,
    location: &str,
    context: &Map<String, Value>,
    result: &mut LintResult,
) {
    check_key_spelling(file, location, context, &CONTEXT_KEYS, result);

    if let Some(headers) = context.get("Header") {
        validate_rule_map(file, &format!("{location}.Header"), headers, true, result);
    }
    if let Some(query) = context.get("Query") {
        validate_rule_map(file, &format!("{location}.Query"), query, false, result);
    }
    if let Some(headers) = context.get("resp_header") {
        validate_response_headers(file, &format!("{location}.resp_header"), headers, result);
    }
    if let Some(rules) = context.get("Req") {
        validate_rule_tree(file, &format!("{location}.Req"), rules, result);
    }
}

fn validate_rule_map(
    file: &Path,
    location: &str,
    rules: &Value,
    legacy_lists: bool,
    result: &mut LintResult,
) {
    let rules = match rules {
        Value::Null => return,
        Value::Object(rules) => rules,
        _ => {
            result.add_issue(
                LintIssue::error("E005", "rules must be an object of rule strings", file)
                    .with_location(location),
            );
            return;
        }
    };

    for (name, rule) in rules {
        let rule_location = format!("{location}.{name}");
        match rule {
            Value::String(rule) => validate_rule(file, &rule_location, rule, result),
            Value::Array(list) if legacy_lists => {
                result.add_issue(
                    LintIssue::warning(
                        "W001",
                        "legacy list of header rules; the server rejects this form",
                        file,
                    )
                    .with_location(&rule_location)
                    .with_suggestion("Run `mirage-lint --fix` to collapse it into one rule"),
                );
                for (index, entry) in list.iter().enumerate() {
                    let entry_location = format!("{rule_location}[{index}]");
                    match entry.as_str() {
                        Some(entry) => validate_rule(file, &entry_location, entry, result),
                        None => result.add_issue(
                            LintIssue::error("E005", "rule must be a string", file)
                                .with_location(entry_location),
                        ),
                    }
                }
            }
            _ => result.add_issue(
                LintIssue::error("E005", "rule must be a string", file)
                    .with_location(rule_location),
            ),
        }
    }
}

/// E005/E006 for one rule string. The empty rule is always valid.
fn validate_rule(file: &Path, location: &str, rule: &str, result: &mut LintResult) {
    if rule.is_empty() {
        return;
    }
    let expr = match RuleExpr::parse(rule) {
        Ok(expr) => expr,
        Err(_) => {
            result.add_issue(
                LintIssue::error("E005", format!("rule `{rule}` has no `|` separator"), file)
                    .with_location(location)
                    .with_suggestion(format!("Prefix a marker, e.g. `x|{rule}`")),
            );
            return;
        }
    };
    if let Err(e) = expr.compile(rule) {
        result.add_issue(
            LintIssue::error("E006", format!("pattern does not compile: {e}"), file)
                .with_location(location),
        );
    }
}

fn validate_response_headers(file: &Path, location: &str, headers: &Value, result: &mut LintResult) {
    let headers = match headers {
        Value::Null => return,
        Value::Object(headers) => headers,
        _ => {
            result.add_issue(
                LintIssue::error("E007", "response headers must be an object", file)
                    .with_location(location),
            );
            return;
        }
    };

    for (name, values) in headers {
        let header_location = format!("{location}.{name}");
        match values.as_array() {
            Some(values) if values.iter().all(Value::is_string) => {
                if values.len() > 1 {
                    result.add_issue(
                        LintIssue::warning(
                            "W003",
                            format!(
                                "{} values declared; only the first is sent",
                                values.len()
                            ),
                            file,
                        )
                        .with_location(header_location),
                    );
                }
            }
            _ => result.add_issue(
                LintIssue::error("E007", "header value must be a list of strings", file)
                    .with_location(&header_location)
                    .with_suggestion(format!("Use {{\"{name}\": [\"value\"]}}")),
            ),
        }
    }
}

fn validate_rule_tree(file: &Path, location: &str, rules: &Value, result: &mut LintResult) {
    match rules {
        Value::Null => {}
        Value::String(rule) => validate_rule(file, location, rule, result),
        Value::Object(fields) => {
            for (key, rule) in fields {
                validate_rule_tree(file, &format!("{location}.{key}"), rule, result);
            }
        }
        Value::Array(elements) => {
            for (index, rule) in elements.iter().enumerate() {
                validate_rule_tree(file, &format!("{location}[{index}]"), rule, result);
            }
        }
        Value::Bool(_) | Value::Number(_) => result.add_issue(
            LintIssue::error(
                "E008",
                format!("`{rules}` is not a rule string; the server answers 500"),
                file,
            )
            .with_location(location)
            .with_suggestion(format!("Use a rule such as `x|{rules}`")),
        ),
    }
}
