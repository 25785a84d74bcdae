//! Migration of legacy header rules.
//!
//! Older fixtures declared a list of rule strings per header:
//!
//! ```json
//! { "Header": { "Token": ["x|[a-f0-9]+", "x|[A-F0-9]+"] } }
//! ```
//!
//! The server only accepts one rule string per field. [`migrate_header_rules`]
//! rewrites a decoded fixture in place so it can be written back to disk.

use crate::rule::{RuleExpr, RULE_SEPARATOR};
use serde::Serialize;
use serde_json::Value;

/// One rewritten header rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Migration {
    /// HTTP method whose context was rewritten.
    pub method: String,
    /// Header name.
    pub header: String,
    /// Rule string now stored for the header.
    pub rule: String,
    /// True when the legacy list had several rules. The new rule accepts a
    /// value matching any of them, which is looser than per-index pairing.
    pub loosened: bool,
}

/// Why a legacy list could not be migrated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    #[error("{method} header `{header}`: list entry {index} is not a string")]
    NonStringEntry {
        method: String,
        header: String,
        index: usize,
    },

    #[error("{method} header `{header}`: list entry `{rule}` has no `|` separator")]
    MalformedEntry {
        method: String,
        header: String,
        rule: String,
    },
}

/// Collapse a list of rule strings into one rule.
///
/// Returns the new rule and whether it is looser than the list.
pub fn collapse_rules(rules: &[&str]) -> Result<(String, bool), String> {
    match rules {
        [] => Ok((String::new(), false)),
        [single] => Ok(((*single).to_string(), false)),
        many => {
            let mut marker = None;
            let mut patterns = Vec::with_capacity(many.len());
            for rule in many {
                let expr = RuleExpr::parse(rule).map_err(|_| (*rule).to_string())?;
                marker.get_or_insert(expr.marker);
                patterns.push(format!("(?:{})", expr.pattern));
            }
            let rule = format!(
                "{}{RULE_SEPARATOR}{}",
                marker.unwrap_or_default(),
                patterns.join("|")
            );
            Ok((rule, true))
        }
    }
}

/// Keys of the method map and the header rule map, spelled as the server
/// decodes them.
const METHOD_KEY: &str = "Method";
const HEADER_KEY: &str = "Header";

/// Rewrite every list-valued `Header` rule in `definition`.
///
/// Only touches `Method.<METHOD>.Header.<name>` entries whose value is an
/// array. Nothing is modified if any entry fails to migrate.
pub fn migrate_header_rules(definition: &mut Value) -> Result<Vec<Migration>, MigrationError> {
    let mut planned = Vec::new();

    let Some(methods) = definition.get(METHOD_KEY).and_then(Value::as_object) else {
        return Ok(planned);
    };

    for (method, context) in methods {
        let Some(headers) = context.get(HEADER_KEY).and_then(Value::as_object) else {
            continue;
        };
        for (header, value) in headers {
            let Some(list) = value.as_array() else {
                continue;
            };

            let mut rules = Vec::with_capacity(list.len());
            for (index, entry) in list.iter().enumerate() {
                let rule = entry.as_str().ok_or_else(|| MigrationError::NonStringEntry {
                    method: method.clone(),
                    header: header.clone(),
                    index,
                })?;
                rules.push(rule);
            }

            let (rule, loosened) =
                collapse_rules(&rules).map_err(|rule| MigrationError::MalformedEntry {
                    method: method.clone(),
                    header: header.clone(),
                    rule,
                })?;

            planned.push(Migration {
                method: method.clone(),
                header: header.clone(),
                rule,
                loosened,
            });
        }
    }

    for migration in &planned {
        if let Some(slot) = definition
            .get_mut(METHOD_KEY)
            .and_then(|m| m.get_mut(&migration.method))
            .and_then(|c| c.get_mut(HEADER_KEY))
            .and_then(|h| h.get_mut(&migration.header))
        {
            *slot = Value::String(migration.rule.clone());
        }
    }

    Ok(planned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::EndpointDefinition;
    use crate::rule::match_value;
    use serde_json::json;

    #[test]
    fn test_single_entry_collapses_to_itself() {
        let mut fixture = json!({"Method": {"GET": {"Header": {"Token": ["x|[0-9]+"]}}}});
        let migrations = migrate_header_rules(&mut fixture).unwrap();

        assert_eq!(
            migrations,
            vec![Migration {
                method: "GET".to_string(),
                header: "Token".to_string(),
                rule: "x|[0-9]+".to_string(),
                loosened: false,
            }]
        );
        assert_eq!(fixture["Method"]["GET"]["Header"]["Token"], json!("x|[0-9]+"));
    }

    #[test]
    fn test_many_entries_become_alternation() {
        let mut fixture =
            json!({"Method": {"GET": {"Header": {"Token": ["hex|[a-f]+", "num|[0-9]+"]}}}});
        let migrations = migrate_header_rules(&mut fixture).unwrap();

        assert!(migrations[0].loosened);
        let rule = fixture["Method"]["GET"]["Header"]["Token"]
            .as_str()
            .unwrap()
            .to_string();
        assert_eq!(rule, "hex|(?:[a-f]+)|(?:[0-9]+)");
        assert!(match_value("abc", &rule).unwrap());
        assert!(match_value("123", &rule).unwrap());
        assert!(!match_value("abc123", &rule).unwrap());
    }

    #[test]
    fn test_empty_list_becomes_empty_rule() {
        let mut fixture = json!({"Method": {"GET": {"Header": {"Token": []}}}});
        migrate_header_rules(&mut fixture).unwrap();
        assert_eq!(fixture["Method"]["GET"]["Header"]["Token"], json!(""));
    }

    #[test]
    fn test_migrated_fixture_decodes() {
        let mut fixture = json!({
            "Method": {
                "POST": {
                    "Header": {"Token": ["x|a", "x|b"], "Plain": "x|c"},
                    "Resp": {"ok": true}
                }
            }
        });
        assert!(EndpointDefinition::from_slice(fixture.to_string().as_bytes()).is_err());

        let migrations = migrate_header_rules(&mut fixture).unwrap();
        assert_eq!(migrations.len(), 1);

        let definition = EndpointDefinition::from_slice(fixture.to_string().as_bytes()).unwrap();
        let context = definition.context("POST").unwrap();
        assert_eq!(context.header_rules.get("Plain"), Some("x|c"));
        assert_eq!(context.header_rules.get("Token"), Some("x|(?:a)|(?:b)"));
    }

    #[test]
    fn test_non_string_entry_leaves_fixture_untouched() {
        let mut fixture = json!({"Method": {"GET": {"Header": {"A": ["x|1"], "B": ["x|1", 2]}}}});
        let before = fixture.clone();

        let err = migrate_header_rules(&mut fixture).unwrap_err();
        assert_eq!(
            err,
            MigrationError::NonStringEntry {
                method: "GET".to_string(),
                header: "B".to_string(),
                index: 1
            }
        );
        assert_eq!(fixture, before);
    }

    #[test]
    fn test_malformed_entry_in_list() {
        let mut fixture = json!({"Method": {"GET": {"Header": {"A": ["x|1", "oops"]}}}});
        assert!(matches!(
            migrate_header_rules(&mut fixture).unwrap_err(),
            MigrationError::MalformedEntry { ref rule, .. } if rule == "oops"
        ));
    }

    #[test]
    fn test_only_canonical_keys_are_migrated() {
        let mut fixture = json!({"method": {"GET": {"Header": {"Token": ["x|a", "x|b"]}}}});
        let before = fixture.clone();
        assert!(migrate_header_rules(&mut fixture).unwrap().is_empty());
        assert_eq!(fixture, before);

        let mut fixture = json!({"Method": {"GET": {"header": {"Token": ["x|a"]}}}});
        assert!(migrate_header_rules(&mut fixture).unwrap().is_empty());
    }

    #[test]
    fn test_canonical_fixture_is_unchanged() {
        let mut fixture = json!({"Method": {"GET": {"Header": {"A": "x|1"}}}});
        let before = fixture.clone();
        assert!(migrate_header_rules(&mut fixture).unwrap().is_empty());
        assert_eq!(fixture, before);
        assert!(migrate_header_rules(&mut json!([1, 2])).unwrap().is_empty());
    }
}
