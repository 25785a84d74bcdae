//! Decoded endpoint definition types.

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// One endpoint definition file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EndpointDefinition {
    /// Context per HTTP method, keyed by the exact method string.
    #[serde(rename = "Method", default)]
    pub methods: HashMap<String, Arc<EndpointContext>>,
}

impl EndpointDefinition {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Exact, case-sensitive method lookup.
    pub fn context(&self, method: &str) -> Option<&Arc<EndpointContext>> {
        self.methods.get(method)
    }
}

/// Request rules and canned response for one method.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EndpointContext {
    #[serde(rename = "Header", default)]
    pub header_rules: RuleMap,

    #[serde(rename = "Query", default)]
    pub query_rules: RuleMap,

    /// Only the first value of each entry is sent.
    #[serde(rename = "resp_header", default)]
    pub response_headers: BTreeMap<String, Vec<String>>,

    /// Rule tree for the JSON body; `null` disables body validation.
    #[serde(rename = "Req", default)]
    pub body_rules: Value,

    #[serde(rename = "Resp", default)]
    pub response_body: Value,
}

/// Field name to rule expression, in declaration order.
///
/// Only the single-string form is accepted. A list of rules for one field is
/// the legacy form and is rejected with a pointer to the migration tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleMap(Vec<(String, String)>);

impl RuleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a rule; a replaced rule keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, rule: impl Into<String>) {
        let name = name.into();
        let rule = rule.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = rule,
            None => self.0.push((name, rule)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, rule)| rule.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, rule)| (name.as_str(), rule.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RuleMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = RuleMap::new();
        for (name, rule) in iter {
            map.insert(name, rule);
        }
        map
    }
}

impl Serialize for RuleMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for RuleMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RuleMapVisitor;

        impl<'de> Visitor<'de> for RuleMapVisitor {
            type Value = RuleMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping field names to rule strings")
            }

            fn visit_unit<E: de::Error>(self) -> Result<RuleMap, E> {
                Ok(RuleMap::new())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RuleMap, A::Error> {
                let mut rules = RuleMap::new();
                while let Some((name, value)) = access.next_entry::<String, Value>()? {
                    match value {
                        Value::String(rule) => rules.insert(name, rule),
                        Value::Array(_) => {
                            return Err(de::Error::custom(format!(
                                "rule for `{name}` uses the legacy list form; \
                                 run `mirage-lint --fix` to migrate it to a single rule string"
                            )))
                        }
                        other => {
                            return Err(de::Error::custom(format!(
                                "rule for `{name}` must be a string, found {other}"
                            )))
                        }
                    }
                }
                Ok(rules)
            }
        }

        deserializer.deserialize_any(RuleMapVisitor)
    }
}
