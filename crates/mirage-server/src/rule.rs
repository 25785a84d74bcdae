//! Rule expressions and their compiled form.
//!
//! A rule expression is a string of the form `<marker>|<pattern>`. The marker
//! is ignored; the pattern is a regular expression that must match the whole
//! value. All knowledge of this syntax lives in [`RuleExpr::parse`], so the
//! validators only ever ask "does this value satisfy this rule".

use crate::error::ValidationError;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

/// Separator between the marker and the pattern.
pub const RULE_SEPARATOR: char = '|';

/// A rule expression split into its two segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleExpr<'a> {
    /// Everything before the first `|`. Unused by matching.
    pub marker: &'a str,
    /// Everything after the first `|`.
    pub pattern: &'a str,
}

impl<'a> RuleExpr<'a> {
    /// Split a rule on its first `|`.
    pub fn parse(rule: &'a str) -> Result<Self, ValidationError> {
        match rule.split_once(RULE_SEPARATOR) {
            Some((marker, pattern)) => Ok(RuleExpr { marker, pattern }),
            None => Err(ValidationError::malformed_rule(
                rule,
                format!("expected `<marker>{RULE_SEPARATOR}<regex>`"),
            )),
        }
    }

    /// The pattern anchored at both ends.
    pub fn anchored(&self) -> String {
        format!("^(?:{})$", self.pattern)
    }

    /// Compile the anchored pattern.
    pub fn compile(&self, rule: &str) -> Result<Regex, ValidationError> {
        Regex::new(&self.anchored())
            .map_err(|e| ValidationError::malformed_rule(rule, e.to_string()))
    }
}

/// Parse and compile a rule expression.
pub fn compile_rule(rule: &str) -> Result<Regex, ValidationError> {
    RuleExpr::parse(rule)?.compile(rule)
}

/// Check a single value against a rule, compiling the rule on every call.
///
/// Returns `Ok(false)` on a pattern mismatch; the caller knows which field the
/// value came from and builds the error.
pub fn match_value(value: &str, rule: &str) -> Result<bool, ValidationError> {
    Ok(compile_rule(rule)?.is_match(value))
}

/// Memoized compiled rules, keyed by the full rule string.
///
/// Read-mostly. Nothing is evicted: every rule string seen since startup
/// stays compiled, including rules from fixtures that were edited since.
/// Entries are inserted whole under the write lock.
#[derive(Debug, Default)]
pub struct RuleCache {
    compiled: RwLock<HashMap<String, Arc<Regex>>>,
}

impl RuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiled form of `rule`, compiling and storing it on first use.
    pub fn compile(&self, rule: &str) -> Result<Arc<Regex>, ValidationError> {
        if let Some(regex) = self.compiled.read().get(rule) {
            return Ok(Arc::clone(regex));
        }

        let regex = Arc::new(compile_rule(rule)?);
        self.compiled
            .write()
            .entry(rule.to_string())
            .or_insert_with(|| Arc::clone(&regex));
        Ok(regex)
    }

    /// Same contract as [`match_value`], backed by the cache.
    pub fn matches(&self, rule: &str, value: &str) -> Result<bool, ValidationError> {
        Ok(self.compile(rule)?.is_match(value))
    }

    pub fn len(&self) -> usize {
        self.compiled.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.read().is_empty()
    }
}
