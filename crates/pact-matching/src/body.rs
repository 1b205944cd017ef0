//! Recursive body comparison
//!
//! Walks the expected body and compares it against the observed one:
//!
//! - a key absent from the expectation places no constraint
//! - objects: every expected key must be present and match; extra observed
//!   keys are fine unless `allow_unexpected_keys` is off
//! - arrays: compared index by index up to the expected length
//! - scalars: exact equality, numbers compared by value
//!
//! A `type` rule switches to type-only comparison for the value it selects
//! and everything below it. Its length bounds apply to the selected array
//! only. Under a `type` rule, every observed array element
//! is checked, with expected elements beyond the first falling back to the
//! first one as a template. A `regex` rule applies to scalars only.

use crate::config::MatchConfig;
use pact_models::{DocPath, MatchingRule, MatchingRules};
use serde_json::{Number, Value};

/// One difference found in a body
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDiff {
    /// Location of the difference
    pub path: DocPath,
    /// Expected value at that location
    pub expected: Value,
    /// Observed value (`null` when missing)
    pub actual: Value,
    /// Human readable description
    pub message: String,
}

/// Compare an observed body against an expected one, collecting every
/// difference in traversal order
pub fn diff_bodies(
    expected: &Value,
    actual: &Value,
    rules: &MatchingRules,
    config: &MatchConfig,
) -> Vec<BodyDiff> {
    let mut walker = BodyWalker {
        rules,
        config,
        diffs: Vec::new(),
    };
    walker.compare(&DocPath::new("body"), expected, actual, None);
    walker.diffs
}

struct BodyWalker<'a> {
    rules: &'a MatchingRules,
    config: &'a MatchConfig,
    diffs: Vec<BodyDiff>,
}

impl<'a> BodyWalker<'a> {
    fn compare(
        &mut self,
        path: &DocPath,
        expected: &Value,
        actual: &Value,
        inherited: Option<&'a MatchingRule>,
    ) {
        let Some(rule) = self.rules.resolve(path).or(inherited) else {
            self.compare_values(path, expected, actual);
            return;
        };
        match rule {
            MatchingRule::Regex(regex) => match scalar_text(actual) {
                Some(text) if regex.is_match(&text) => {}
                _ => self.push(
                    path,
                    expected,
                    actual,
                    format!("Expected {actual} to match '{}'", regex.as_str()),
                ),
            },
            MatchingRule::Type { min, max } => {
                self.compare_types(path, expected, actual, rule.cascaded(), *min, *max);
            }
            MatchingRule::Equality => self.compare_values(path, expected, actual),
        }
    }

    fn compare_values(&mut self, path: &DocPath, expected: &Value, actual: &Value) {
        match (expected, actual) {
            (Value::Object(_), Value::Object(_)) => self.compare_objects(path, expected, actual, None),
            (Value::Array(expected_items), Value::Array(actual_items)) => {
                for (index, expected_item) in expected_items.iter().enumerate() {
                    let child = path.join_index(index);
                    match actual_items.get(index) {
                        Some(actual_item) => self.compare(&child, expected_item, actual_item, None),
                        None => self.push(
                            &child,
                            expected_item,
                            &Value::Null,
                            format!(
                                "Expected an item at index {index} but the array has {} item(s)",
                                actual_items.len()
                            ),
                        ),
                    }
                }
            }
            _ if type_name(expected) != type_name(actual) => self.push_type_mismatch(path, expected, actual),
            _ => {
                if !scalars_equal(expected, actual) {
                    self.push(
                        path,
                        expected,
                        actual,
                        format!("Expected {expected} but received {actual}"),
                    );
                }
            }
        }
    }

    fn compare_types(
        &mut self,
        path: &DocPath,
        expected: &Value,
        actual: &Value,
        inherited: Option<&'a MatchingRule>,
        min: Option<usize>,
        max: Option<usize>,
    ) {
        match (expected, actual) {
            (Value::Object(_), Value::Object(_)) => {
                self.compare_objects(path, expected, actual, inherited);
            }
            (Value::Array(expected_items), Value::Array(actual_items)) => {
                let len = actual_items.len();
                if let Some(min) = min.filter(|min| len < *min) {
                    self.push(
                        path,
                        expected,
                        actual,
                        format!("Expected at least {min} item(s) but received {len}"),
                    );
                }
                if let Some(max) = max.filter(|max| len > *max) {
                    self.push(
                        path,
                        expected,
                        actual,
                        format!("Expected at most {max} item(s) but received {len}"),
                    );
                }
                for (index, actual_item) in actual_items.iter().enumerate() {
                    let template = expected_items.get(index).or_else(|| expected_items.first());
                    if let Some(template) = template {
                        self.compare(&path.join_index(index), template, actual_item, inherited);
                    }
                }
            }
            _ if type_name(expected) != type_name(actual) => self.push_type_mismatch(path, expected, actual),
            _ => {}
        }
    }

    fn compare_objects(
        &mut self,
        path: &DocPath,
        expected: &Value,
        actual: &Value,
        inherited: Option<&'a MatchingRule>,
    ) {
        let (Value::Object(expected_map), Value::Object(actual_map)) = (expected, actual) else {
            return;
        };
        for (key, expected_value) in expected_map {
            let child = path.join_key(key);
            match actual_map.get(key) {
                Some(actual_value) => self.compare(&child, expected_value, actual_value, inherited),
                None => self.push(
                    &child,
                    expected_value,
                    &Value::Null,
                    format!("Expected key '{key}' but it was missing"),
                ),
            }
        }
        if !self.config.allow_unexpected_keys {
            for (key, actual_value) in actual_map {
                if !expected_map.contains_key(key) {
                    self.push(
                        &path.join_key(key),
                        &Value::Null,
                        actual_value,
                        format!("Unexpected key '{key}' received"),
                    );
                }
            }
        }
    }

    fn push_type_mismatch(&mut self, path: &DocPath, expected: &Value, actual: &Value) {
        self.push(
            path,
            expected,
            actual,
            format!(
                "Type mismatch: expected {} {expected} but received {} {actual}",
                type_name(expected),
                type_name(actual)
            ),
        );
    }

    fn push(&mut self, path: &DocPath, expected: &Value, actual: &Value, message: String) {
        self.diffs.push(BodyDiff {
            path: path.clone(),
            expected: expected.clone(),
            actual: actual.clone(),
            message,
        });
    }
}

/// JSON type name used in messages and type comparisons
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn scalars_equal(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        _ => expected == actual,
    }
}

#[allow(clippy::float_cmp)]
fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
