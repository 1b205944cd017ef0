//! Field-by-field request matcher

use crate::body::diff_bodies;
use crate::config::{MatchConfig, QueryMatching};
use crate::mismatch::{Mismatch, MismatchDetails, MismatchRequest, MismatchType};
use pact_models::{DocPath, HttpRequest, MatchingRule, RequestSpec};
use serde_json::Value;

/// Compare an observed request with an expected one
///
/// Returns every discrepancy found, in field order. An empty list means the
/// request fully satisfies the expectation.
pub fn match_request(
    observed: &HttpRequest,
    expected: &RequestSpec,
    config: &MatchConfig,
) -> Vec<Mismatch> {
    let mut ctx = MatchContext {
        observed,
        expected,
        config,
        request: observed.into(),
        mismatches: Vec::new(),
    };
    ctx.match_method();
    ctx.match_path();
    ctx.match_query();
    ctx.match_headers();
    ctx.match_body();
    ctx.mismatches
}

/// Routing pre-filter: whether method and path both match
///
/// Path matching honours a `$.path` rule, so a regex path still routes.
pub fn matches_route(observed: &HttpRequest, expected: &RequestSpec) -> bool {
    method_matches(observed, expected) && path_matches(observed, expected)
}

fn method_matches(observed: &HttpRequest, expected: &RequestSpec) -> bool {
    observed.method.eq_ignore_ascii_case(&expected.method)
}

fn path_matches(observed: &HttpRequest, expected: &RequestSpec) -> bool {
    match expected.matching_rules.resolve(&DocPath::new("path")) {
        Some(MatchingRule::Regex(regex)) => regex.is_match(&observed.path),
        Some(MatchingRule::Type { .. }) => true,
        Some(MatchingRule::Equality) | None => observed.path == expected.path,
    }
}

struct MatchContext<'a> {
    observed: &'a HttpRequest,
    expected: &'a RequestSpec,
    config: &'a MatchConfig,
    request: MismatchRequest,
    mismatches: Vec<Mismatch>,
}

impl MatchContext<'_> {
    fn push(
        &mut self,
        kind: MismatchType,
        path: Option<String>,
        expected: Value,
        actual: Value,
        message: String,
    ) {
        self.mismatches.push(Mismatch::content(
            kind,
            self.request.clone(),
            MismatchDetails {
                path,
                expected,
                actual,
                mismatch: message,
            },
        ));
    }

    fn match_method(&mut self) {
        let (observed, expected) = (self.observed, self.expected);
        if !method_matches(observed, expected) {
            self.push(
                MismatchType::MethodMismatch,
                None,
                Value::String(expected.method.clone()),
                Value::String(observed.method.clone()),
                format!(
                    "Expected method {} but received {}",
                    expected.method.to_uppercase(),
                    observed.method.to_uppercase()
                ),
            );
        }
    }

    fn match_path(&mut self) {
        let (observed, expected) = (self.observed, self.expected);
        if path_matches(observed, expected) {
            return;
        }
        let message = match expected.matching_rules.resolve(&DocPath::new("path")) {
            Some(MatchingRule::Regex(regex)) => format!(
                "Expected path '{}' to match '{}'",
                observed.path,
                regex.as_str()
            ),
            _ => format!(
                "Expected path '{}' but received '{}'",
                expected.path, observed.path
            ),
        };
        self.push(
            MismatchType::PathMismatch,
            None,
            Value::String(expected.path.clone()),
            Value::String(observed.path.clone()),
            message,
        );
    }

    fn match_query(&mut self) {
        let (observed, expected) = (self.observed, self.expected);
        let Some(expected_query) = &expected.query else {
            return;
        };
        let observed_query = &observed.query;

        for (key, expected_values) in expected_query {
            let rule_path = DocPath::new("query").join_key(key);
            let Some(actual_values) = observed_query.get(key) else {
                self.push(
                    MismatchType::QueryMismatch,
                    Some(key.clone()),
                    values_json(expected_values),
                    Value::Null,
                    format!("Expected query parameter '{key}' but was missing"),
                );
                continue;
            };

            let message = match expected.matching_rules.resolve(&rule_path) {
                Some(MatchingRule::Regex(regex)) => actual_values
                    .iter()
                    .find(|value| !regex.is_match(value))
                    .map(|value| {
                        format!(
                            "Expected '{value}' for query parameter '{key}' to match '{}'",
                            regex.as_str()
                        )
                    }),
                Some(MatchingRule::Type { .. }) => None,
                Some(MatchingRule::Equality) | None => (actual_values != expected_values).then(|| {
                    format!(
                        "Expected {} for query parameter '{key}' but received {}",
                        values_json(expected_values),
                        values_json(actual_values)
                    )
                }),
            };
            if let Some(message) = message {
                self.push(
                    MismatchType::QueryMismatch,
                    Some(key.clone()),
                    values_json(expected_values),
                    values_json(actual_values),
                    message,
                );
            }
        }

        if self.config.query == QueryMatching::Strict {
            for (key, actual_values) in observed_query {
                if !expected_query.contains_key(key) {
                    self.push(
                        MismatchType::QueryMismatch,
                        Some(key.clone()),
                        Value::Null,
                        values_json(actual_values),
                        format!("Unexpected query parameter '{key}' received"),
                    );
                }
            }
        }
    }

    fn match_headers(&mut self) {
        let (observed, expected) = (self.observed, self.expected);
        let Some(expected_headers) = &expected.headers else {
            return;
        };
        for (name, expected_value) in expected_headers {
            let Some(actual_value) = observed.header(name) else {
                self.push(
                    MismatchType::HeaderMismatch,
                    Some(name.clone()),
                    Value::String(expected_value.clone()),
                    Value::Null,
                    format!("Expected header '{name}' but was missing"),
                );
                continue;
            };

            let rule_path = DocPath::new("headers").join_key(name);
            let message = match expected.matching_rules.resolve(&rule_path) {
                Some(MatchingRule::Regex(regex)) => (!regex.is_match(actual_value)).then(|| {
                    format!(
                        "Expected header '{name}' value '{actual_value}' to match '{}'",
                        regex.as_str()
                    )
                }),
                Some(MatchingRule::Type { .. }) => None,
                // surrounding whitespace is not part of a field value
                Some(MatchingRule::Equality) | None => {
                    (actual_value.trim() != expected_value.trim()).then(|| {
                        format!(
                            "Expected header '{name}' to have value '{expected_value}' but was '{actual_value}'"
                        )
                    })
                }
            };
            if let Some(message) = message {
                self.push(
                    MismatchType::HeaderMismatch,
                    Some(name.clone()),
                    Value::String(expected_value.clone()),
                    Value::String(actual_value.to_string()),
                    message,
                );
            }
        }
    }

    fn match_body(&mut self) {
        let (observed, expected) = (self.observed, self.expected);
        let Some(expected_body) = &expected.body else {
            return;
        };
        let Some(actual_body) = &observed.body else {
            self.push(
                MismatchType::BodyMismatch,
                Some("$".to_string()),
                expected_body.clone(),
                Value::Null,
                "Expected a body but none was received".to_string(),
            );
            return;
        };
        let diffs = diff_bodies(
            expected_body,
            actual_body,
            &expected.matching_rules,
            self.config,
        );
        for diff in diffs {
            self.push(
                MismatchType::BodyMismatch,
                Some(diff.path.field_path()),
                diff.expected,
                diff.actual,
                diff.message,
            );
        }
    }
}

fn values_json(values: &[String]) -> Value {
    match values {
        [single] => Value::String(single.clone()),
        many => Value::Array(many.iter().cloned().map(Value::String).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pact_models::{parse_query, MatchingRules};
    use serde_json::json;

    fn kinds(mismatches: &[Mismatch]) -> Vec<MismatchType> {
        mismatches.iter().map(|m| m.kind).collect()
    }

    fn detail_path(mismatch: &Mismatch) -> Option<&str> {
        mismatch.details.as_ref().and_then(|d| d.path.as_deref())
    }

    #[test]
    fn test_verbatim_request_matches() {
        let expected = RequestSpec::new("POST", "/users")
            .with_query(parse_query("a=1&b=2"))
            .with_header("Content-Type", "application/json")
            .with_body(json!({"name": "a", "tags": ["x"]}));
        let observed = HttpRequest::new("POST", "/users")
            .with_query(parse_query("a=1&b=2"))
            .with_header("content-type", "application/json")
            .with_body(json!({"name": "a", "tags": ["x"]}));
        assert!(match_request(&observed, &expected, &MatchConfig::default()).is_empty());
    }

    #[test]
    fn test_method_is_case_insensitive() {
        let expected = RequestSpec::new("get", "/users");
        let observed = HttpRequest::new("GET", "/users");
        assert!(match_request(&observed, &expected, &MatchConfig::default()).is_empty());

        let observed = HttpRequest::new("PUT", "/users");
        let mismatches = match_request(&observed, &expected, &MatchConfig::default());
        assert_eq!(kinds(&mismatches), vec![MismatchType::MethodMismatch]);
    }

    #[test]
    fn test_path_mismatch_and_regex_rule() {
        let expected = RequestSpec::new("GET", "/users/1");
        let observed = HttpRequest::new("GET", "/users/2");
        let mismatches = match_request(&observed, &expected, &MatchConfig::default());
        assert_eq!(kinds(&mismatches), vec![MismatchType::PathMismatch]);
        assert!(!matches_route(&observed, &expected));

        let expected = expected.with_matching_rules(
            MatchingRules::new()
                .with_rule("$.path", MatchingRule::regex("^/users/\\d+$").unwrap())
                .unwrap(),
        );
        assert!(matches_route(&observed, &expected));
        assert!(match_request(&observed, &expected, &MatchConfig::default()).is_empty());
    }

    #[test]
    fn test_missing_query_parameter() {
        let expected = RequestSpec::new("GET", "/users").with_query(parse_query("active=true"));
        let observed = HttpRequest::new("GET", "/users");
        let mismatches = match_request(&observed, &expected, &MatchConfig::default());
        assert_eq!(kinds(&mismatches), vec![MismatchType::QueryMismatch]);
        assert_eq!(detail_path(&mismatches[0]), Some("active"));
        let details = mismatches[0].details.as_ref().unwrap();
        assert_eq!(details.expected, json!("true"));
        assert_eq!(details.actual, Value::Null);
    }

    #[test]
    fn test_query_subset_and_strict() {
        let expected = RequestSpec::new("GET", "/users").with_query(parse_query("active=true"));
        let observed = HttpRequest::new("GET", "/users").with_query(parse_query("active=true&page=2"));
        assert!(match_request(&observed, &expected, &MatchConfig::default()).is_empty());

        let mismatches = match_request(&observed, &expected, &MatchConfig::strict_query());
        assert_eq!(kinds(&mismatches), vec![MismatchType::QueryMismatch]);
        assert_eq!(detail_path(&mismatches[0]), Some("page"));
    }

    #[test]
    fn test_query_value_differs() {
        let expected = RequestSpec::new("GET", "/users").with_query(parse_query("tag=a&tag=b"));
        let observed = HttpRequest::new("GET", "/users").with_query(parse_query("tag=b&tag=a"));
        let mismatches = match_request(&observed, &expected, &MatchConfig::default());
        assert_eq!(kinds(&mismatches), vec![MismatchType::QueryMismatch]);
        let details = mismatches[0].details.as_ref().unwrap();
        assert_eq!(details.expected, json!(["a", "b"]));
        assert_eq!(details.actual, json!(["b", "a"]));
    }

    #[test]
    fn test_query_regex_rule() {
        let expected = RequestSpec::new("GET", "/items")
            .with_query(parse_query("page=1"))
            .with_matching_rules(
                MatchingRules::new()
                    .with_rule("$.query.page", MatchingRule::regex("^\\d+$").unwrap())
                    .unwrap(),
            );
        let ok = HttpRequest::new("GET", "/items").with_query(parse_query("page=42"));
        let bad = HttpRequest::new("GET", "/items").with_query(parse_query("page=last"));
        assert!(match_request(&ok, &expected, &MatchConfig::default()).is_empty());
        assert_eq!(match_request(&bad, &expected, &MatchConfig::default()).len(), 1);
    }

    #[test]
    fn test_headers_subset_case_insensitive_names() {
        let expected = RequestSpec::new("GET", "/").with_header("Accept", "application/json");
        let observed = HttpRequest::new("GET", "/")
            .with_header("accept", "application/json")
            .with_header("user-agent", "test");
        assert!(match_request(&observed, &expected, &MatchConfig::default()).is_empty());

        let observed = HttpRequest::new("GET", "/").with_header("accept", "Application/JSON");
        let mismatches = match_request(&observed, &expected, &MatchConfig::default());
        assert_eq!(kinds(&mismatches), vec![MismatchType::HeaderMismatch]);
        assert_eq!(detail_path(&mismatches[0]), Some("Accept"));

        let observed = HttpRequest::new("GET", "/");
        let mismatches = match_request(&observed, &expected, &MatchConfig::default());
        assert_eq!(kinds(&mismatches), vec![MismatchType::HeaderMismatch]);
    }

    #[test]
    fn test_header_values_ignore_surrounding_whitespace_only() {
        let expected = RequestSpec::new("GET", "/").with_header("X-Token", "a");
        let observed = HttpRequest::new("GET", "/").with_header("x-token", " a ");
        assert!(match_request(&observed, &expected, &MatchConfig::default()).is_empty());

        for value in ["A", "a b", "ab"] {
            let observed = HttpRequest::new("GET", "/").with_header("x-token", value);
            let mismatches = match_request(&observed, &expected, &MatchConfig::default());
            assert_eq!(kinds(&mismatches), vec![MismatchType::HeaderMismatch], "value {value:?}");
        }
    }

    #[test]
    fn test_body_single_leaf() {
        let expected = RequestSpec::new("POST", "/users").with_body(json!({"name": "a"}));
        let observed = HttpRequest::new("POST", "/users").with_body(json!({"name": "b"}));
        let mismatches = match_request(&observed, &expected, &MatchConfig::default());
        assert_eq!(kinds(&mismatches), vec![MismatchType::BodyMismatch]);
        let details = mismatches[0].details.as_ref().unwrap();
        assert_eq!(details.path.as_deref(), Some("name"));
        assert_eq!(details.expected, json!("a"));
        assert_eq!(details.actual, json!("b"));
        assert_eq!(mismatches[0].request.body, Some(json!({"name": "b"})));
    }

    #[test]
    fn test_missing_body() {
        let expected = RequestSpec::new("POST", "/users").with_body(json!({"name": "a"}));
        let observed = HttpRequest::new("POST", "/users");
        let mismatches = match_request(&observed, &expected, &MatchConfig::default());
        assert_eq!(kinds(&mismatches), vec![MismatchType::BodyMismatch]);
        assert_eq!(detail_path(&mismatches[0]), Some("$"));
    }

    #[test]
    fn test_absent_expectations_are_unconstrained() {
        let expected = RequestSpec::new("POST", "/users");
        let observed = HttpRequest::new("POST", "/users")
            .with_query(parse_query("x=1"))
            .with_header("x-anything", "1")
            .with_body(json!({"whatever": true}));
        assert!(match_request(&observed, &expected, &MatchConfig::default()).is_empty());
    }

    #[test]
    fn test_all_mismatches_collected_in_field_order() {
        let expected = RequestSpec::new("POST", "/a")
            .with_query(parse_query("q=1"))
            .with_header("X-Key", "k")
            .with_body(json!({"n": 1}));
        let observed = HttpRequest::new("PUT", "/b").with_body(json!({"n": 2}));
        let mismatches = match_request(&observed, &expected, &MatchConfig::default());
        assert_eq!(
            kinds(&mismatches),
            vec![
                MismatchType::MethodMismatch,
                MismatchType::PathMismatch,
                MismatchType::QueryMismatch,
                MismatchType::HeaderMismatch,
                MismatchType::BodyMismatch,
            ]
        );
    }
}
