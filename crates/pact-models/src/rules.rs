//! Matching rules
//!
//! A pact request may carry a `matchingRules` table that relaxes the default
//! exact comparison for selected fields. Rules are keyed by path expressions
//! rooted at `$`, for example:
//!
//! ```text
//! $.path                     regex over the request path
//! $.query.active             one query parameter
//! $.headers.Accept           one header (name compared case-insensitively)
//! $.body.user.name           one body field
//! $.body.items[*].id         `id` of every element of `items`
//! ```
//!
//! Both the flat v2 layout and the nested v3 layout
//! (`{"body": {"$.name": {"matchers": [...]}}}`) are accepted and flattened into
//! one table. Regexes are compiled at load time so that matching never fails.

use crate::error::{PactModelError, PactModelResult};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// One step of a location inside a request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object key, header name, query parameter name or request part
    Key(String),
    /// Array index
    Index(usize),
}

/// Concrete location inside a request, e.g. `$.body.items[0].id`
///
/// The first segment names the request part (`path`, `query`, `headers`,
/// `body`); the rest locate a value inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DocPath {
    segments: Vec<PathSegment>,
}

impl DocPath {
    /// Path to a request part such as `body`
    pub fn new(part: &str) -> Self {
        DocPath {
            segments: vec![PathSegment::Key(part.to_string())],
        }
    }

    /// Child path for an object key
    #[must_use]
    pub fn join_key(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Key(key.to_string()));
        DocPath { segments }
    }

    /// Child path for an array index
    #[must_use]
    pub fn join_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        DocPath { segments }
    }

    /// All segments, request part first
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The request part this path points into
    pub fn part(&self) -> Option<&str> {
        match self.segments.first() {
            Some(PathSegment::Key(part)) => Some(part.as_str()),
            _ => None,
        }
    }

    /// Location relative to the request part: `name`, `items[0].id`, or `$`
    /// for the part itself
    pub fn field_path(&self) -> String {
        let rest = self.segments.get(1..).unwrap_or_default();
        if rest.is_empty() {
            return "$".to_string();
        }
        let mut out = String::new();
        for (i, segment) in rest.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if needs_quoting(key) => {
                    out.push_str(&format!("['{key}']"));
                }
                PathSegment::Key(key) => {
                    if i > 0 {
                        out.push('.');
                    }
                    out.push_str(key);
                }
                PathSegment::Index(index) => out.push_str(&format!("[{index}]")),
            }
        }
        out
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for segment in &self.segments {
            match segment {
                PathSegment::Key(key) if needs_quoting(key) => write!(f, "['{key}']")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

fn needs_quoting(key: &str) -> bool {
    key.is_empty() || key.contains(['.', '[', ']', '\'', ' '])
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RuleToken {
    Field(String),
    Index(usize),
    AnyField,
    AnyIndex,
}

/// Parsed rule path expression such as `$.body.items[*].id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulePath {
    expr: String,
    tokens: Vec<RuleToken>,
}

impl RulePath {
    /// Parse a rule path expression
    pub fn parse(expr: &str) -> PactModelResult<Self> {
        let rest = expr.strip_prefix('$').ok_or_else(|| {
            PactModelError::malformed(format!("matching rule path '{expr}' must start with '$'"))
        })?;
        let bad = |what: &str| {
            PactModelError::malformed(format!("matching rule path '{expr}': {what}"))
        };

        let chars: Vec<char> = rest.chars().collect();
        let mut tokens = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                '.' => {
                    i += 1;
                    if chars.get(i) == Some(&'*') {
                        tokens.push(RuleToken::AnyField);
                        i += 1;
                        continue;
                    }
                    let start = i;
                    while i < chars.len() && chars[i] != '.' && chars[i] != '[' {
                        i += 1;
                    }
                    if start == i {
                        return Err(bad("empty field name"));
                    }
                    tokens.push(RuleToken::Field(chars[start..i].iter().collect()));
                }
                '[' => {
                    let close = chars[i..]
                        .iter()
                        .position(|c| *c == ']')
                        .map(|offset| i + offset)
                        .ok_or_else(|| bad("unclosed '['"))?;
                    let inner: String = chars[i + 1..close].iter().collect();
                    tokens.push(parse_bracket(&inner).ok_or_else(|| bad("invalid index"))?);
                    i = close + 1;
                }
                other => return Err(bad(&format!("unexpected character '{other}'"))),
            }
        }

        // `$.header.X` is an accepted spelling of `$.headers.X`
        if let Some(RuleToken::Field(first)) = tokens.first_mut() {
            if first == "header" {
                *first = "headers".to_string();
            }
        }

        Ok(RulePath {
            expr: expr.to_string(),
            tokens,
        })
    }

    /// Path selecting one named header or query parameter
    ///
    /// Built from tokens, so the name may hold any character.
    pub fn named(part: &str, name: &str) -> Self {
        let part = if part == "header" { "headers" } else { part };
        RulePath {
            expr: format!("$.{part}['{name}']"),
            tokens: vec![
                RuleToken::Field(part.to_string()),
                RuleToken::Field(name.to_string()),
            ],
        }
    }

    /// The expression this path was parsed from
    pub fn as_str(&self) -> &str {
        &self.expr
    }

    /// Number of non-wildcard tokens; more specific paths weigh more
    pub fn weight(&self) -> usize {
        self.tokens
            .iter()
            .filter(|t| matches!(t, RuleToken::Field(_) | RuleToken::Index(_)))
            .count()
    }

    /// Whether this expression selects exactly the given location
    pub fn matches(&self, path: &DocPath) -> bool {
        let segments = path.segments();
        if self.tokens.len() != segments.len() {
            return false;
        }
        let case_insensitive = path.part() == Some("headers");
        self.tokens
            .iter()
            .zip(segments)
            .all(|(token, segment)| match (token, segment) {
                (RuleToken::Field(field), PathSegment::Key(key)) => {
                    if case_insensitive {
                        field.eq_ignore_ascii_case(key)
                    } else {
                        field == key
                    }
                }
                (RuleToken::AnyField, PathSegment::Key(_))
                | (RuleToken::AnyIndex, PathSegment::Index(_)) => true,
                (RuleToken::Index(expected), PathSegment::Index(actual)) => expected == actual,
                _ => false,
            })
    }
}

fn parse_bracket(inner: &str) -> Option<RuleToken> {
    let inner = inner.trim();
    if inner == "*" {
        return Some(RuleToken::AnyIndex);
    }
    if let Ok(index) = inner.parse::<usize>() {
        return Some(RuleToken::Index(index));
    }
    let quoted = inner
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')))?;
    Some(RuleToken::Field(quoted.to_string()))
}

impl FromStr for RulePath {
    type Err = PactModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RulePath::parse(s)
    }
}

impl fmt::Display for RulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

/// How a single field is compared
#[derive(Debug, Clone)]
pub enum MatchingRule {
    /// Exact value comparison (the default)
    Equality,
    /// Only the JSON type must agree; for arrays, optional length bounds
    Type {
        /// Minimum array length
        min: Option<usize>,
        /// Maximum array length
        max: Option<usize>,
    },
    /// The actual value rendered as a string must match the regex
    Regex(Regex),
}

impl PartialEq for MatchingRule {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MatchingRule::Equality, MatchingRule::Equality) => true,
            (
                MatchingRule::Type { min, max },
                MatchingRule::Type {
                    min: other_min,
                    max: other_max,
                },
            ) => min == other_min && max == other_max,
            (MatchingRule::Regex(a), MatchingRule::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

static CASCADED_TYPE: MatchingRule = MatchingRule::Type {
    min: None,
    max: None,
};

impl MatchingRule {
    /// Compile a regex rule
    pub fn regex(pattern: &str) -> PactModelResult<Self> {
        Regex::new(pattern)
            .map(MatchingRule::Regex)
            .map_err(|e| PactModelError::malformed(format!("invalid regex '{pattern}': {e}")))
    }

    /// Type rule without length bounds
    pub fn type_only() -> Self {
        MatchingRule::Type {
            min: None,
            max: None,
        }
    }

    /// The rule inherited by the children of the value this rule applies to
    ///
    /// Type matching cascades; length bounds stay with the array they name.
    pub fn cascaded(&self) -> Option<&'static MatchingRule> {
        match self {
            MatchingRule::Type { .. } => Some(&CASCADED_TYPE),
            MatchingRule::Equality | MatchingRule::Regex(_) => None,
        }
    }

    fn from_json(expr: &str, value: &Value) -> PactModelResult<Self> {
        let obj = value.as_object().ok_or_else(|| {
            PactModelError::malformed(format!("matching rule for '{expr}' must be an object"))
        })?;

        if let Some(matchers) = obj.get("matchers") {
            let first = matchers
                .as_array()
                .and_then(|list| list.first())
                .ok_or_else(|| {
                    PactModelError::malformed(format!(
                        "matching rule for '{expr}' has an empty 'matchers' list"
                    ))
                })?;
            return MatchingRule::from_json(expr, first);
        }

        let bound = |key: &str| {
            obj.get(key)
                .and_then(Value::as_u64)
                .and_then(|n| usize::try_from(n).ok())
        };
        let regex = || {
            obj.get("regex").and_then(Value::as_str).ok_or_else(|| {
                PactModelError::malformed(format!("regex rule for '{expr}' needs a 'regex' string"))
            })
        };

        match obj.get("match").and_then(Value::as_str) {
            Some("type") => Ok(MatchingRule::Type {
                min: bound("min"),
                max: bound("max"),
            }),
            Some("regex") => MatchingRule::regex(regex()?),
            Some("equality") => Ok(MatchingRule::Equality),
            Some(other) => Err(PactModelError::malformed(format!(
                "unsupported matcher '{other}' for '{expr}'"
            ))),
            None if obj.contains_key("regex") => MatchingRule::regex(regex()?),
            None if obj.contains_key("min") || obj.contains_key("max") => Ok(MatchingRule::Type {
                min: bound("min"),
                max: bound("max"),
            }),
            None => Err(PactModelError::malformed(format!(
                "matching rule for '{expr}' does not name a matcher"
            ))),
        }
    }
}

/// Table of matching rules for one request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchingRules {
    entries: Vec<(RulePath, MatchingRule)>,
}

impl MatchingRules {
    /// Empty rule table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule
    pub fn insert(&mut self, path: RulePath, rule: MatchingRule) {
        self.entries.push((path, rule));
    }

    /// Builder form of [`MatchingRules::insert`]
    pub fn with_rule(mut self, expr: &str, rule: MatchingRule) -> PactModelResult<Self> {
        self.insert(RulePath::parse(expr)?, rule);
        Ok(self)
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most specific rule selecting `path`; the first one wins a tie
    pub fn resolve(&self, path: &DocPath) -> Option<&MatchingRule> {
        let mut best: Option<(usize, &MatchingRule)> = None;
        for (rule_path, rule) in &self.entries {
            if !rule_path.matches(path) {
                continue;
            }
            let weight = rule_path.weight();
            if best.map_or(true, |(best_weight, _)| weight > best_weight) {
                best = Some((weight, rule));
            }
        }
        best.map(|(_, rule)| rule)
    }

    /// Load a `matchingRules` JSON object, flat (v2) or nested by part (v3)
    pub fn from_json(value: &Value) -> PactModelResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| PactModelError::malformed("matchingRules must be an object"))?;

        let mut rules = MatchingRules::new();
        for (key, rule) in obj {
            if key.starts_with('$') {
                rules.insert(RulePath::parse(key)?, MatchingRule::from_json(key, rule)?);
                continue;
            }
            match key.as_str() {
                "path" => {
                    rules.insert(RulePath::parse("$.path")?, MatchingRule::from_json(key, rule)?);
                }
                "body" => {
                    for (sub, sub_rule) in nested_object(key, rule)? {
                        let tail = sub.strip_prefix('$').unwrap_or(sub);
                        let expr = format!("$.body{tail}");
                        rules.insert(RulePath::parse(&expr)?, MatchingRule::from_json(&expr, sub_rule)?);
                    }
                }
                "header" | "headers" | "query" => {
                    let part = if key == "query" { "query" } else { "headers" };
                    for (name, sub_rule) in nested_object(key, rule)? {
                        let path = RulePath::named(part, name);
                        let parsed = MatchingRule::from_json(path.as_str(), sub_rule)?;
                        rules.insert(path, parsed);
                    }
                }
                other => {
                    return Err(PactModelError::malformed(format!(
                        "unknown matchingRules category '{other}'"
                    )))
                }
            }
        }
        Ok(rules)
    }
}

fn nested_object<'a>(
    key: &str,
    value: &'a Value,
) -> PactModelResult<impl Iterator<Item = (&'a String, &'a Value)>> {
    value.as_object().map(|obj| obj.iter()).ok_or_else(|| {
        PactModelError::malformed(format!("matchingRules.{key} must be an object"))
    })
}
