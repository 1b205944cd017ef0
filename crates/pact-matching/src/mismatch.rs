//! Mismatch records
//!
//! The JSON shape is what calling tooling consumes:
//!
//! ```json
//! {
//!   "type": "body-mismatch",
//!   "request": {"method": "POST", "path": "/users", "body": {"name": "b"}},
//!   "details": {"path": "name", "expected": "a", "actual": "b", "mismatch": "..."}
//! }
//! ```

use pact_models::{Headers, HttpRequest, RequestSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Classification of a discrepancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MismatchType {
    /// An interaction never received a request
    MissingRequest,
    /// A request matched no interaction's method and path
    UnexpectedRequest,
    /// HTTP method differs
    MethodMismatch,
    /// Path differs
    PathMismatch,
    /// Query parameter missing, different or unexpected
    QueryMismatch,
    /// Header missing or different
    HeaderMismatch,
    /// Body differs
    BodyMismatch,
}

impl MismatchType {
    /// Wire name, e.g. `body-mismatch`
    pub fn as_str(self) -> &'static str {
        match self {
            MismatchType::MissingRequest => "missing-request",
            MismatchType::UnexpectedRequest => "unexpected-request",
            MismatchType::MethodMismatch => "method-mismatch",
            MismatchType::PathMismatch => "path-mismatch",
            MismatchType::QueryMismatch => "query-mismatch",
            MismatchType::HeaderMismatch => "header-mismatch",
            MismatchType::BodyMismatch => "body-mismatch",
        }
    }

    /// Whether this is a field-level content mismatch
    pub fn is_content(self) -> bool {
        !matches!(
            self,
            MismatchType::MissingRequest | MismatchType::UnexpectedRequest
        )
    }
}

impl fmt::Display for MismatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The request a mismatch refers to: the expected one for missing requests,
/// the observed one otherwise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MismatchRequest {
    /// HTTP method
    pub method: String,
    /// Request path
    pub path: String,
    /// Encoded query string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Headers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,
    /// Body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl From<&RequestSpec> for MismatchRequest {
    fn from(spec: &RequestSpec) -> Self {
        MismatchRequest {
            method: spec.method.clone(),
            path: spec.path.clone(),
            query: spec.query_string(),
            headers: spec.headers.clone().filter(|h| !h.is_empty()),
            body: spec.body.clone(),
        }
    }
}

impl From<&HttpRequest> for MismatchRequest {
    fn from(request: &HttpRequest) -> Self {
        MismatchRequest {
            method: request.method.clone(),
            path: request.path.clone(),
            query: request.query_string(),
            headers: Some(request.headers.clone()).filter(|h| !h.is_empty()),
            body: request.body.clone(),
        }
    }
}

/// Where and how a content mismatch differs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MismatchDetails {
    /// Location within the request part: a body path such as `user.name`,
    /// a query parameter or a header name. Absent for method and path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Expected value (`null` when nothing was expected)
    pub expected: Value,
    /// Actual value (`null` when missing)
    pub actual: Value,
    /// Human readable description
    pub mismatch: String,
}

/// A typed discrepancy between expected and observed traffic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mismatch {
    /// Classification
    #[serde(rename = "type")]
    pub kind: MismatchType,
    /// Request involved
    pub request: MismatchRequest,
    /// Field-level details, for content mismatches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<MismatchDetails>,
}

impl Mismatch {
    /// An interaction that never received a request
    pub fn missing_request(expected: &RequestSpec) -> Self {
        Mismatch {
            kind: MismatchType::MissingRequest,
            request: expected.into(),
            details: None,
        }
    }

    /// A request no interaction was registered for
    pub fn unexpected_request(observed: &HttpRequest) -> Self {
        Mismatch {
            kind: MismatchType::UnexpectedRequest,
            request: observed.into(),
            details: None,
        }
    }

    /// A content mismatch on an observed request
    pub fn content(kind: MismatchType, request: MismatchRequest, details: MismatchDetails) -> Self {
        Mismatch {
            kind,
            request,
            details: Some(details),
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind, self.request.method, self.request.path)?;
        if let Some(query) = &self.request.query {
            write!(f, "?{query}")?;
        }
        if let Some(details) = &self.details {
            match &details.path {
                Some(path) => write!(f, ": [{path}] {}", details.mismatch)?,
                None => write!(f, ": {}", details.mismatch)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pact_models::parse_query;
    use serde_json::json;

    #[test]
    fn test_type_wire_names() {
        assert_eq!(
            serde_json::to_value(MismatchType::UnexpectedRequest).unwrap(),
            json!("unexpected-request")
        );
        assert_eq!(MismatchType::BodyMismatch.to_string(), "body-mismatch");
        assert!(MismatchType::QueryMismatch.is_content());
        assert!(!MismatchType::MissingRequest.is_content());
    }

    #[test]
    fn test_missing_request_shape() {
        let spec = RequestSpec::new("GET", "/users").with_query(parse_query("active=true"));
        let value = serde_json::to_value(Mismatch::missing_request(&spec)).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "missing-request",
                "request": {"method": "GET", "path": "/users", "query": "active=true"}
            })
        );
    }

    #[test]
    fn test_content_shape_and_display() {
        let observed = HttpRequest::new("POST", "/users").with_body(json!({"name": "b"}));
        let mismatch = Mismatch::content(
            MismatchType::BodyMismatch,
            (&observed).into(),
            MismatchDetails {
                path: Some("name".to_string()),
                expected: json!("a"),
                actual: json!("b"),
                mismatch: "Expected \"a\" but received \"b\"".to_string(),
            },
        );
        let value = serde_json::to_value(&mismatch).unwrap();
        assert_eq!(value["type"], "body-mismatch");
        assert_eq!(value["request"]["body"], json!({"name": "b"}));
        assert_eq!(value["details"]["path"], "name");
        assert_eq!(
            mismatch.to_string(),
            "body-mismatch POST /users: [name] Expected \"a\" but received \"b\""
        );

        let back: Mismatch = serde_json::from_value(value).unwrap();
        assert_eq!(back, mismatch);
    }
}
