//! Request and response specifications
//!
//! [`RequestSpec`] and [`ResponseSpec`] come from the pact document and describe
//! what the consumer expects. [`HttpRequest`] is what actually arrived at the
//! mock server; [`ObservedRequest`] stamps it with its arrival order.

use crate::query::{encode_query, QueryParams};
use crate::rules::MatchingRules;
use indexmap::IndexMap;
use serde_json::Value;

/// Header name to value mapping, insertion ordered
pub type Headers = IndexMap<String, String>;

/// Expected request of an interaction
///
/// Only `method` and `path` are mandatory. Absent optional fields place no
/// constraint on the observed request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    /// HTTP method, compared case-insensitively
    pub method: String,
    /// Request path
    pub path: String,
    /// Expected query parameters
    pub query: Option<QueryParams>,
    /// Expected headers (a required subset of the observed headers)
    pub headers: Option<Headers>,
    /// Expected body
    pub body: Option<Value>,
    /// Rules relaxing exact comparison for individual fields
    pub matching_rules: MatchingRules,
}

impl RequestSpec {
    /// Create a request spec with only method and path set
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        RequestSpec {
            method: method.into(),
            path: path.into(),
            query: None,
            headers: None,
            body: None,
            matching_rules: MatchingRules::default(),
        }
    }

    /// Set the expected query
    #[must_use]
    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = Some(query);
        self
    }

    /// Add one expected header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self
            .headers
            .get_or_insert_with(Headers::new)
            .insert(name.into(), value.into());
        self
    }

    /// Set the expected body
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the matching rules
    #[must_use]
    pub fn with_matching_rules(mut self, rules: MatchingRules) -> Self {
        self.matching_rules = rules;
        self
    }

    /// Encoded form of the expected query, if any
    pub fn query_string(&self) -> Option<String> {
        self.query
            .as_ref()
            .filter(|q| !q.is_empty())
            .map(encode_query)
    }
}

/// Canned response served when an interaction is matched
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSpec {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Headers,
    /// Response body
    pub body: Option<Value>,
}

impl Default for ResponseSpec {
    fn default() -> Self {
        ResponseSpec {
            status: 200,
            headers: Headers::new(),
            body: None,
        }
    }
}

impl ResponseSpec {
    /// Create a response with the given status and nothing else
    pub fn with_status(status: u16) -> Self {
        ResponseSpec {
            status,
            ..Default::default()
        }
    }

    /// Whether the response declares a `Content-Type` header
    pub fn has_content_type(&self) -> bool {
        self.headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case("content-type"))
    }
}

/// An HTTP request as received by the mock server
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpRequest {
    /// HTTP method
    pub method: String,
    /// Request path, without query
    pub path: String,
    /// Decoded query parameters
    pub query: QueryParams,
    /// Request headers; repeated headers are joined with `", "`
    pub headers: Headers,
    /// Request body: JSON when it parses as JSON, otherwise the raw text
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Create a request with the given method and path
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        HttpRequest {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the query parameters
    #[must_use]
    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    /// Add a header, joining with any existing value of the same name
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append_header(name.into(), value.into());
        self
    }

    /// Set a JSON body
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the body from raw bytes
    ///
    /// Empty input means no body. Input that parses as JSON is kept as JSON,
    /// anything else as a (lossily decoded) string.
    #[must_use]
    pub fn with_body_bytes(mut self, bytes: &[u8]) -> Self {
        self.body = body_from_bytes(bytes);
        self
    }

    /// Append a header value, joining repeated names with `", "`
    pub fn append_header(&mut self, name: String, value: String) {
        match self.headers.get_mut(&name) {
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            None => {
                let _ = self.headers.insert(name, value);
            }
        }
    }

    /// Look a header up by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Encoded form of the query, if non-empty
    pub fn query_string(&self) -> Option<String> {
        if self.query.is_empty() {
            None
        } else {
            Some(encode_query(&self.query))
        }
    }
}

fn body_from_bytes(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(String::from_utf8_lossy(bytes).into_owned())),
    }
}

/// A request captured by a running session, stamped with its arrival order
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedRequest {
    /// Monotonic sequence number within the session, starting at 0
    pub sequence: u64,
    /// The captured request
    pub request: HttpRequest,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_bytes_json() {
        let req = HttpRequest::new("POST", "/users").with_body_bytes(br#"{"name":"a"}"#);
        assert_eq!(req.body, Some(json!({"name": "a"})));
    }

    #[test]
    fn test_body_bytes_text_and_empty() {
        let req = HttpRequest::new("POST", "/").with_body_bytes(b"hello world");
        assert_eq!(req.body, Some(json!("hello world")));

        let req = HttpRequest::new("POST", "/").with_body_bytes(b"");
        assert_eq!(req.body, None);
    }

    #[test]
    fn test_repeated_headers_are_joined() {
        let req = HttpRequest::new("GET", "/")
            .with_header("accept", "text/html")
            .with_header("accept", "application/json");
        assert_eq!(req.header("Accept"), Some("text/html, application/json"));
    }

    #[test]
    fn test_request_spec_builders() {
        let spec = RequestSpec::new("GET", "/users")
            .with_query(crate::parse_query("active=true"))
            .with_header("Accept", "application/json");
        assert_eq!(spec.query_string().as_deref(), Some("active=true"));
        assert_eq!(
            spec.headers.as_ref().and_then(|h| h.get("Accept")).map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn test_response_content_type_lookup() {
        let mut response = ResponseSpec::with_status(201);
        assert!(!response.has_content_type());
        let _ = response
            .headers
            .insert("content-type".to_string(), "text/plain".to_string());
        assert!(response.has_content_type());
    }
}
