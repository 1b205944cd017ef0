//! HTTP request handlers

use crate::session::{MockSession, RouteResult};
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use pact_models::{parse_query, HttpRequest, ResponseSpec};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

/// Shared state handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    /// Session the listener serves
    pub session: Arc<MockSession>,
}

impl AppState {
    /// Create application state for a session
    pub fn new(session: Arc<MockSession>) -> Self {
        Self { session }
    }
}

/// Catch-all handler: every request is routed against the pact
pub async fn mock_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = to_http_request(&method, &uri, &headers, &body);
    match state.session.route(request) {
        RouteResult::Matched { response, .. } => render_response(&response),
        RouteResult::Mismatched { mismatches, .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "request-mismatch",
                "mismatches": mismatches,
            })),
        )
            .into_response(),
        RouteResult::Unexpected { mismatch } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "unexpected-request",
                "request": mismatch.request,
            })),
        )
            .into_response(),
    }
}

/// Capture an inbound request in matcher form
pub fn to_http_request(method: &Method, uri: &Uri, headers: &HeaderMap, body: &[u8]) -> HttpRequest {
    let mut request = HttpRequest::new(method.as_str(), uri.path())
        .with_query(uri.query().map(parse_query).unwrap_or_default())
        .with_body_bytes(body);
    for (name, value) in headers {
        let value = match value.to_str() {
            Ok(text) => text.to_string(),
            Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
        };
        request.append_header(name.as_str().to_string(), value);
    }
    request
}

/// Build the canned HTTP response for an interaction
pub fn render_response(spec: &ResponseSpec) -> Response {
    let status = StatusCode::from_u16(spec.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut headers = HeaderMap::new();
    for (name, value) in &spec.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => warn!(header = %name, "skipping invalid response header"),
        }
    }

    let body = match &spec.body {
        None => Body::empty(),
        Some(Value::String(text)) => Body::from(text.clone()),
        Some(value) => {
            if !spec.has_content_type() {
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            Body::from(value.to_string())
        }
    };

    (status, headers, body).into_response()
}
