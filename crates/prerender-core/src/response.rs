//! Immutable response record.

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};

/// A response produced by the gateway or one of its collaborators.
///
/// Values are never mutated in place: every `with_*` method consumes the
/// response and returns a new one carrying the change.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl GatewayResponse {
    /// Create a new response.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Response body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Return a copy of this response with the given headers set, replacing
    /// any existing values under the same names. Status and body are kept.
    pub fn with_headers<'a, I>(self, extra: I) -> Self
    where
        I: IntoIterator<Item = (HeaderName, &'a str)>,
    {
        let mut headers = self.headers;
        for (name, value) in extra {
            // Invalid values are dropped, never fail the response.
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.insert(name, value);
            }
        }
        Self {
            status: self.status,
            headers,
            body: self.body,
        }
    }

    /// Return a copy of this response without a body (for HEAD).
    pub fn without_body(self) -> Self {
        Self {
            status: self.status,
            headers: self.headers,
            body: Vec::new(),
        }
    }

    /// Split into parts.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Vec<u8>) {
        (self.status, self.headers, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;

    fn html(content_type: &'static str, body: &str) -> GatewayResponse {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        GatewayResponse::new(StatusCode::OK, headers, body)
    }

    #[test]
    fn test_with_headers_keeps_status_and_body() {
        let original = GatewayResponse::new(StatusCode::NOT_FOUND, HeaderMap::new(), b"gone".to_vec());
        let annotated = original
            .clone()
            .with_headers([(HeaderName::from_static("x-worker"), "prerender-worker")]);

        assert_eq!(annotated.status(), StatusCode::NOT_FOUND);
        assert_eq!(annotated.body(), b"gone");
        assert_eq!(annotated.header("x-worker"), Some("prerender-worker"));
        assert_eq!(original.header("x-worker"), None);
    }

    #[test]
    fn test_with_headers_replaces_existing_value() {
        let response = html("text/plain", "hi")
            .with_headers([(CONTENT_TYPE, "text/html")]);
        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(response.headers().get_all(CONTENT_TYPE).iter().count(), 1);
    }

    #[test]
    fn test_without_body_keeps_headers() {
        let response = html("text/html; charset=utf-8", "<html></html>").without_body();
        assert!(response.body().is_empty());
        assert_eq!(response.header("content-type"), Some("text/html; charset=utf-8"));
    }
}
