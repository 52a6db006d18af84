//! Inbound request view.

use http::header::{HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use http::{HeaderMap, Method, Uri};

use crate::context::{RequestId, REQUEST_ID_HEADER};
use crate::error::CoreError;

/// The request being handled by the gateway.
///
/// Built once at ingress with the `with_*` methods and read-only afterwards.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    id: RequestId,
    method: Method,
    url: String,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl IncomingRequest {
    /// Create a request from a method and an absolute URL.
    pub fn new(method: Method, url: impl Into<String>) -> Result<Self, CoreError> {
        let url = url.into();
        let uri: Uri = url.parse().map_err(|e: http::uri::InvalidUri| CoreError::InvalidUrl {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(CoreError::InvalidUrl {
                url,
                reason: "expected an absolute URL".to_string(),
            });
        }

        Ok(Self {
            id: RequestId::generate(),
            method,
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            url,
            headers: HeaderMap::new(),
            body: Vec::new(),
        })
    }

    /// Create a GET request (mostly for tests and tooling).
    pub fn get(url: impl Into<String>) -> Result<Self, CoreError> {
        Self::new(Method::GET, url)
    }

    /// Append a header.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, CoreError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| CoreError::InvalidHeader(name.to_string()))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| CoreError::InvalidHeader(name.as_str().to_string()))?;
        self.adopt_request_id(&name, &value);
        self.headers.append(name, value);
        Ok(self)
    }

    /// Replace all headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        if let Some(value) = headers.get(REQUEST_ID_HEADER) {
            if let Ok(id) = value.to_str() {
                self.id = RequestId::from_string(id);
            }
        }
        self.headers = headers;
        self
    }

    /// Set the request body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    fn adopt_request_id(&mut self, name: &HeaderName, value: &HeaderValue) {
        if name.as_str() == REQUEST_ID_HEADER {
            if let Ok(id) = value.to_str() {
                self.id = RequestId::from_string(id);
            }
        }
    }

    /// Request ID.
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Full request URL as received.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Path plus `?query` when a query is present, verbatim.
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    /// All request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `User-Agent` header, or an empty string.
    pub fn user_agent(&self) -> &str {
        self.headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    /// The `Accept` header, or an empty string.
    pub fn accept(&self) -> &str {
        self.headers
            .get(ACCEPT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    /// Request body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Whether this is a HEAD request.
    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }
}
