//! HTTP transport seam.

use async_trait::async_trait;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use prerender_core::GatewayResponse;

/// Headers that describe a single connection and are never forwarded.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Check if a header is connection-scoped.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

/// Error type for outbound HTTP.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid response: {0}")]
    Response(String),
}

/// An outbound HTTP request.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl OutboundRequest {
    /// Create a request with no headers and an empty body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replace all headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

/// Sends outbound HTTP requests.
///
/// Implementations return any HTTP status as a response; only failures to
/// obtain a response at all are errors.
#[async_trait(?Send)]
pub trait HttpTransport {
    async fn send(&self, request: OutboundRequest) -> Result<GatewayResponse, FetchError>;
}

/// Transport backed by Spin's outbound HTTP.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinTransport;

#[cfg(target_arch = "wasm32")]
impl SpinTransport {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_arch = "wasm32")]
fn spin_method(method: &Method) -> spin_sdk::http::Method {
    use spin_sdk::http::Method as SpinMethod;

    match *method {
        Method::GET => SpinMethod::Get,
        Method::HEAD => SpinMethod::Head,
        Method::POST => SpinMethod::Post,
        Method::PUT => SpinMethod::Put,
        Method::DELETE => SpinMethod::Delete,
        Method::PATCH => SpinMethod::Patch,
        Method::OPTIONS => SpinMethod::Options,
        Method::CONNECT => SpinMethod::Connect,
        Method::TRACE => SpinMethod::Trace,
        ref other => SpinMethod::Other(other.as_str().to_string()),
    }
}

#[cfg(target_arch = "wasm32")]
#[async_trait(?Send)]
impl HttpTransport for SpinTransport {
    async fn send(&self, request: OutboundRequest) -> Result<GatewayResponse, FetchError> {
        let mut builder = spin_sdk::http::Request::builder();
        builder
            .method(spin_method(&request.method))
            .uri(request.url.as_str());
        for (name, value) in request.headers.iter() {
            builder.header(
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }
        let outbound = builder.body(request.body).build();

        let response: spin_sdk::http::Response = spin_sdk::http::send(outbound)
            .await
            .map_err(|e| FetchError::Connection(e.to_string()))?;

        let status = http::StatusCode::from_u16(*response.status())
            .map_err(|e| FetchError::Response(e.to_string()))?;

        let mut headers = HeaderMap::new();
        for (name, value) in response.headers() {
            if is_hop_by_hop(name) {
                continue;
            }
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_bytes(value.as_bytes()),
            ) {
                headers.append(name, value);
            }
        }

        Ok(GatewayResponse::new(status, headers, response.into_body()))
    }
}
