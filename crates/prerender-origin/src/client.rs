//! Origin fetch client.

use std::rc::Rc;

use http::header::HOST;
use http::HeaderMap;
use prerender_core::{GatewayResponse, IncomingRequest};

use crate::transport::{is_hop_by_hop, FetchError, HttpTransport, OutboundRequest};

/// Forwards requests to the origin.
///
/// The incoming method, headers and body are forwarded to the target URL.
/// `Host` and connection-scoped headers are dropped so the transport can set
/// them for the origin connection.
#[derive(Clone)]
pub struct OriginClient {
    transport: Rc<dyn HttpTransport>,
}

impl OriginClient {
    /// Create a client over a transport.
    pub fn new(transport: Rc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Fetch the origin's response for a request.
    ///
    /// Any HTTP status is a successful fetch; the response is returned
    /// untouched.
    pub async fn fetch(
        &self,
        request: &IncomingRequest,
        target: &str,
    ) -> Result<GatewayResponse, FetchError> {
        self.transport.send(forward_request(request, target)).await
    }
}

impl std::fmt::Debug for OriginClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OriginClient").finish_non_exhaustive()
    }
}

/// Build the outbound request that forwards `request` to `target`.
pub fn forward_request(request: &IncomingRequest, target: &str) -> OutboundRequest {
    let mut headers = HeaderMap::with_capacity(request.headers().len());
    for (name, value) in request.headers() {
        if *name == HOST || is_hop_by_hop(name.as_str()) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    OutboundRequest::new(request.method().clone(), target)
        .with_headers(headers)
        .with_body(request.body().to_vec())
}
