//! Origin fallback for failed renders.

use prerender_core::{GatewayResponse, IncomingRequest};
use prerender_origin::{FetchError, OriginClient};
use prerender_render::RenderError;

use crate::diagnostics::{DiagnosticHeaders, ResponseAnnotator};

/// Serves the origin's own response when rendering fails.
///
/// The render error is reported only through diagnostics; the origin's status
/// and body are passed through unchanged.
#[derive(Debug, Clone)]
pub struct FallbackHandler {
    origin: OriginClient,
    annotator: ResponseAnnotator,
}

impl FallbackHandler {
    /// Create a fallback handler.
    pub fn new(origin: OriginClient, annotator: ResponseAnnotator) -> Self {
        Self { origin, annotator }
    }

    /// Fetch the origin response for `request` and tag it with the failure.
    pub async fn fallback(
        &self,
        request: &IncomingRequest,
        target: &str,
        error: &RenderError,
    ) -> Result<GatewayResponse, FetchError> {
        let response = self.origin.fetch(request, target).await?;
        Ok(self
            .annotator
            .annotate(response, &DiagnosticHeaders::fallback(error.reason())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use async_trait::async_trait;
    use http::{HeaderMap, StatusCode};
    use prerender_origin::{HttpTransport, OutboundRequest};

    struct StaticOrigin(Option<StatusCode>);

    #[async_trait(?Send)]
    impl HttpTransport for StaticOrigin {
        async fn send(&self, _request: OutboundRequest) -> Result<GatewayResponse, FetchError> {
            match self.0 {
                Some(status) => Ok(GatewayResponse::new(status, HeaderMap::new(), "<div id=app></div>")),
                None => Err(FetchError::Connection("refused".into())),
            }
        }
    }

    fn handler(origin: StaticOrigin, diagnostics: bool) -> FallbackHandler {
        FallbackHandler::new(
            OriginClient::new(Rc::new(origin)),
            ResponseAnnotator::new(diagnostics, "edge-1"),
        )
    }

    fn request() -> IncomingRequest {
        IncomingRequest::get("https://site.test/pricing").unwrap()
    }

    #[tokio::test]
    async fn test_origin_response_passed_through_and_tagged() {
        let handler = handler(StaticOrigin(Some(StatusCode::NOT_FOUND)), true);
        let error = RenderError::Navigation("boom".into());

        let response = handler
            .fallback(&request(), "https://app.example.com/pricing", &error)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body(), b"<div id=app></div>");
        assert_eq!(response.header("x-prerender-error"), Some("1"));
        assert_eq!(response.header("x-prerender-error-reason"), Some("navigation"));
    }

    #[tokio::test]
    async fn test_untagged_when_diagnostics_disabled() {
        let handler = handler(StaticOrigin(Some(StatusCode::OK)), false);
        let error = RenderError::Launch("no browser".into());

        let response = handler
            .fallback(&request(), "https://app.example.com/pricing", &error)
            .await
            .unwrap();

        assert!(response.headers().is_empty());
    }

    #[tokio::test]
    async fn test_origin_failure_propagates() {
        let handler = handler(StaticOrigin(None), true);
        let error = RenderError::Launch("no browser".into());

        let err = handler
            .fallback(&request(), "https://app.example.com/pricing", &error)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Connection(_)));
    }
}
