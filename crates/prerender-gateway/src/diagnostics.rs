//! Diagnostic response headers.

use http::header::HeaderName;
use prerender_cache::CacheStatus;
use prerender_core::{DiagnosticsConfig, GatewayResponse};

/// Header names for gateway diagnostics.
pub mod header_names {
    /// Identity of the gateway that handled the request.
    pub const X_WORKER: &str = "x-worker";
    /// `1` when the body is a rendered snapshot, `0` otherwise.
    pub const X_PRERENDER: &str = "x-prerender";
    /// `1` when a render was attempted for this request.
    pub const X_PRERENDER_ATTEMPTED: &str = "x-prerender-attempted";
    /// Snapshot cache status (HIT, MISS).
    pub const X_PRERENDER_CACHE: &str = "x-prerender-cache";
    /// `1` when rendering failed and the origin response was served.
    pub const X_PRERENDER_ERROR: &str = "x-prerender-error";
    /// Render failure tag (launch, navigation, timeout, extraction).
    pub const X_PRERENDER_ERROR_REASON: &str = "x-prerender-error-reason";
    /// Which path produced the body.
    pub const X_SERVED_BY: &str = "x-served-by";
}

/// Which path produced a bot response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedBy {
    /// Snapshot cache.
    Cache,
    /// A render started by this request.
    BrowserRendering,
    /// A render started by a concurrent request for the same key.
    BrowserRenderingShared,
}

impl ServedBy {
    /// Header value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::BrowserRendering => "browser-rendering",
            Self::BrowserRenderingShared => "browser-rendering-shared",
        }
    }
}

/// Diagnostic facts about how a response was produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticHeaders {
    /// Whether the body is a rendered snapshot.
    pub prerendered: Option<bool>,
    /// Whether a render was attempted.
    pub attempted: Option<bool>,
    /// Snapshot cache status.
    pub cache: Option<CacheStatus>,
    /// Which path produced the body.
    pub served_by: Option<ServedBy>,
    /// Render failure tag.
    pub error_reason: Option<&'static str>,
}

impl DiagnosticHeaders {
    /// Human request forwarded to the origin.
    pub fn human() -> Self {
        Self::default()
    }

    /// Bot request served from the snapshot cache.
    pub fn hit() -> Self {
        Self {
            prerendered: Some(true),
            attempted: Some(false),
            cache: Some(CacheStatus::Hit),
            served_by: Some(ServedBy::Cache),
            error_reason: None,
        }
    }

    /// Bot request served a fresh render.
    pub fn rendered(shared: bool) -> Self {
        Self {
            prerendered: Some(true),
            attempted: Some(true),
            cache: Some(CacheStatus::Miss),
            served_by: Some(if shared {
                ServedBy::BrowserRenderingShared
            } else {
                ServedBy::BrowserRendering
            }),
            error_reason: None,
        }
    }

    /// Bot request whose render failed; origin response served.
    pub fn fallback(reason: &'static str) -> Self {
        Self {
            prerendered: Some(false),
            attempted: Some(true),
            cache: None,
            served_by: None,
            error_reason: Some(reason),
        }
    }

    /// Header name/value pairs, excluding the worker identity.
    pub fn to_headers(&self) -> Vec<(HeaderName, &'static str)> {
        let flag = |b: bool| if b { "1" } else { "0" };
        let mut headers = Vec::new();

        if let Some(prerendered) = self.prerendered {
            headers.push((
                HeaderName::from_static(header_names::X_PRERENDER),
                flag(prerendered),
            ));
        }

        if let Some(attempted) = self.attempted {
            headers.push((
                HeaderName::from_static(header_names::X_PRERENDER_ATTEMPTED),
                flag(attempted),
            ));
        }

        if let Some(cache) = self.cache {
            headers.push((
                HeaderName::from_static(header_names::X_PRERENDER_CACHE),
                cache.as_str(),
            ));
        }

        if let Some(served_by) = self.served_by {
            headers.push((
                HeaderName::from_static(header_names::X_SERVED_BY),
                served_by.as_str(),
            ));
        }

        if let Some(reason) = self.error_reason {
            headers.push((HeaderName::from_static(header_names::X_PRERENDER_ERROR), "1"));
            headers.push((
                HeaderName::from_static(header_names::X_PRERENDER_ERROR_REASON),
                reason,
            ));
        }

        headers
    }
}

/// Adds diagnostic headers to responses when enabled.
#[derive(Debug, Clone)]
pub struct ResponseAnnotator {
    enabled: bool,
    worker_tag: String,
}

impl ResponseAnnotator {
    /// Create an annotator.
    pub fn new(enabled: bool, worker_tag: impl Into<String>) -> Self {
        Self {
            enabled,
            worker_tag: worker_tag.into(),
        }
    }

    /// Build from diagnostics configuration.
    pub fn from_config(config: &DiagnosticsConfig) -> Self {
        Self::new(config.enabled, config.worker_tag.clone())
    }

    /// Whether headers are added.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Return the response with diagnostic headers added.
    ///
    /// Status and body are never changed. A no-op when disabled.
    pub fn annotate(&self, response: GatewayResponse, diagnostics: &DiagnosticHeaders) -> GatewayResponse {
        if !self.enabled {
            return response;
        }

        let mut headers = vec![(
            HeaderName::from_static(header_names::X_WORKER),
            self.worker_tag.as_str(),
        )];
        headers.extend(diagnostics.to_headers());
        response.with_headers(headers)
    }
}
