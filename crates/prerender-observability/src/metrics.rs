//! Per-request gateway metrics.

use std::time::{Duration, Instant};

use prerender_core::{Classification, RequestId, TimingContext};
use serde::{Deserialize, Serialize};

/// Gateway metrics for a single request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMetrics {
    /// Request ID for correlation.
    pub request_id: String,
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Classification outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    /// Matched bot signature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_signature: Option<String>,
    /// Cache status (HIT/MISS) for bot requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_status: Option<String>,
    /// Whether a render was attempted.
    pub render_attempted: bool,
    /// Whether the render result came from another request's render.
    pub render_shared: bool,
    /// Render duration (microseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_duration_us: Option<u64>,
    /// Render failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_error: Option<String>,
    /// Origin fetch duration (microseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_duration_us: Option<u64>,
    /// Lifecycle phases entered, in order.
    pub phases: Vec<String>,
    /// Total request duration (microseconds).
    pub total_duration_us: u64,
    /// HTTP status code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

/// Collector for request metrics.
#[derive(Debug)]
pub struct MetricsCollector {
    request_id: RequestId,
    method: String,
    path: String,
    start: Instant,
    classification: Option<Classification>,
    bot_signature: Option<String>,
    cache_status: Option<String>,
    render_attempted: bool,
    render_shared: bool,
    render_duration: Option<Duration>,
    render_error: Option<String>,
    origin_duration: Option<Duration>,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    pub fn new(request_id: RequestId, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            request_id,
            method: method.into(),
            path: path.into(),
            start: Instant::now(),
            classification: None,
            bot_signature: None,
            cache_status: None,
            render_attempted: false,
            render_shared: false,
            render_duration: None,
            render_error: None,
            origin_duration: None,
        }
    }

    /// Record the classification.
    pub fn record_classification(&mut self, classification: Classification, signature: Option<&str>) {
        self.classification = Some(classification);
        self.bot_signature = signature.map(str::to_string);
    }

    /// Record the cache status.
    pub fn record_cache_status(&mut self, status: impl Into<String>) {
        self.cache_status = Some(status.into());
    }

    /// Record a render attempt and its outcome.
    pub fn record_render(&mut self, duration: Duration, shared: bool, error: Option<&str>) {
        self.render_attempted = true;
        self.render_shared = shared;
        self.render_duration = Some(duration);
        self.render_error = error.map(str::to_string);
    }

    /// Record an origin fetch.
    pub fn record_origin(&mut self, duration: Duration) {
        self.origin_duration = Some(duration);
    }

    /// Finalize and return the metrics.
    pub fn finalize(self, status_code: Option<u16>, timing: &TimingContext) -> RequestMetrics {
        RequestMetrics {
            request_id: self.request_id.to_string(),
            method: self.method,
            path: self.path,
            classification: self.classification.map(|c| c.name().to_string()),
            bot_signature: self.bot_signature,
            cache_status: self.cache_status,
            render_attempted: self.render_attempted,
            render_shared: self.render_shared,
            render_duration_us: self.render_duration.map(|d| d.as_micros() as u64),
            render_error: self.render_error,
            origin_duration_us: self.origin_duration.map(|d| d.as_micros() as u64),
            phases: timing
                .phases()
                .iter()
                .map(|p| p.name().to_string())
                .collect(),
            total_duration_us: self.start.elapsed().as_micros() as u64,
            status_code,
        }
    }
}

impl RequestMetrics {
    /// Format as a JSON value for embedding in a log line.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
