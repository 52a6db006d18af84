//! Observability for the prerender gateway.
//!
//! This crate provides:
//! - `StructuredLogger` - Structured logging with request context
//! - `MetricsCollector` - Per-request classification, cache and render metrics

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;

// Re-export RequestId and TimingContext from prerender-core for convenience
pub use prerender_core::{RequestId, TimingContext};
