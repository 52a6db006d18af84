//! Cache policy for rendered snapshots.

use std::time::Duration;

use prerender_core::CacheConfig;
use serde::{Deserialize, Serialize};

/// Freshness advertised on rendered snapshots.
///
/// The gateway never enforces these values; they are advisory metadata for
/// downstream caches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotPolicy {
    /// Freshness window.
    pub max_age: Duration,
    /// Stale-while-revalidate window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_while_revalidate: Option<Duration>,
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(900),
            stale_while_revalidate: Some(Duration::from_secs(86_400)),
        }
    }
}

impl SnapshotPolicy {
    /// Create a policy with a freshness window and no stale window.
    pub fn new(max_age: Duration) -> Self {
        Self {
            max_age,
            stale_while_revalidate: None,
        }
    }

    /// Build from gateway configuration. A zero stale window is omitted.
    pub fn from_config(config: &CacheConfig) -> Self {
        let policy = Self::new(Duration::from_secs(config.max_age_secs));
        match config.stale_while_revalidate_secs {
            0 => policy,
            swr => policy.with_swr(Duration::from_secs(swr)),
        }
    }

    /// Set stale-while-revalidate window.
    pub fn with_swr(mut self, duration: Duration) -> Self {
        self.stale_while_revalidate = Some(duration);
        self
    }

    /// Generate Cache-Control header value.
    pub fn cache_control_header(&self) -> String {
        let mut parts = vec![
            "public".to_string(),
            format!("max-age={}", self.max_age.as_secs()),
        ];

        if let Some(swr) = self.stale_while_revalidate {
            parts.push(format!("stale-while-revalidate={}", swr.as_secs()));
        }

        parts.join(", ")
    }
}
