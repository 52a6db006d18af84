//! Cache key composition.

use prerender_core::{GatewayConfig, IncomingRequest};
use serde::{Deserialize, Serialize};

/// Accept value every snapshot cache key is normalized to.
pub const CANONICAL_ACCEPT: &str = "text/html";

/// Identifies one rendered snapshot.
///
/// Built from the request URL with the Accept header forced to
/// [`CANONICAL_ACCEPT`], so requests that only differ in Accept share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Request URL (scheme, host, path and query).
    url: String,
    /// Accept value the key was built with.
    accept: String,
    /// Storage key string.
    key: String,
}

impl CacheKey {
    /// Create a key for a URL under a namespace prefix.
    pub fn new(prefix: &str, url: impl Into<String>) -> Self {
        let url = url.into();
        let key = format!("{}:{}|accept={}", prefix, url, CANONICAL_ACCEPT);
        Self {
            url,
            accept: CANONICAL_ACCEPT.to_string(),
            key,
        }
    }

    /// The URL this key identifies.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The Accept value the key is normalized to.
    pub fn accept(&self) -> &str {
        &self.accept
    }

    /// Get the storage key string.
    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// Derives origin target URLs and cache keys from requests.
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    origin: String,
    prefix: String,
}

impl CacheKeyBuilder {
    /// Create a builder for an origin base URL. A trailing `/` is dropped.
    pub fn new(origin: impl Into<String>) -> Self {
        let origin = origin.into();
        Self {
            origin: origin.trim_end_matches('/').to_string(),
            prefix: "prerender".to_string(),
        }
    }

    /// Build from gateway configuration.
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.origin.trim()).with_prefix(config.cache.key_prefix.clone())
    }

    /// Set the storage key namespace prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// The origin base URL.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Origin URL for a request: origin base + path + query, verbatim.
    pub fn build_target(&self, request: &IncomingRequest) -> String {
        self.target_for(&request.path_and_query())
    }

    /// Origin URL for a raw path and query.
    pub fn target_for(&self, path_and_query: &str) -> String {
        format!("{}{}", self.origin, path_and_query)
    }

    /// Cache key for a request.
    pub fn build_cache_key(&self, request: &IncomingRequest) -> CacheKey {
        self.key_for_url(request.url())
    }

    /// Cache key for a raw request URL. Any fragment is dropped.
    pub fn key_for_url(&self, url: &str) -> CacheKey {
        let url = url.split('#').next().unwrap_or(url);
        CacheKey::new(&self.prefix, url)
    }
}
