//! Stored snapshot entries.

use chrono::{DateTime, Utc};
use http::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use prerender_core::GatewayResponse;
use serde::{Deserialize, Serialize};

use crate::policy::SnapshotPolicy;
use crate::store::CacheError;

/// Content type every rendered snapshot is served with.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// A rendered snapshot as held by a cache store.
///
/// The cache-control value is advisory metadata for downstream caches; the
/// gateway serves an entry for as long as the store keeps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEntry {
    /// URL the snapshot was rendered for.
    pub url: String,
    /// Rendered HTML.
    #[serde(with = "body_base64")]
    pub body: Vec<u8>,
    /// Content-Type to serve.
    pub content_type: String,
    /// Cache-Control to serve.
    pub cache_control: String,
    /// When the snapshot was stored.
    pub stored_at: DateTime<Utc>,
}

impl CachedEntry {
    /// Create an entry for freshly rendered HTML.
    pub fn new(url: impl Into<String>, body: impl Into<Vec<u8>>, policy: &SnapshotPolicy) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            content_type: HTML_CONTENT_TYPE.to_string(),
            cache_control: policy.cache_control_header(),
            stored_at: Utc::now(),
        }
    }

    /// Build the 200 response that serves this entry.
    pub fn to_response(&self) -> GatewayResponse {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(&self.content_type)
                .unwrap_or_else(|_| HeaderValue::from_static(HTML_CONTENT_TYPE)),
        );
        if let Ok(value) = HeaderValue::from_str(&self.cache_control) {
            headers.insert(CACHE_CONTROL, value);
        }
        GatewayResponse::new(StatusCode::OK, headers, self.body.clone())
    }

    /// Serialize for storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CacheError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from storage.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CacheError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

mod body_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
