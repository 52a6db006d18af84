//! Snapshot caching for the prerender gateway.
//!
//! This crate provides:
//! - `CacheKeyBuilder` - Origin target URLs and Accept-normalized cache keys
//! - `SnapshotPolicy` - Cache-Control advertised on rendered snapshots
//! - `CachedEntry` - Stored snapshot with advisory freshness metadata
//! - `CacheStore` / `SnapshotCache` - Store seam and lookup wrapper
//! - `InFlightRenders` - Single-flight registry for concurrent misses
//!
//! # Example
//!
//! ```ignore
//! use prerender_cache::{CacheKeyBuilder, SnapshotPolicy};
//!
//! let keys = CacheKeyBuilder::new("https://app.example.com");
//! let target = keys.build_target(&request);  // https://app.example.com/pricing?plan=pro
//! let key = keys.build_cache_key(&request);  // prerender:https://site.test/pricing?plan=pro|accept=text/html
//!
//! let policy = SnapshotPolicy::default();
//! assert_eq!(
//!     policy.cache_control_header(),
//!     "public, max-age=900, stale-while-revalidate=86400"
//! );
//! ```

mod entry;
mod inflight;
mod key;
mod policy;
mod store;

pub use entry::*;
pub use inflight::*;
pub use key::*;
pub use policy::*;
pub use store::*;
