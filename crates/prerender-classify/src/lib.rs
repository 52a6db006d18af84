//! Request classification for the prerender gateway.
//!
//! This crate provides:
//! - `BotSignatures` - Ordered, case-insensitive crawler user-agent patterns
//! - `SkipRules` - Exact and prefix path exclusions
//! - `RequestClassifier` - Pure decision function over method, path, UA and Accept
//!
//! # Example
//!
//! ```ignore
//! use http::Method;
//! use prerender_classify::RequestClassifier;
//! use prerender_core::{Classification, GatewayConfig};
//!
//! let classifier = RequestClassifier::from_config(&GatewayConfig::new("https://app.example.com"))?;
//! let class = classifier.classify(&Method::GET, "/pricing", "Googlebot/2.1", "text/html");
//! assert_eq!(class, Classification::Bot);
//! ```

mod classifier;
mod signatures;
mod skip;

pub use classifier::*;
pub use signatures::*;
pub use skip::*;
