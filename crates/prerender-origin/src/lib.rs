//! Outbound HTTP for the prerender gateway.
//!
//! `HttpTransport` is the single seam for network I/O. `OriginClient` uses it
//! to forward requests to the origin; the WebDriver browser provider uses it
//! to talk to the rendering service.

mod client;
mod transport;

pub use client::*;
pub use transport::*;
