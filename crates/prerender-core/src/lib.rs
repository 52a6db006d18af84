//! Core abstractions for the prerender gateway.
//!
//! This crate provides the fundamental types shared by every other crate:
//! - `IncomingRequest` - Immutable view of the request being handled
//! - `GatewayResponse` - Immutable response record with copy-on-annotate helpers
//! - `Classification` - Outcome of request classification
//! - `GatewayConfig` - Static gateway configuration
//! - `RequestPhase` / `TimingContext` - Request lifecycle tracking

mod classification;
mod config;
mod context;
mod error;
mod lifecycle;
mod request;
mod response;

pub use classification::*;
pub use config::*;
pub use context::*;
pub use error::*;
pub use lifecycle::*;
pub use request::*;
pub use response::*;
