//! Edge prerender gateway.
//!
//! Sits in front of a client-rendered origin. Crawlers asking for HTML get a
//! browser-rendered snapshot (cached per URL); everyone else is forwarded to
//! the origin untouched.
//!
//! This crate provides:
//! - `PrerenderGateway` - Per-request pipeline
//! - `FallbackHandler` - Origin response when rendering fails
//! - `ResponseAnnotator` - Optional diagnostic headers
//! - `BackgroundTasks` - Work deferred until after the response is sent
//!
//! # Example
//!
//! ```ignore
//! let gateway = GatewayBuilder::new(config)
//!     .with_transport(Rc::new(SpinTransport::new()))
//!     .with_store(Rc::new(SpinKvStore::open_default()?))
//!     .build()?;
//!
//! let Handled { response, background } = gateway.handle(request).await?;
//! // send `response`, then:
//! background.run().await;
//! ```

mod background;
mod diagnostics;
mod error;
mod fallback;
mod gateway;

pub use background::*;
pub use diagnostics::*;
pub use error::*;
pub use fallback::*;
pub use gateway::*;
