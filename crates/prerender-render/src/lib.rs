//! Browser rendering for the prerender gateway.
//!
//! This crate provides:
//! - `BrowserProvider` / `BrowserSession` - Headless browser session protocol
//! - `RenderOrchestrator` - One render per call, session always released
//! - `WebDriverProvider` - Session protocol over a WebDriver endpoint
//!
//! # Example
//!
//! ```ignore
//! use prerender_render::{RenderOrchestrator, WebDriverProvider};
//!
//! let provider = WebDriverProvider::new(transport, "http://127.0.0.1:9515");
//! let orchestrator = RenderOrchestrator::new(Rc::new(provider));
//!
//! let outcome = orchestrator.render("https://app.example.com/pricing", "Googlebot/2.1").await;
//! match outcome.page {
//!     Ok(page) => println!("{} bytes", page.html.len()),
//!     Err(e) => println!("render failed: {}", e.reason()),
//! }
//! ```

mod error;
mod orchestrator;
mod session;
mod webdriver;

pub use error::*;
pub use orchestrator::*;
pub use session::*;
pub use webdriver::*;

pub use prerender_core::WaitPolicy;
