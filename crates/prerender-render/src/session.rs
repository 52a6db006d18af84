//! Headless browser session protocol.

use std::time::Duration;

use async_trait::async_trait;
use prerender_core::WaitPolicy;

use crate::error::RenderError;

/// Opens browser sessions.
#[async_trait(?Send)]
pub trait BrowserProvider {
    /// Open a fresh session. The caller must close it.
    async fn open(&self) -> Result<Box<dyn BrowserSession>, RenderError>;
}

/// One headless browser session.
///
/// Calls are made in order: `set_user_agent`, `navigate`, `content`, then
/// `close`. `close` is called exactly once, including after a failed step.
#[async_trait(?Send)]
pub trait BrowserSession {
    /// Override the user-agent for subsequent navigations.
    async fn set_user_agent(&mut self, user_agent: &str) -> Result<(), RenderError>;

    /// Navigate and wait for the page to settle.
    ///
    /// Must fail with [`RenderError::Timeout`] once `timeout` elapses.
    async fn navigate(
        &mut self,
        url: &str,
        wait: WaitPolicy,
        timeout: Duration,
    ) -> Result<(), RenderError>;

    /// Serialized markup of the current document.
    async fn content(&mut self) -> Result<String, RenderError>;

    /// Release the session.
    async fn close(&mut self) -> Result<(), RenderError>;
}
