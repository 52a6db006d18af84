//! Render orchestration.

use std::rc::Rc;
use std::time::Duration;

use prerender_core::{RenderConfig, WaitPolicy};

use crate::error::RenderError;
use crate::session::{BrowserProvider, BrowserSession};

/// A successfully rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// URL the browser navigated to.
    pub url: String,
    /// Serialized markup after rendering.
    pub html: String,
}

/// Result of one render call.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    /// The rendered page, or why rendering failed.
    pub page: Result<RenderedPage, RenderError>,
    /// Error from releasing the session. Never affects `page`.
    pub close_error: Option<RenderError>,
}

/// Drives one browser session per render.
///
/// Sessions are opened fresh for every render and closed on every exit
/// path. Failures are returned once; nothing is retried.
#[derive(Clone)]
pub struct RenderOrchestrator {
    provider: Rc<dyn BrowserProvider>,
    wait: WaitPolicy,
    timeout: Duration,
}

impl RenderOrchestrator {
    /// Create an orchestrator with the default wait policy and a 30s timeout.
    pub fn new(provider: Rc<dyn BrowserProvider>) -> Self {
        Self {
            provider,
            wait: WaitPolicy::default(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Build from render configuration.
    pub fn from_config(provider: Rc<dyn BrowserProvider>, config: &RenderConfig) -> Self {
        Self::new(provider)
            .with_wait(config.wait)
            .with_timeout(config.timeout())
    }

    /// Set the navigation wait policy.
    pub fn with_wait(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// Set the navigation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Navigation wait policy.
    pub fn wait(&self) -> WaitPolicy {
        self.wait
    }

    /// Navigation timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Render `target` as seen by `user_agent`.
    pub async fn render(&self, target: &str, user_agent: &str) -> RenderOutcome {
        let mut session = match self.provider.open().await {
            Ok(session) => session,
            Err(e) => {
                return RenderOutcome {
                    page: Err(e),
                    close_error: None,
                }
            }
        };

        let page = self
            .drive(session.as_mut(), target, user_agent)
            .await
            .map(|html| RenderedPage {
                url: target.to_string(),
                html,
            });
        let close_error = session.close().await.err();

        RenderOutcome {
            page,
            close_error,
        }
    }

    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        target: &str,
        user_agent: &str,
    ) -> Result<String, RenderError> {
        session.set_user_agent(user_agent).await?;
        session.navigate(target, self.wait, self.timeout).await?;
        session.content().await
    }
}

impl std::fmt::Debug for RenderOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderOrchestrator")
            .field("wait", &self.wait)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
