//! Browser sessions over the W3C WebDriver protocol.
//!
//! Targets a chromedriver-compatible endpoint (local chromedriver, Selenium
//! grid, or a hosted rendering service). The user-agent override goes through
//! chromedriver's CDP passthrough.

use std::rc::Rc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::Method;
use prerender_core::{GatewayResponse, WaitPolicy};
use prerender_origin::{HttpTransport, OutboundRequest};
use serde_json::{json, Value};

use crate::error::RenderError;
use crate::session::{BrowserProvider, BrowserSession};

/// Chrome arguments for a headless session.
pub const HEADLESS_CHROME_ARGS: &[&str] = &[
    "--headless=new",
    "--disable-gpu",
    "--no-sandbox",
    "--disable-dev-shm-usage",
];

/// Resolves once the page has made no new resource requests for
/// `arguments[0]` milliseconds.
const SETTLE_SCRIPT: &str = r#"
const done = arguments[arguments.length - 1];
const quietMs = arguments[0];
let seen = performance.getEntriesByType('resource').length;
let quietSince = Date.now();
const timer = setInterval(() => {
  const now = performance.getEntriesByType('resource').length;
  if (now !== seen) {
    seen = now;
    quietSince = Date.now();
  } else if (Date.now() - quietSince >= quietMs) {
    clearInterval(timer);
    done(true);
  }
}, 50);
"#;

/// WebDriver page load strategy for a wait policy.
pub fn page_load_strategy(wait: WaitPolicy) -> &'static str {
    match wait {
        WaitPolicy::DomContentLoaded => "eager",
        WaitPolicy::Load | WaitPolicy::NetworkIdle | WaitPolicy::NetworkAlmostIdle => "normal",
    }
}

/// Quiet period awaited after the load event, if any.
pub fn settle_period(wait: WaitPolicy) -> Option<Duration> {
    match wait {
        WaitPolicy::Load | WaitPolicy::DomContentLoaded => None,
        WaitPolicy::NetworkIdle => Some(Duration::from_millis(500)),
        WaitPolicy::NetworkAlmostIdle => Some(Duration::from_millis(250)),
    }
}

/// An error reported by the WebDriver endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
struct WireError {
    code: String,
    message: String,
}

impl WireError {
    fn is_timeout(&self) -> bool {
        matches!(self.code.as_str(), "timeout" | "script timeout")
    }
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Decode a WebDriver response body into its `value`.
fn decode(response: GatewayResponse) -> Result<Value, WireError> {
    let status = response.status();
    let body: Value = serde_json::from_slice(response.body()).map_err(|e| WireError {
        code: "invalid response".to_string(),
        message: format!("HTTP {}: {}", status.as_u16(), e),
    })?;
    let value = body.get("value").cloned().unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(value);
    }

    Err(WireError {
        code: value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string(),
        message: value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

/// WebDriver command channel shared by a provider and its sessions.
#[derive(Clone)]
struct Channel {
    transport: Rc<dyn HttpTransport>,
    endpoint: String,
}

impl Channel {
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, WireError> {
        let mut request = OutboundRequest::new(method, format!("{}{}", self.endpoint, path));
        if let Some(body) = body {
            request = request
                .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .with_body(body.to_string());
        }

        let response = self.transport.send(request).await.map_err(|e| WireError {
            code: "transport".to_string(),
            message: e.to_string(),
        })?;
        decode(response)
    }
}

/// Opens browser sessions on a WebDriver endpoint.
#[derive(Clone)]
pub struct WebDriverProvider {
    channel: Channel,
    wait: WaitPolicy,
    chrome_args: Vec<String>,
}

impl WebDriverProvider {
    /// Create a provider for an endpoint such as `http://127.0.0.1:9515`.
    pub fn new(transport: Rc<dyn HttpTransport>, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            channel: Channel {
                transport,
                endpoint: endpoint.trim_end_matches('/').to_string(),
            },
            wait: WaitPolicy::default(),
            chrome_args: HEADLESS_CHROME_ARGS.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Set the wait policy sessions are created for.
    pub fn with_wait(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// The endpoint sessions are opened on.
    pub fn endpoint(&self) -> &str {
        &self.channel.endpoint
    }

    /// New-session payload.
    pub fn capabilities(&self) -> Value {
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "pageLoadStrategy": page_load_strategy(self.wait),
                    "goog:chromeOptions": {
                        "args": self.chrome_args,
                    },
                }
            }
        })
    }
}

#[async_trait(?Send)]
impl BrowserProvider for WebDriverProvider {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, RenderError> {
        let value = self
            .channel
            .command(Method::POST, "/session", Some(self.capabilities()))
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| RenderError::Launch("new session response has no sessionId".to_string()))?;

        Ok(Box::new(WebDriverSession {
            channel: self.channel.clone(),
            id: id.to_string(),
            closed: false,
        }))
    }
}

impl std::fmt::Debug for WebDriverProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDriverProvider")
            .field("endpoint", &self.channel.endpoint)
            .field("wait", &self.wait)
            .finish_non_exhaustive()
    }
}

/// One WebDriver session.
pub struct WebDriverSession {
    channel: Channel,
    id: String,
    closed: bool,
}

impl WebDriverSession {
    /// The WebDriver session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    fn path(&self, command: &str) -> String {
        format!("/session/{}{}", self.id, command)
    }

    async fn settle(&self, url: &str, quiet: Duration, remaining: Duration, timeout: Duration) -> Result<(), RenderError> {
        self.channel
            .command(
                Method::POST,
                &self.path("/timeouts"),
                Some(json!({ "script": remaining.as_millis() as u64 })),
            )
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        self.channel
            .command(
                Method::POST,
                &self.path("/execute/async"),
                Some(json!({ "script": SETTLE_SCRIPT, "args": [quiet.as_millis() as u64] })),
            )
            .await
            .map(|_| ())
            .map_err(|e| navigation_error(e, url, timeout))
    }
}

fn navigation_error(error: WireError, url: &str, timeout: Duration) -> RenderError {
    if error.is_timeout() {
        RenderError::Timeout {
            url: url.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    } else {
        RenderError::Navigation(error.to_string())
    }
}

#[async_trait(?Send)]
impl BrowserSession for WebDriverSession {
    async fn set_user_agent(&mut self, user_agent: &str) -> Result<(), RenderError> {
        self.channel
            .command(
                Method::POST,
                &self.path("/goog/cdp/execute"),
                Some(json!({
                    "cmd": "Network.setUserAgentOverride",
                    "params": { "userAgent": user_agent },
                })),
            )
            .await
            .map(|_| ())
            .map_err(|e| RenderError::Launch(format!("user-agent override failed: {}", e)))
    }

    async fn navigate(
        &mut self,
        url: &str,
        wait: WaitPolicy,
        timeout: Duration,
    ) -> Result<(), RenderError> {
        let start = Instant::now();

        self.channel
            .command(
                Method::POST,
                &self.path("/timeouts"),
                Some(json!({ "pageLoad": timeout.as_millis() as u64 })),
            )
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        self.channel
            .command(Method::POST, &self.path("/url"), Some(json!({ "url": url })))
            .await
            .map_err(|e| navigation_error(e, url, timeout))?;

        let Some(quiet) = settle_period(wait) else {
            return Ok(());
        };

        let remaining = timeout.saturating_sub(start.elapsed());
        if remaining <= quiet {
            return Err(RenderError::Timeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }

        self.settle(url, quiet, remaining, timeout).await
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        let value = self
            .channel
            .command(Method::GET, &self.path("/source"), None)
            .await
            .map_err(|e| RenderError::Extraction(e.to_string()))?;

        match value {
            Value::String(html) => Ok(html),
            other => Err(RenderError::Extraction(format!(
                "page source is not a string: {}",
                other
            ))),
        }
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        self.channel
            .command(Method::DELETE, &self.path(""), None)
            .await
            .map(|_| ())
            .map_err(|e| RenderError::Launch(format!("session close failed: {}", e)))
    }
}
