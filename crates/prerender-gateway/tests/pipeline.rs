//! End-to-end gateway behavior with in-memory collaborators.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::oneshot;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use prerender_cache::{
    CacheError, CacheKey, CacheResult, CacheStore, CachedEntry, MemoryStore, UnavailableStore,
};
use prerender_core::{GatewayConfig, GatewayResponse, IncomingRequest, WaitPolicy};
use prerender_gateway::{GatewayBuilder, GatewayError, Handled, PrerenderGateway};
use prerender_origin::{FetchError, HttpTransport, OriginClient, OutboundRequest};
use prerender_render::{BrowserProvider, BrowserSession, RenderError};

const GOOGLEBOT: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";
const CHROME: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeOrigin {
    sent: RefCell<Vec<OutboundRequest>>,
    down: Cell<bool>,
}

impl FakeOrigin {
    fn requests(&self) -> usize {
        self.sent.borrow().len()
    }
}

#[async_trait(?Send)]
impl HttpTransport for FakeOrigin {
    async fn send(&self, request: OutboundRequest) -> Result<GatewayResponse, FetchError> {
        let body = format!("origin {} {}", request.method, request.url);
        self.sent.borrow_mut().push(request);
        if self.down.get() {
            return Err(FetchError::Connection("connection refused".into()));
        }

        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/html"));
        headers.insert("set-cookie", HeaderValue::from_static("sid=1"));
        Ok(GatewayResponse::new(StatusCode::OK, headers, body))
    }
}

#[derive(Default)]
struct BrowserState {
    opens: Cell<usize>,
    closes: Cell<usize>,
    fail: RefCell<Option<RenderError>>,
    gate: RefCell<Option<oneshot::Receiver<()>>>,
    navigations: RefCell<Vec<(String, WaitPolicy, Duration)>>,
}

#[derive(Default)]
struct FakeBrowser {
    state: Rc<BrowserState>,
}

struct FakeSession {
    state: Rc<BrowserState>,
    user_agent: String,
    url: String,
}

#[async_trait(?Send)]
impl BrowserProvider for FakeBrowser {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, RenderError> {
        self.state.opens.set(self.state.opens.get() + 1);
        if let Some(RenderError::Launch(msg)) = self.state.fail.borrow().clone() {
            return Err(RenderError::Launch(msg));
        }
        Ok(Box::new(FakeSession {
            state: Rc::clone(&self.state),
            user_agent: String::new(),
            url: String::new(),
        }))
    }
}

#[async_trait(?Send)]
impl BrowserSession for FakeSession {
    async fn set_user_agent(&mut self, user_agent: &str) -> Result<(), RenderError> {
        self.user_agent = user_agent.to_string();
        Ok(())
    }

    async fn navigate(
        &mut self,
        url: &str,
        wait: WaitPolicy,
        timeout: Duration,
    ) -> Result<(), RenderError> {
        self.state
            .navigations
            .borrow_mut()
            .push((url.to_string(), wait, timeout));

        let gate = self.state.gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        match self.state.fail.borrow().clone() {
            Some(err @ (RenderError::Navigation(_) | RenderError::Timeout { .. })) => Err(err),
            _ => {
                self.url = url.to_string();
                Ok(())
            }
        }
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        if let Some(err @ RenderError::Extraction(_)) = self.state.fail.borrow().clone() {
            return Err(err);
        }
        Ok(format!(
            "<html><body>rendered {} for {}</body></html>",
            self.url, self.user_agent
        ))
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        self.state.closes.set(self.state.closes.get() + 1);
        Ok(())
    }
}

struct ReadOnlyStore;

#[async_trait(?Send)]
impl CacheStore for ReadOnlyStore {
    async fn get(&self, _key: &CacheKey) -> CacheResult<Option<CachedEntry>> {
        Ok(None)
    }

    async fn put(&self, _key: &CacheKey, _entry: CachedEntry) -> CacheResult<()> {
        Err(CacheError::Store("quota exceeded".into()))
    }
}

struct Harness {
    gateway: PrerenderGateway,
    origin: Rc<FakeOrigin>,
    browser: Rc<BrowserState>,
    store: Rc<MemoryStore>,
}

fn config(diagnostics: bool) -> GatewayConfig {
    let mut config = GatewayConfig::new("https://app.example.com");
    config.diagnostics.enabled = diagnostics;
    config.diagnostics.worker_tag = "edge-test".to_string();
    config
}

fn harness_with(config: GatewayConfig, store: Option<Rc<dyn CacheStore>>) -> Harness {
    let origin = Rc::new(FakeOrigin::default());
    let browser = FakeBrowser::default();
    let state = Rc::clone(&browser.state);
    let memory = Rc::new(MemoryStore::new());

    let gateway = GatewayBuilder::new(config)
        .with_transport(origin.clone())
        .with_browser(Rc::new(browser))
        .with_store(store.unwrap_or_else(|| memory.clone() as Rc<dyn CacheStore>))
        .build()
        .unwrap();

    Harness {
        gateway,
        origin,
        browser: state,
        store: memory,
    }
}

fn harness(diagnostics: bool) -> Harness {
    harness_with(config(diagnostics), None)
}

fn request(method: Method, url: &str, user_agent: &str, accept: &str) -> IncomingRequest {
    let mut request = IncomingRequest::new(method, url).unwrap();
    if !user_agent.is_empty() {
        request = request.with_header("user-agent", user_agent).unwrap();
    }
    if !accept.is_empty() {
        request = request.with_header("accept", accept).unwrap();
    }
    request
}

fn bot_get(url: &str) -> IncomingRequest {
    request(Method::GET, url, GOOGLEBOT, "text/html")
}

async fn handle_and_drain(gateway: &PrerenderGateway, request: IncomingRequest) -> GatewayResponse {
    let Handled {
        response,
        background,
    } = gateway.handle(request).await.unwrap();
    background.run().await;
    response
}

// ---------------------------------------------------------------------------
// Verbatim forwarding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pass_through_is_identical_to_direct_origin_fetch() {
    let h = harness(true);
    let req = request(Method::POST, "https://site.test/api/login", GOOGLEBOT, "text/html")
        .with_body("user=a&pass=b");

    let direct = OriginClient::new(h.origin.clone())
        .fetch(&req, "https://app.example.com/api/login")
        .await
        .unwrap();
    let Handled {
        response,
        background,
    } = h.gateway.handle(req).await.unwrap();

    assert_eq!(response, direct);
    assert!(background.is_empty());
    assert_eq!(h.browser.opens.get(), 0);

    let sent = h.origin.sent.borrow();
    assert_eq!(sent[1].method, Method::POST);
    assert_eq!(sent[1].url, "https://app.example.com/api/login");
    assert_eq!(sent[1].body, b"user=a&pass=b");
}

#[tokio::test]
async fn skip_paths_pass_through_for_any_user_agent() {
    let h = harness(true);

    for ua in [GOOGLEBOT, CHROME, ""] {
        let response = handle_and_drain(
            &h.gateway,
            request(Method::GET, "https://site.test/admin/settings?tab=users", ua, "text/html"),
        )
        .await;

        assert_eq!(
            response.body(),
            b"origin GET https://app.example.com/admin/settings?tab=users"
        );
        assert!(response.header("x-worker").is_none());
    }

    let response = handle_and_drain(&h.gateway, bot_get("https://site.test/login")).await;
    assert!(response.header("x-prerender").is_none());
    assert_eq!(h.browser.opens.get(), 0);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn human_is_forwarded_with_worker_tag_only() {
    let h = harness(true);
    let response = handle_and_drain(
        &h.gateway,
        request(Method::GET, "https://site.test/pricing?plan=pro", CHROME, "text/html"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), b"origin GET https://app.example.com/pricing?plan=pro");
    assert_eq!(response.header("set-cookie"), Some("sid=1"));
    assert_eq!(response.header("x-worker"), Some("edge-test"));
    assert!(response.header("x-prerender").is_none());
    assert_eq!(h.browser.opens.get(), 0);
}

#[tokio::test]
async fn bot_not_asking_for_html_is_treated_as_human() {
    let h = harness(false);
    let response = handle_and_drain(
        &h.gateway,
        request(Method::GET, "https://site.test/logo.png", GOOGLEBOT, "image/png"),
    )
    .await;

    assert_eq!(response.body(), b"origin GET https://app.example.com/logo.png");
    assert_eq!(h.browser.opens.get(), 0);
}

// ---------------------------------------------------------------------------
// Bot rendering and caching
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bot_miss_renders_then_repeat_hits_cache() {
    let h = harness(true);

    let Handled {
        response: first,
        background,
    } = h.gateway.handle(bot_get("https://site.test/pricing")).await.unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.header("content-type"), Some("text/html; charset=utf-8"));
    assert_eq!(
        first.header("cache-control"),
        Some("public, max-age=900, stale-while-revalidate=86400")
    );
    assert_eq!(first.header("x-prerender"), Some("1"));
    assert_eq!(first.header("x-prerender-attempted"), Some("1"));
    assert_eq!(first.header("x-prerender-cache"), Some("MISS"));
    assert_eq!(first.header("x-served-by"), Some("browser-rendering"));
    assert_eq!(
        first.body(),
        format!(
            "<html><body>rendered https://app.example.com/pricing for {}</body></html>",
            GOOGLEBOT
        )
        .as_bytes()
    );

    // The store write is deferred until after the response.
    assert_eq!(background.len(), 1);
    assert!(h.store.is_empty());
    background.run().await;
    assert_eq!(h.store.len(), 1);

    let second = handle_and_drain(&h.gateway, bot_get("https://site.test/pricing")).await;
    assert_eq!(second.header("x-prerender-cache"), Some("HIT"));
    assert_eq!(second.header("x-prerender-attempted"), Some("0"));
    assert_eq!(second.header("x-served-by"), Some("cache"));
    assert_eq!(second.body(), first.body());
    assert_eq!(second.header("cache-control"), first.header("cache-control"));

    assert_eq!(h.browser.opens.get(), 1);
    assert_eq!(h.browser.closes.get(), 1);
    assert_eq!(h.origin.requests(), 0);
}

#[tokio::test]
async fn render_uses_configured_wait_policy_and_timeout() {
    let mut config = config(false);
    config.render.timeout_ms = 1_234;
    config.render.wait = WaitPolicy::NetworkIdle;
    let h = harness_with(config, None);

    handle_and_drain(&h.gateway, bot_get("https://site.test/docs?page=2")).await;

    let navigations = h.browser.navigations.borrow();
    assert_eq!(
        navigations[0],
        (
            "https://app.example.com/docs?page=2".to_string(),
            WaitPolicy::NetworkIdle,
            Duration::from_millis(1_234)
        )
    );
}

#[tokio::test]
async fn accept_variants_share_one_snapshot() {
    let h = harness(true);

    handle_and_drain(
        &h.gateway,
        request(Method::GET, "https://site.test/blog", GOOGLEBOT, "text/html,application/xhtml+xml"),
    )
    .await;
    let second = handle_and_drain(
        &h.gateway,
        request(Method::GET, "https://site.test/blog", GOOGLEBOT, "*/*"),
    )
    .await;
    let third = handle_and_drain(
        &h.gateway,
        request(Method::GET, "https://site.test/blog", GOOGLEBOT, ""),
    )
    .await;

    assert_eq!(second.header("x-prerender-cache"), Some("HIT"));
    assert_eq!(third.header("x-prerender-cache"), Some("HIT"));
    assert_eq!(h.browser.opens.get(), 1);
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn query_strings_are_distinct_snapshots() {
    let h = harness(true);

    handle_and_drain(&h.gateway, bot_get("https://site.test/search?q=a")).await;
    let other = handle_and_drain(&h.gateway, bot_get("https://site.test/search?q=b")).await;

    assert_eq!(other.header("x-prerender-cache"), Some("MISS"));
    assert_eq!(h.browser.opens.get(), 2);
}

#[tokio::test]
async fn head_gets_headers_without_body_and_populates_cache() {
    let h = harness(true);

    let head = handle_and_drain(
        &h.gateway,
        request(Method::HEAD, "https://site.test/pricing", GOOGLEBOT, ""),
    )
    .await;

    assert_eq!(head.status(), StatusCode::OK);
    assert!(head.body().is_empty());
    assert_eq!(head.header("content-type"), Some("text/html; charset=utf-8"));
    assert_eq!(head.header("x-prerender-cache"), Some("MISS"));
    assert_eq!(h.store.len(), 1);

    let get = handle_and_drain(&h.gateway, bot_get("https://site.test/pricing")).await;
    assert_eq!(get.header("x-prerender-cache"), Some("HIT"));
    assert!(!get.body().is_empty());

    let head_again = handle_and_drain(
        &h.gateway,
        request(Method::HEAD, "https://site.test/pricing", GOOGLEBOT, ""),
    )
    .await;
    assert_eq!(head_again.header("x-prerender-cache"), Some("HIT"));
    assert!(head_again.body().is_empty());
    assert_eq!(h.browser.opens.get(), 1);
}

// ---------------------------------------------------------------------------
// Render failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn render_failure_serves_origin_tagged_with_reason() {
    for (failure, reason) in [
        (RenderError::Launch("no chrome".into()), "launch"),
        (RenderError::Navigation("net::ERR_FAILED".into()), "navigation"),
        (
            RenderError::Timeout {
                url: "https://app.example.com/slow".into(),
                timeout_ms: 30_000,
            },
            "timeout",
        ),
        (RenderError::Extraction("detached frame".into()), "extraction"),
    ] {
        let h = harness(true);
        *h.browser.fail.borrow_mut() = Some(failure);

        let Handled {
            response,
            background,
        } = h.gateway.handle(bot_get("https://site.test/slow")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), b"origin GET https://app.example.com/slow");
        assert_eq!(response.header("set-cookie"), Some("sid=1"));
        assert_eq!(response.header("x-prerender"), Some("0"));
        assert_eq!(response.header("x-prerender-attempted"), Some("1"));
        assert_eq!(response.header("x-prerender-error"), Some("1"));
        assert_eq!(response.header("x-prerender-error-reason"), Some(reason));
        assert!(response.header("x-prerender-cache").is_none());

        assert!(background.is_empty());
        assert!(h.store.is_empty());
        assert_eq!(h.browser.opens.get(), 1);
        assert_eq!(
            h.browser.closes.get(),
            if reason == "launch" { 0 } else { 1 }
        );
    }
}

#[tokio::test]
async fn render_failure_is_not_retried_or_cached() {
    let h = harness(false);
    *h.browser.fail.borrow_mut() = Some(RenderError::Navigation("boom".into()));

    handle_and_drain(&h.gateway, bot_get("https://site.test/")).await;
    handle_and_drain(&h.gateway, bot_get("https://site.test/")).await;

    assert_eq!(h.browser.opens.get(), 2);
    assert_eq!(h.origin.requests(), 2);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn fallback_origin_failure_surfaces_as_origin_error() {
    let h = harness(true);
    *h.browser.fail.borrow_mut() = Some(RenderError::Navigation("boom".into()));
    h.origin.down.set(true);

    let err = h.gateway.handle(bot_get("https://site.test/")).await.unwrap_err();
    assert!(matches!(err, GatewayError::Origin(_)));
}

// ---------------------------------------------------------------------------
// Cache store failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_store_write_does_not_affect_response() {
    let h = harness_with(config(true), Some(Rc::new(ReadOnlyStore) as Rc<dyn CacheStore>));

    let Handled {
        response,
        background,
    } = h.gateway.handle(bot_get("https://site.test/")).await.unwrap();
    assert_eq!(response.header("x-served-by"), Some("browser-rendering"));
    assert_eq!(background.len(), 1);
    background.run().await;

    let again = handle_and_drain(&h.gateway, bot_get("https://site.test/")).await;
    assert_eq!(again.header("x-prerender-cache"), Some("MISS"));
    assert_eq!(h.browser.opens.get(), 2);
}

#[tokio::test]
async fn unreachable_store_is_a_miss() {
    let store = UnavailableStore::new("kv unavailable");
    let h = harness_with(config(true), Some(Rc::new(store) as Rc<dyn CacheStore>));

    let response = handle_and_drain(&h.gateway, bot_get("https://site.test/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.header("x-prerender-cache"), Some("MISS"));
    assert_eq!(h.browser.opens.get(), 1);
}

#[tokio::test]
async fn unopened_store_still_serves_every_request() {
    let store = UnavailableStore::new("no such store: default");
    let h = harness_with(config(true), Some(Rc::new(store) as Rc<dyn CacheStore>));

    let human = handle_and_drain(
        &h.gateway,
        request(Method::GET, "https://site.test/pricing", CHROME, "text/html"),
    )
    .await;
    assert_eq!(human.status(), StatusCode::OK);
    assert!(human.header("x-prerender-cache").is_none());

    for _ in 0..2 {
        let bot = handle_and_drain(&h.gateway, bot_get("https://site.test/pricing")).await;
        assert_eq!(bot.status(), StatusCode::OK);
        assert_eq!(bot.header("x-served-by"), Some("browser-rendering"));
        assert_eq!(bot.header("x-prerender-cache"), Some("MISS"));
    }
    assert_eq!(h.browser.opens.get(), 2);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_misses_share_one_browser_session() {
    let h = harness(true);
    let (release, gate) = oneshot::channel();
    *h.browser.gate.borrow_mut() = Some(gate);

    let (first, second, _) = futures::join!(
        h.gateway.handle(bot_get("https://site.test/launch")),
        h.gateway.handle(request(Method::GET, "https://site.test/launch", GOOGLEBOT, "*/*")),
        async {
            let _ = release.send(());
        }
    );
    let first = first.unwrap();
    let second = second.unwrap();

    assert_eq!(h.browser.opens.get(), 1);
    assert_eq!(h.browser.closes.get(), 1);
    assert_eq!(first.response.header("x-served-by"), Some("browser-rendering"));
    assert_eq!(second.response.header("x-served-by"), Some("browser-rendering-shared"));
    assert_eq!(second.response.header("x-prerender-cache"), Some("MISS"));
    assert_eq!(first.response.body(), second.response.body());

    // Only the leader writes the snapshot.
    assert_eq!(first.background.len(), 1);
    assert!(second.background.is_empty());
    first.background.run().await;
    assert_eq!(h.store.len(), 1);
    assert_eq!(h.gateway.renders_in_flight(), 0);
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn diagnostics_disabled_adds_no_headers() {
    let h = harness(false);

    let human = handle_and_drain(
        &h.gateway,
        request(Method::GET, "https://site.test/", CHROME, "text/html"),
    )
    .await;
    let rendered = handle_and_drain(&h.gateway, bot_get("https://site.test/")).await;
    let hit = handle_and_drain(&h.gateway, bot_get("https://site.test/")).await;

    for response in [&human, &rendered, &hit] {
        assert!(response
            .headers()
            .keys()
            .all(|name| !name.as_str().starts_with("x-")));
    }
    assert_eq!(hit.body(), rendered.body());
}
