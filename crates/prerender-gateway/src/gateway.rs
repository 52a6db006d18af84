//! Per-request gateway pipeline.

use std::rc::Rc;
use std::time::Instant;

use futures::future::FutureExt;
use prerender_cache::{
    CacheKeyBuilder, CacheLookup, CacheStore, InFlightRenders, MemoryStore, SnapshotCache,
    SnapshotPolicy,
};
use prerender_classify::RequestClassifier;
use prerender_core::{
    Classification, GatewayConfig, GatewayResponse, IncomingRequest, RequestPhase, TimingContext,
};
use prerender_observability::{LogFormat, LogLevel, MetricsCollector, StructuredLogger};
use prerender_origin::{HttpTransport, OriginClient};
use prerender_render::{
    BrowserProvider, RenderError, RenderOrchestrator, RenderedPage, WebDriverProvider,
};

use crate::background::BackgroundTasks;
use crate::diagnostics::{DiagnosticHeaders, ResponseAnnotator};
use crate::error::GatewayError;
use crate::fallback::FallbackHandler;

/// The response for one request plus the work deferred until it is sent.
#[derive(Debug)]
pub struct Handled {
    pub response: GatewayResponse,
    pub background: BackgroundTasks,
}

/// Assembles a [`PrerenderGateway`] from configuration and collaborators.
///
/// An HTTP transport is required. Without an explicit store, snapshots are
/// kept in a process-local [`MemoryStore`]; without an explicit browser
/// provider, sessions are opened on the configured WebDriver endpoint through
/// the transport.
pub struct GatewayBuilder {
    config: GatewayConfig,
    store: Option<Rc<dyn CacheStore>>,
    transport: Option<Rc<dyn HttpTransport>>,
    browser: Option<Rc<dyn BrowserProvider>>,
}

impl GatewayBuilder {
    /// Start from configuration.
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            store: None,
            transport: None,
            browser: None,
        }
    }

    /// Set the snapshot store.
    pub fn with_store(mut self, store: Rc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the outbound HTTP transport.
    pub fn with_transport(mut self, transport: Rc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the browser provider.
    pub fn with_browser(mut self, browser: Rc<dyn BrowserProvider>) -> Self {
        self.browser = Some(browser);
        self
    }

    /// Validate configuration and build the gateway.
    pub fn build(self) -> Result<PrerenderGateway, GatewayError> {
        self.config.validate()?;

        let transport = self
            .transport
            .ok_or(GatewayError::MissingCollaborator("http transport"))?;
        let store: Rc<dyn CacheStore> = match self.store {
            Some(store) => store,
            None => Rc::new(MemoryStore::new()),
        };
        let browser: Rc<dyn BrowserProvider> = match self.browser {
            Some(browser) => browser,
            None => Rc::new(
                WebDriverProvider::new(Rc::clone(&transport), &self.config.render.webdriver_url)
                    .with_wait(self.config.render.wait),
            ),
        };

        let origin = OriginClient::new(transport);
        let annotator = ResponseAnnotator::from_config(&self.config.diagnostics);

        Ok(PrerenderGateway {
            classifier: RequestClassifier::from_config(&self.config)?,
            keys: CacheKeyBuilder::from_config(&self.config),
            cache: SnapshotCache::new(store, SnapshotPolicy::from_config(&self.config.cache)),
            renderer: RenderOrchestrator::from_config(browser, &self.config.render),
            renders: InFlightRenders::new(),
            fallback: FallbackHandler::new(origin.clone(), annotator.clone()),
            origin,
            annotator,
            log_format: LogFormat::from_name(&self.config.logging.format).unwrap_or_default(),
            log_level: LogLevel::from_name(&self.config.logging.level).unwrap_or(LogLevel::Info),
        })
    }
}

/// Routes each request to the origin, the snapshot cache or the renderer.
///
/// One instance serves many requests. It holds only read-only configuration
/// and the registry of renders in flight.
pub struct PrerenderGateway {
    classifier: RequestClassifier,
    keys: CacheKeyBuilder,
    cache: SnapshotCache,
    origin: OriginClient,
    renderer: RenderOrchestrator,
    renders: InFlightRenders<RenderedPage, RenderError>,
    fallback: FallbackHandler,
    annotator: ResponseAnnotator,
    log_format: LogFormat,
    log_level: LogLevel,
}

/// Per-request state threaded through the pipeline.
struct RequestScope {
    logger: StructuredLogger,
    timing: TimingContext,
    metrics: MetricsCollector,
    background: BackgroundTasks,
}

impl PrerenderGateway {
    /// Build a gateway with default collaborators over a transport.
    pub fn new(config: GatewayConfig, transport: Rc<dyn HttpTransport>) -> Result<Self, GatewayError> {
        GatewayBuilder::new(config).with_transport(transport).build()
    }

    /// Classifier in use.
    pub fn classifier(&self) -> &RequestClassifier {
        &self.classifier
    }

    /// Cache key builder in use.
    pub fn keys(&self) -> &CacheKeyBuilder {
        &self.keys
    }

    /// Number of renders currently in flight.
    pub fn renders_in_flight(&self) -> usize {
        self.renders.len()
    }

    /// Handle one request.
    ///
    /// Fails only when the origin cannot be reached on a path that needs it.
    pub async fn handle(&self, request: IncomingRequest) -> Result<Handled, GatewayError> {
        let mut scope = RequestScope {
            logger: StructuredLogger::new(request.id().clone())
                .with_component("gateway")
                .with_path(request.path())
                .with_format(self.log_format)
                .with_min_level(self.log_level),
            timing: TimingContext::new(),
            metrics: MetricsCollector::new(
                request.id().clone(),
                request.method().as_str(),
                request.path(),
            ),
            background: BackgroundTasks::new(),
        };

        let classification = self.classifier.classify(
            request.method(),
            request.path(),
            request.user_agent(),
            request.accept(),
        );
        let signature = classification
            .is_bot()
            .then(|| self.classifier.matched_signature(request.user_agent()))
            .flatten();
        scope.timing.enter(RequestPhase::Classified(classification));
        scope.metrics.record_classification(classification, signature);
        scope
            .logger
            .debug_builder("request classified")
            .field("classification", classification.name())
            .field("signature", signature.unwrap_or("-"))
            .emit();

        let result = match classification {
            Classification::PassThrough | Classification::Skip => {
                self.forward(&request, &mut scope, RequestPhase::Forwarded).await
            }
            Classification::Human => self
                .forward(&request, &mut scope, RequestPhase::HumanForwarded)
                .await
                .map(|response| self.annotator.annotate(response, &DiagnosticHeaders::human())),
            Classification::Bot => self.serve_bot(&request, &mut scope).await.map(|response| {
                if request.is_head() {
                    response.without_body()
                } else {
                    response
                }
            }),
        };

        let RequestScope {
            logger,
            timing,
            metrics,
            background,
        } = scope;

        match result {
            Ok(response) => {
                let metrics = metrics.finalize(Some(response.status().as_u16()), &timing);
                logger
                    .info_builder("request completed")
                    .json("metrics", metrics.to_value())
                    .emit();
                Ok(Handled {
                    response,
                    background,
                })
            }
            Err(error) => {
                let metrics = metrics.finalize(None, &timing);
                logger
                    .error_builder("request failed")
                    .field("error", error.to_string())
                    .json("metrics", metrics.to_value())
                    .emit();
                Err(error)
            }
        }
    }

    async fn forward(
        &self,
        request: &IncomingRequest,
        scope: &mut RequestScope,
        phase: RequestPhase,
    ) -> Result<GatewayResponse, GatewayError> {
        let start = Instant::now();
        let target = self.keys.build_target(request);
        let response = self.origin.fetch(request, &target).await?;
        scope.metrics.record_origin(start.elapsed());
        scope.timing.enter(phase);
        Ok(response)
    }

    async fn serve_bot(
        &self,
        request: &IncomingRequest,
        scope: &mut RequestScope,
    ) -> Result<GatewayResponse, GatewayError> {
        scope.timing.enter(RequestPhase::BotLookup);
        let key = self.keys.build_cache_key(request);

        let lookup = self.cache.lookup(&key).await;
        scope.metrics.record_cache_status(lookup.status().as_str());
        match lookup {
            CacheLookup::Hit(entry) => {
                scope.timing.enter(RequestPhase::CacheHit);
                return Ok(self
                    .annotator
                    .annotate(entry.to_response(), &DiagnosticHeaders::hit()));
            }
            CacheLookup::Unavailable(error) => {
                scope
                    .logger
                    .warn_builder("cache lookup failed, treating as miss")
                    .field("key", key.as_str())
                    .field("error", error.to_string())
                    .emit();
            }
            CacheLookup::Miss => {}
        }
        scope.timing.enter(RequestPhase::CacheMiss);

        let target = self.keys.build_target(request);
        scope.timing.enter(RequestPhase::Rendering);

        let render = {
            let renderer = self.renderer.clone();
            let logger = scope.logger.clone();
            let target = target.clone();
            let user_agent = request.user_agent().to_string();
            self.renders.join_or_start(&key, move || {
                async move {
                    let outcome = renderer.render(&target, &user_agent).await;
                    if let Some(error) = &outcome.close_error {
                        logger
                            .warn_builder("browser session close failed")
                            .field("error", error.to_string())
                            .emit();
                    }
                    outcome.page
                }
                .boxed_local()
            })
        };
        let leader = render.is_leader();
        scope
            .logger
            .debug_builder("render started")
            .field("target", target.as_str())
            .field_bool("shared", !leader)
            .json("renders_in_flight", self.renders_in_flight().into())
            .emit();
        let result = render.wait().await;
        let render_time = scope
            .timing
            .since(&RequestPhase::Rendering)
            .unwrap_or_default();

        scope.metrics.record_render(
            render_time,
            !leader,
            result.as_ref().err().map(RenderError::reason),
        );

        match result {
            Ok(page) => {
                scope.timing.enter(RequestPhase::Rendered);
                let entry = self.cache.entry_for(&key, page.html);
                let response = entry.to_response();

                if leader {
                    let cache = self.cache.clone();
                    let logger = scope.logger.clone();
                    scope.background.spawn(async move {
                        if let Err(error) = cache.put(&key, entry).await {
                            logger
                                .warn_builder("snapshot store failed")
                                .field("key", key.as_str())
                                .field("error", error.to_string())
                                .emit();
                        }
                    });
                }

                Ok(self
                    .annotator
                    .annotate(response, &DiagnosticHeaders::rendered(!leader)))
            }
            Err(error) => {
                scope
                    .logger
                    .warn_builder("render failed, serving origin")
                    .field("reason", error.reason())
                    .field("error", error.to_string())
                    .field_bool("shared", !leader)
                    .duration_ms("render_ms", render_time)
                    .emit();

                let origin_start = Instant::now();
                let response = self.fallback.fallback(request, &target, &error).await?;
                scope.metrics.record_origin(origin_start.elapsed());
                scope.timing.enter(RequestPhase::FallbackServed);
                Ok(response)
            }
        }
    }
}

impl std::fmt::Debug for PrerenderGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrerenderGateway")
            .field("origin", &self.keys.origin())
            .field("renderer", &self.renderer)
            .field("diagnostics", &self.annotator.is_enabled())
            .finish_non_exhaustive()
    }
}
