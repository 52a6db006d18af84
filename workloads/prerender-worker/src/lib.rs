//! Spin component serving the prerender gateway.
//!
//! Every request is handed to `PrerenderGateway`; the response is written and
//! its body closed before deferred snapshot writes run, so crawlers never wait
//! on the key-value store.
//!
//! The handler itself only exists on `wasm32`. Request conversion, config
//! loading and store selection build on every target.

#[cfg(target_arch = "wasm32")]
mod component;
mod ingress;

use std::rc::Rc;

use prerender_cache::{CacheResult, CacheStore, UnavailableStore};
use prerender_core::{CoreError, GatewayConfig};
use prerender_observability::StructuredLogger;

const CONFIG: &str = include_str!("../prerender.toml");

/// Configuration baked into the component.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn gateway_config() -> Result<GatewayConfig, CoreError> {
    GatewayConfig::from_toml_str(CONFIG)
}

/// Use the opened store, or fall back to one that fails every operation.
///
/// Behind the fallback every lookup is a miss and snapshot writes are dropped.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn cache_store<S: CacheStore + 'static>(
    opened: CacheResult<S>,
    logger: &StructuredLogger,
) -> Rc<dyn CacheStore> {
    match opened {
        Ok(store) => Rc::new(store),
        Err(e) => {
            logger
                .warn_builder("key-value store unavailable, serving uncached")
                .field("error", e.to_string())
                .emit();
            Rc::new(UnavailableStore::new(e.to_string()))
        }
    }
}
