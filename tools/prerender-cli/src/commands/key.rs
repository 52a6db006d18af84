//! Cache key inspection command.

use anyhow::Result;
use prerender_cache::CacheKeyBuilder;
use prerender_core::IncomingRequest;
use serde::Serialize;

use super::KeyArgs;
use crate::context::Context;

#[derive(Serialize)]
struct KeyReport {
    url: String,
    target: String,
    key: String,
}

/// Run the key command.
pub async fn run(args: KeyArgs, ctx: &Context) -> Result<()> {
    let config = ctx.gateway_config_or_default(args.origin.as_deref())?;
    let report = describe(&CacheKeyBuilder::from_config(&config), &args.url)?;

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    ctx.output.header("Cache key");
    ctx.output.kv("url", &report.url);
    ctx.output.kv("target", &report.target);
    ctx.output.kv("key", &report.key);

    Ok(())
}

fn describe(keys: &CacheKeyBuilder, url: &str) -> Result<KeyReport> {
    let request = IncomingRequest::get(url)?;
    Ok(KeyReport {
        url: request.url().to_string(),
        target: keys.build_target(&request),
        key: keys.build_cache_key(&request).to_string(),
    })
}
