//! Configuration management commands.

use std::fs;

use anyhow::{bail, Result};
use prerender_classify::RequestClassifier;
use prerender_core::GatewayConfig;

use super::{ConfigArgs, ConfigCommand};
use crate::context::Context;
use crate::output::format_duration;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Init {
            path,
            origin,
            force,
        } => init_config(&path, &origin, force, ctx).await,
        ConfigCommand::Validate => validate_config(ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    let config = ctx.gateway_config()?;

    if ctx.output.is_json() {
        ctx.output.json(&config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    ctx.output.kv("origin", &config.origin);

    ctx.output.info("");
    ctx.output.info("[skip]");
    ctx.output.kv("exact", &config.skip.exact.join(", "));
    ctx.output.kv("prefixes", &config.skip.prefixes.join(", "));

    ctx.output.info("");
    ctx.output.info("[render]");
    ctx.output.kv("webdriver_url", &config.render.webdriver_url);
    ctx.output.kv("timeout_ms", &config.render.timeout_ms.to_string());
    ctx.output.kv("wait", config.render.wait.name());

    ctx.output.info("");
    ctx.output.info("[cache]");
    ctx.output.kv("key_prefix", &config.cache.key_prefix);
    ctx.output
        .kv("max_age", &format_duration(config.cache.max_age_secs));
    ctx.output.kv(
        "stale_while_revalidate",
        &format_duration(config.cache.stale_while_revalidate_secs),
    );

    ctx.output.info("");
    ctx.output.info("[diagnostics]");
    ctx.output.kv("enabled", &config.diagnostics.enabled.to_string());
    ctx.output.kv("worker_tag", &config.diagnostics.worker_tag);

    ctx.output.info("");
    ctx.output.info("[logging]");
    ctx.output.kv("level", &config.logging.level);
    ctx.output.kv("format", &config.logging.format);

    ctx.output.info("");
    ctx.output.info(&format!("Bot signatures ({}):", config.bots.signatures.len()));
    for signature in &config.bots.signatures {
        ctx.output.list_item(signature);
    }

    Ok(())
}

async fn init_config(path: &str, origin: &str, force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.resolve_path(path);

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let content = generate_default_config(origin);
    // Refuse to write a file the gateway would reject.
    GatewayConfig::from_toml_str(&content)?;
    fs::write(&config_path, content)?;

    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}

async fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    let config = ctx.gateway_config()?;
    RequestClassifier::from_config(&config)?;

    let warnings = lint(&config);
    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "valid": true,
            "warnings": warnings,
        }));
        return Ok(());
    }

    if warnings.is_empty() {
        ctx.output.success("Configuration is valid");
    } else {
        ctx.output.success("Configuration is valid (with warnings)");
    }

    Ok(())
}

/// Settings that are accepted but probably unintended.
fn lint(config: &GatewayConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.bots.signatures.is_empty() {
        warnings.push("bots.signatures is empty; no request will be prerendered".to_string());
    }

    if config.cache.max_age_secs == 0 {
        warnings.push("cache.max_age_secs is 0; snapshots will not be cached downstream".to_string());
    }

    if config.diagnostics.enabled && config.diagnostics.worker_tag.is_empty() {
        warnings.push("diagnostics.worker_tag is empty".to_string());
    }

    if config.origin.starts_with("http://") {
        warnings.push(format!("origin '{}' is not https", config.origin));
    }

    warnings
}

/// Default `prerender.toml` contents.
pub fn generate_default_config(origin: &str) -> String {
    format!(
        r#"# Prerender gateway configuration

origin = "{origin}"

[skip]
exact = ["/logout", "/login"]
prefixes = ["/api", "/~api", "/admin", "/wp-admin", "/wp-json"]

# [bots]
# Crawler user-agent patterns, matched case-insensitively in order.
# Leave unset to use the built-in list.
# signatures = ["Googlebot", "Bingbot", "GPTBot"]

[render]
webdriver_url = "http://127.0.0.1:9515"
timeout_ms = 30000
# load | dom-content-loaded | network-idle | network-almost-idle
wait = "network-almost-idle"

[cache]
key_prefix = "prerender"
max_age_secs = 900
stale_while_revalidate_secs = 86400

[diagnostics]
enabled = false
worker_tag = "prerender-worker"

[logging]
# debug | info | warn | error
level = "info"
# json | human
format = "json"
"#,
        origin = origin
    )
}
