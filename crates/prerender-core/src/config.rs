//! Static gateway configuration.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Crawler user-agent signatures matched by default, in evaluation order.
pub const DEFAULT_BOT_SIGNATURES: &[&str] = &[
    // Search engines
    "Googlebot",
    "Google-InspectionTool",
    "Bingbot",
    // AI / LLM crawlers
    "GPTBot",
    "ChatGPT-User",
    "ClaudeBot",
    "Google-Extended",
    "PerplexityBot",
    "Amazonbot",
    "meta-externalagent",
    // Social previews
    "facebookexternalhit",
    "Twitterbot",
    "LinkedInBot",
    "Slackbot",
    "WhatsApp",
    // SEO tools
    "AhrefsBot",
    "SemrushBot",
    "MJ12bot",
    "Screaming Frog",
    "XML[- ]?Sitemaps",
];

/// Path prefixes that are never prerendered by default.
pub const DEFAULT_SKIP_PREFIXES: &[&str] = &["/api", "/~api", "/admin", "/wp-admin", "/wp-json"];

/// Exact paths that are never prerendered by default.
pub const DEFAULT_SKIP_EXACT: &[&str] = &["/logout", "/login"];

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Origin base URL, e.g. `https://app.example.com`.
    pub origin: String,

    /// Paths excluded from rendering.
    #[serde(default)]
    pub skip: SkipConfig,

    /// Crawler detection.
    #[serde(default)]
    pub bots: BotConfig,

    /// Browser rendering.
    #[serde(default)]
    pub render: RenderConfig,

    /// Snapshot cache.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Diagnostic response headers.
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    /// Gateway log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Create a configuration with defaults for everything but the origin.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            skip: SkipConfig::default(),
            bots: BotConfig::default(),
            render: RenderConfig::default(),
            cache: CacheConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Parse a TOML configuration and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self, CoreError> {
        let config: Self = toml::from_str(content).map_err(|e| CoreError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON configuration and validate it.
    pub fn from_json_str(content: &str) -> Result<Self, CoreError> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| CoreError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file; `.json` files are parsed as JSON, anything
    /// else as TOML.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        };
        config.with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Check the configuration for values the gateway cannot run with.
    ///
    /// Bot signature patterns are compiled (and therefore checked) by the
    /// classifier.
    pub fn validate(&self) -> Result<(), CoreError> {
        let origin = self.origin.trim();
        if !(origin.starts_with("http://") || origin.starts_with("https://")) {
            return Err(CoreError::InvalidConfig(format!(
                "origin must be an absolute http(s) URL, got '{}'",
                self.origin
            )));
        }
        if origin.trim_end_matches('/').contains('?') || origin.contains('#') {
            return Err(CoreError::InvalidConfig(
                "origin must not carry a query or fragment".to_string(),
            ));
        }

        for prefix in &self.skip.prefixes {
            if !prefix.starts_with('/') {
                return Err(CoreError::InvalidConfig(format!(
                    "skip prefix '{}' must start with '/'",
                    prefix
                )));
            }
        }
        for path in &self.skip.exact {
            if !path.starts_with('/') {
                return Err(CoreError::InvalidConfig(format!(
                    "skip path '{}' must start with '/'",
                    path
                )));
            }
        }

        if self.render.timeout_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "render.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(CoreError::InvalidConfig(format!(
                "logging.level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.logging.level
            )));
        }
        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(CoreError::InvalidConfig(format!(
                "logging.format must be one of {}, got '{}'",
                LOG_FORMATS.join(", "),
                self.logging.format
            )));
        }

        if self.cache.key_prefix.is_empty() {
            return Err(CoreError::InvalidConfig(
                "cache.key_prefix must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Paths that bypass rendering entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkipConfig {
    /// Exact path matches.
    #[serde(default = "default_skip_exact")]
    pub exact: Vec<String>,
    /// Path prefixes.
    #[serde(default = "default_skip_prefixes")]
    pub prefixes: Vec<String>,
}

fn default_skip_exact() -> Vec<String> {
    DEFAULT_SKIP_EXACT.iter().map(|s| s.to_string()).collect()
}

fn default_skip_prefixes() -> Vec<String> {
    DEFAULT_SKIP_PREFIXES.iter().map(|s| s.to_string()).collect()
}

impl Default for SkipConfig {
    fn default() -> Self {
        Self {
            exact: default_skip_exact(),
            prefixes: default_skip_prefixes(),
        }
    }
}

/// Crawler detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Case-insensitive regular expressions matched against the user-agent,
    /// evaluated in order.
    #[serde(default = "default_bot_signatures")]
    pub signatures: Vec<String>,
}

fn default_bot_signatures() -> Vec<String> {
    DEFAULT_BOT_SIGNATURES.iter().map(|s| s.to_string()).collect()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            signatures: default_bot_signatures(),
        }
    }
}

/// When navigation is considered finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaitPolicy {
    /// The `load` event fired.
    Load,
    /// The `DOMContentLoaded` event fired.
    DomContentLoaded,
    /// No network connections for a settle period.
    NetworkIdle,
    /// At most a couple of long-lived connections remain open. Tolerates
    /// single-page apps that keep sockets open.
    #[default]
    NetworkAlmostIdle,
}

impl WaitPolicy {
    /// Get the name of this policy.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "dom-content-loaded",
            Self::NetworkIdle => "network-idle",
            Self::NetworkAlmostIdle => "network-almost-idle",
        }
    }
}

/// Browser rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// WebDriver endpoint of the rendering service.
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    /// Navigation timeout in milliseconds.
    #[serde(default = "default_render_timeout_ms")]
    pub timeout_ms: u64,
    /// Navigation wait policy.
    #[serde(default)]
    pub wait: WaitPolicy,
}

fn default_webdriver_url() -> String {
    "http://127.0.0.1:9515".to_string()
}

fn default_render_timeout_ms() -> u64 {
    30_000
}

impl RenderConfig {
    /// Navigation timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            timeout_ms: default_render_timeout_ms(),
            wait: WaitPolicy::default(),
        }
    }
}

/// Snapshot cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Namespace prefix for storage keys.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// `max-age` advertised on rendered snapshots.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
    /// `stale-while-revalidate` advertised on rendered snapshots.
    #[serde(default = "default_swr_secs")]
    pub stale_while_revalidate_secs: u64,
}

fn default_key_prefix() -> String {
    "prerender".to_string()
}

fn default_max_age_secs() -> u64 {
    900
}

fn default_swr_secs() -> u64 {
    86_400
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            max_age_secs: default_max_age_secs(),
            stale_while_revalidate_secs: default_swr_secs(),
        }
    }
}

/// Diagnostic header settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Whether diagnostic headers are added to responses.
    #[serde(default)]
    pub enabled: bool,
    /// Value of the worker identity header.
    #[serde(default = "default_worker_tag")]
    pub worker_tag: String,
}

fn default_worker_tag() -> String {
    "prerender-worker".to_string()
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            worker_tag: default_worker_tag(),
        }
    }
}

/// Accepted `logging.level` values.
pub const LOG_LEVELS: &[&str] = &["debug", "info", "warn", "error"];

/// Accepted `logging.format` values.
pub const LOG_FORMATS: &[&str] = &["json", "human"];

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level written.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `json` for log aggregation, `human` for local development.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
