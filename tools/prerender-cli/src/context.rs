//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use prerender_core::GatewayConfig;

use crate::output::Output;

/// File names searched for when `--config` is not given.
pub const CONFIG_NAMES: &[&str] = &["prerender.toml", ".prerender.toml", "prerender.json"];

/// Origin used when no config file is available.
pub const PLACEHOLDER_ORIGIN: &str = "https://app.example.com";

/// Execution context for CLI commands.
pub struct Context {
    /// Config file in effect, if any.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Resolve the config file and build the context.
    ///
    /// An explicit path is used as given even if it does not exist yet, so
    /// `config init --config <path>` can create it.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let config_path = match config_path {
            Some(path) => Some(resolve(&cwd, path)),
            None => Self::find_config(&cwd),
        };

        if let Some(ref path) = config_path {
            output.debug(&format!("Using config {}", path.display()));
        }

        Ok(Self {
            config_path,
            output,
            cwd,
        })
    }

    /// Find a config file in the directory tree.
    fn find_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            for name in CONFIG_NAMES {
                let config_path = current.join(name);
                if config_path.is_file() {
                    return Some(config_path);
                }
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Load and validate the gateway config. Fails when there is no config file.
    pub fn gateway_config(&self) -> Result<GatewayConfig> {
        let path = self
            .config_path
            .as_ref()
            .context("No config file found. Run `prerender config init` to create one.")?;
        GatewayConfig::load(path)
    }

    /// Load the gateway config, or fall back to defaults with `origin`.
    pub fn gateway_config_or_default(&self, origin: Option<&str>) -> Result<GatewayConfig> {
        let mut config = match self.config_path {
            Some(_) => self.gateway_config()?,
            None => {
                self.output
                    .debug("No config file found, using built-in defaults");
                GatewayConfig::new(PLACEHOLDER_ORIGIN)
            }
        };

        if let Some(origin) = origin {
            config.origin = origin.to_string();
            config.validate()?;
        }

        Ok(config)
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        resolve(&self.cwd, path)
    }
}

fn resolve(cwd: &Path, path: &str) -> PathBuf {
    if Path::new(path).is_absolute() {
        PathBuf::from(path)
    } else {
        cwd.join(path)
    }
}
