//! CLI command implementations.

pub mod classify;
pub mod config;
pub mod key;

use clap::{Args, Subcommand};

/// Arguments for the classify command.
#[derive(Args)]
pub struct ClassifyArgs {
    /// Request path, e.g. `/pricing`.
    #[arg(short, long)]
    pub path: String,

    /// HTTP method.
    #[arg(short, long, default_value = "GET")]
    pub method: String,

    /// User-Agent header value.
    #[arg(short, long, default_value = "")]
    pub user_agent: String,

    /// Accept header value.
    #[arg(short, long, default_value = "text/html")]
    pub accept: String,
}

/// Arguments for the key command.
#[derive(Args)]
pub struct KeyArgs {
    /// Full request URL as received by the gateway.
    pub url: String,

    /// Origin base URL (overrides the config file).
    #[arg(short, long)]
    pub origin: Option<String>,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration.
    Show,
    /// Write a default config file.
    Init {
        /// Where to write the config.
        #[arg(short, long, default_value = "prerender.toml")]
        path: String,

        /// Origin base URL.
        #[arg(short, long, default_value = "https://app.example.com")]
        origin: String,

        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}
