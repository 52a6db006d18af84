//! Prerender CLI - Command line tool for the prerender gateway.
//!
//! Commands:
//! - `prerender classify` - Show how the gateway would classify a request
//! - `prerender key` - Show the origin target and snapshot cache key for a URL
//! - `prerender config` - Manage gateway configuration

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{ClassifyArgs, ConfigArgs, KeyArgs};

/// Prerender CLI - Inspect and configure the prerender gateway
#[derive(Parser)]
#[command(name = "prerender")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a request the way the gateway would
    Classify(ClassifyArgs),

    /// Show the origin target URL and cache key for a request URL
    Key(KeyArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let output = output::Output::new(cli.verbose, cli.json);

    let config_path = cli.config.as_deref();
    let ctx = context::Context::load(config_path, output)?;

    let result = match cli.command {
        Commands::Classify(args) => commands::classify::run(args, &ctx).await,
        Commands::Key(args) => commands::key::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
