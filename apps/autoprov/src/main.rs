//! autoprov entry point.

mod app;
mod config;
mod servers;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Fetches a client configuration from the first provisioning endpoint that answers.
#[derive(Debug, Parser)]
#[command(name = "autoprov", version)]
pub struct Args {
    /// Path to the TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Activation link to provision from directly (`<scheme>://import?url=...`).
    #[arg(long)]
    pub deep_link: Option<String>,

    /// Provision even if servers are already configured.
    #[arg(long)]
    pub force: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting autoprov");

    let config = config::Config::load(args.config.as_deref())?;
    tracing::info!(
        primary = %config.provisioning.primary_url,
        relays = config.provisioning.fallback_relay_urls.len(),
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config, &args))
}
