//! visionary - HTTP API for Bria image generation and product photography.

mod config;
mod form;
mod server;


use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use visionary_studio::{BriaProvider, Credential, Poller, Studio};

use config::{Config, FileConfig, API_KEY_ENV};

/// HTTP API for Bria image generation and product photography.
#[derive(Parser, Debug)]
#[command(name = "visionary")]
#[command(about = "HTTP API for Bria image generation and product photography")]
struct Args {
    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (e.g. :8000, 127.0.0.1:8000)
    #[arg(long)]
    listen: Option<String>,

    /// Provider base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine.
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(args.verbose);

    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let config = Config::resolve(
        args.listen,
        args.base_url,
        file,
        std::env::var(API_KEY_ENV).ok(),
    );
    info!(?config, "configuration loaded");

    let studio = build_studio(&config)?;
    if !studio.has_default_credential() {
        warn!("{API_KEY_ENV} not set; every request must carry api_key");
    }

    server::serve(&config.listen, studio, config.pending_ttl).await
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn build_studio(config: &Config) -> Result<Studio> {
    let client = visionary_bria::Client::builder()
        .base_url(&config.base_url)
        .timeout(config.timeout)
        .build()?;
    let poller = Poller::http(config.probe_timeout, config.retry)?;

    Ok(Studio::new(Arc::new(BriaProvider::new(client)), poller)
        .with_default_credential(config.api_key.as_deref().and_then(Credential::new)))
}
