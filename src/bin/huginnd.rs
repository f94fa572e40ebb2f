//! huginnd — Huginn daemon.
//!
//! Serves the cache-backed adapters, the AI gateway and request statistics
//! over HTTP.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use huginn::server::config::{Config, Secrets};
use huginn::server::{AppState, LiveStreamConfig, build_huginn, router};

/// Huginn daemon — caching API gateway with provider fallback.
#[derive(Parser)]
#[command(name = "huginnd")]
#[command(version = huginn::PKG_VERSION)]
#[command(about = "Huginn API gateway daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "HUGINN_CONFIG")]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load configuration
    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;

    let huginn = build_huginn(&config, &secrets)?;

    // Parse address
    let addr: SocketAddr = config
        .server
        .address
        .parse()
        .map_err(|e| huginn::HuginnError::Configuration(format!("Invalid address: {e}")))?;

    // Hourly request-log pruning
    let stats = huginn.stats.clone();
    let prune_every = Duration::from_secs(config.stats.prune_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(prune_every);
        loop {
            interval.tick().await;
            stats.prune().await;
        }
    });

    let state = AppState::new(huginn)
        .with_base_path(config.base_path())
        .with_live(LiveStreamConfig {
            interval: Duration::from_secs(config.stats.live_interval_secs.max(1)),
            full_every: config.stats.live_full_every,
            max_duration: Duration::from_secs(config.stats.live_max_secs),
        });
    let app = router(state);

    info!(version = huginn::PKG_VERSION, %addr, base_path = %config.base_path(), "huginnd starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
