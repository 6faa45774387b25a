//! rdsmond - the RDS enhanced monitoring exporter daemon.
//!
//! Assembles the exporter:
//! - Inventory and log providers (loaded from a JSON fixture)
//! - Inventory cache + periodic refresher
//! - Incremental collector
//! - HTTP scrape endpoint and index page
//!
//! # Usage
//!
//! ```text
//! rdsmond serve --listen-address 0.0.0.0:9408 --telemetry-path /metrics \
//!     --config-file rdsmon.toml --fixture inventory.json
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};

use rdsmon_collector::{CollectorSettings, IncrementalCollector};
use rdsmon_core::{ExporterConfig, Fixture};
use rdsmon_inventory::{InventoryCache, Refresher};

#[derive(Parser)]
#[command(name = "rdsmond", about = "RDS enhanced monitoring exporter")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the scrape endpoint.
    Serve {
        /// Address to listen on.
        #[arg(long, default_value = "0.0.0.0:9408")]
        listen_address: SocketAddr,

        /// Path under which metrics are exposed.
        #[arg(long, default_value = "/metrics")]
        telemetry_path: String,

        /// Optional TOML config file.
        #[arg(long)]
        config_file: Option<PathBuf>,

        /// JSON fixture with inventory and log streams.
        #[arg(long)]
        fixture: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,rdsmond=debug,rdsmon=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            listen_address,
            telemetry_path,
            config_file,
            fixture,
        } => run_serve(listen_address, telemetry_path, config_file, fixture).await,
    }
}

async fn run_serve(
    listen_address: SocketAddr,
    telemetry_path: String,
    config_file: Option<PathBuf>,
    fixture: PathBuf,
) -> anyhow::Result<()> {
    info!("rdsmon exporter starting");

    let config = match &config_file {
        Some(path) => ExporterConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ExporterConfig::default(),
    };
    let region = config.resolve_region(std::env::var("AWS_REGION").ok());
    info!(%region, "region resolved");

    // ── Providers ──────────────────────────────────────────────

    let (inventory_provider, log_provider) = Fixture::from_file(&fixture)
        .with_context(|| format!("loading fixture {}", fixture.display()))?
        .into_providers();
    info!(path = ?fixture, "fixture providers loaded");

    // ── Inventory ──────────────────────────────────────────────

    let cache = InventoryCache::new(Arc::new(inventory_provider));
    match cache.refresh().await {
        Ok(stats) => info!(resources = stats.resources_cached, "initial inventory loaded"),
        Err(e) => warn!(error = %e, "initial inventory refresh failed"),
    }

    let refresh_interval = config.refresh_interval()?;
    let refresher = Refresher::new(cache.clone(), refresh_interval);

    // ── Collector ──────────────────────────────────────────────

    let settings = CollectorSettings::from_config(&config)?;
    info!(
        max_in_flight = settings.max_in_flight,
        pace_ms = settings.pace.as_millis() as u64,
        fetch_limit = settings.fetch_limit,
        "collector initialized"
    );
    let collector = IncrementalCollector::new(cache, Arc::new(log_provider), settings);

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresher_handle = tokio::spawn(refresher.run(shutdown_rx));

    // ── HTTP server ────────────────────────────────────────────

    let router = rdsmon_api::build_router(collector, &telemetry_path, &region);
    info!(addr = %listen_address, path = %telemetry_path, "listening");

    let listener = tokio::net::TcpListener::bind(listen_address).await?;

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    })
    .await?;

    let _ = refresher_handle.await;

    info!("rdsmon exporter stopped");
    Ok(())
}
