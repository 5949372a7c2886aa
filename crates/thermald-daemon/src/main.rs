//! thermald
//!
//! Reports CPU, HDD and NVMe temperatures once as JSON, or serves them over
//! HTTP from a time-to-live cache.

mod config;
mod state;
mod web;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thermald_sensors::{catalog, DeviceReader, TemperatureCache};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use state::AppState;

#[derive(Parser)]
#[command(name = "thermald")]
#[command(about = "Report CPU, HDD and NVMe temperatures as JSON")]
#[command(disable_version_flag = true)]
struct Cli {
    /// Run as a daemon serving temperatures over HTTP
    #[arg(short, long)]
    daemon: bool,

    /// Port number
    #[arg(short, long)]
    port: Option<u16>,

    /// Cache duration in seconds
    #[arg(short = 't', long = "cache")]
    cache: Option<u64>,

    /// Endpoint for the HTTP server
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Print version and exit
    #[arg(short = 'v', long)]
    version: bool,
}

impl Cli {
    /// Loads the config file, if any, and applies flag overrides.
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                let config = Config::load(path)
                    .with_context(|| format!("Failed to load {}", path.display()))?;
                info!("Loaded configuration from: {}", path.display());
                config
            }
            None => Config::default(),
        };

        config.daemon |= self.daemon;
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(cache) = self.cache {
            config.cache = cache;
        }
        if let Some(endpoint) = self.endpoint {
            config.endpoint = endpoint;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Host conditions that prevent startup.
#[derive(Error, Debug)]
enum StartupError {
    #[error("This program requires root privileges")]
    NotRoot,

    #[error("This program is only supported on Linux")]
    UnsupportedHost,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version {
        println!("thermald version: {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Setup logging
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_writer(std::io::stderr)
        .init();

    check_host()?;

    let config = cli.into_config()?;
    for tool in [&config.tools.smartctl, &config.tools.nvme] {
        if !tool_available(tool) {
            warn!("{} command not found, its devices will not be available", tool);
        }
    }

    info!("Daemon mode: {}", config.daemon);
    info!("Port: {}", config.port);
    info!("Cache duration: {} seconds", config.cache);

    // Discover devices and take initial readings
    let entries = catalog::discover(&config.search_paths())?;
    let reader: Arc<dyn DeviceReader> = Arc::new(config.host_devices());
    let initial = catalog::build(entries, Arc::clone(&reader)).await;

    if !config.daemon {
        let json = serde_json::to_string_pretty(&initial.records)
            .context("Error formatting JSON")?;
        println!("{}", json);
        return Ok(());
    }

    let cache = TemperatureCache::new(initial.records, config.cache, reader);
    let state = Arc::new(AppState::new(cache, config.endpoint_path()));
    let app = web::create_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Error starting HTTP server on {}", addr))?;
    info!("Starting server on http://{}{}", addr, state.endpoint());

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server failed")?;

    Ok(())
}

fn check_host() -> Result<(), StartupError> {
    if !cfg!(target_os = "linux") {
        return Err(StartupError::UnsupportedHost);
    }
    // SAFETY: geteuid has no preconditions and cannot fail.
    if unsafe { libc::geteuid() } != 0 {
        return Err(StartupError::NotRoot);
    }
    Ok(())
}

/// Returns true if `tool` is an existing path or is found on `PATH`.
fn tool_available(tool: &str) -> bool {
    if tool.contains('/') {
        return Path::new(tool).is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(tool).is_file()))
        .unwrap_or(false)
}

async fn shutdown_signal() {
    let mut sigterm =
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                info!("Received SIGINT, shutting down");
                return;
            }
        };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down");
        }
    }
}
