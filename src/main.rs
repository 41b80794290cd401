//! Demo S3 server over the in-memory backend.

use clap::Parser;
use sandbar::config::Config;
use sandbar::memory::{MemoryBackend, StaticAuth};
use sandbar::server::Sandbar;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// sandbar - S3-compatible object storage server (in-memory backend)
#[derive(Parser, Debug)]
#[command(name = "sandbar")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Listen address (overrides config)
    #[arg(short, long, value_name = "ADDR")]
    listen: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = if let Some(ref path) = cli.config {
        Config::from_file(path)?
    } else {
        Config::default()
    };

    let log_level = if cli.verbose {
        "sandbar=trace,tower_http=trace".to_string()
    } else {
        config.log_level.clone()
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let listen_addr = match cli.listen {
        Some(ref addr) => addr.parse()?,
        None => config.listen_addr,
    };

    info!("Starting sandbar S3 server");
    info!("  Listen address: {listen_addr}");
    info!("  Location: {}", config.location);

    let backend = Arc::new(MemoryBackend::new(config.location.clone()));

    let mut server = Sandbar::new();
    server.service = backend.clone();
    server.bucket = backend.clone();
    server.object = backend.clone();
    server.multipart = backend;
    if let Some((access_key, secret_key)) = config.credentials() {
        info!("  Auth: signature verification enabled for {access_key}");
        server.auth = Some(Arc::new(StaticAuth::new().with_key(access_key, secret_key)));
    } else {
        warn!("  Auth: disabled, all requests accepted");
    }

    let listener = TcpListener::bind(listen_addr).await?;
    info!("sandbar listening on http://{listen_addr}");

    axum::serve(listener, server.router())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Handle shutdown signals (SIGINT, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
