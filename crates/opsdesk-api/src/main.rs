//! Main entry point for the opsdesk API server

use clap::Parser;
use opsdesk_api::build_router;
use opsdesk_core::{Config, context_error, context_error::Result, init_logging};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Opsdesk admin dashboard API server
#[derive(Debug, Parser)]
#[command(name = "opsdesk-server", version, about)]
struct Args {
    /// Address to bind, overrides `server.host`
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overrides `server.port`
    #[arg(short, long)]
    port: Option<u16>,

    /// Configuration file; `config.*` in the working directory otherwise
    #[arg(short, long, env = "OPSDESK_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (for development convenience)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Note: .env file not loaded: {e}");
    }

    let args = Args::parse();

    let mut config = Config::load_from(args.config.as_deref())
        .map_err(|e| context_error!("Failed to load configuration: {}", e))?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_logging(&config.logging)?;

    info!("╔══════════════════════════════════════════════════════════╗");
    info!(
        "║            Opsdesk API Server v{}                     ║",
        env!("CARGO_PKG_VERSION")
    );
    info!("╚══════════════════════════════════════════════════════════╝");
    if !config.api.seed_sample_data {
        warn!("Sample data disabled, starting with empty stores");
    }

    let app = build_router(config.clone())?;

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|e| context_error!("Invalid server address: {}", e))?;

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| context_error!("Failed to bind to {}: {}", addr, e))?;

    info!("🌐 API:     http://{}/api", addr);
    info!("💚 Health:  http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| context_error!("Server error: {}", e))?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received terminate signal, shutting down gracefully...");
        },
    }
}
