//! headlinerd: personalized landing-page message service.
//!
//! Serves the generation endpoints over HTTP. One process holds one
//! message cache shared by every request.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use headliner::server::config::{Config, Secrets};
use headliner::server::create_router;

/// Headliner daemon: generates campaign-aware landing-page copy.
#[derive(Parser)]
#[command(name = "headlinerd")]
#[command(version = headliner::PKG_VERSION)]
#[command(about = "Personalized landing-page message service")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Override the bind address from the configuration.
    #[arg(short, long)]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: info for the daemon; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load configuration
    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;

    if secrets.api_key().is_none() {
        // startup still succeeds; every generation will fail upstream
        warn!("no API key configured, generation requests will fail");
    }

    let service = config.builder(&secrets).build()?;

    // Parse address
    let address = args.address.unwrap_or(config.server.address);
    let addr: SocketAddr = address.parse().map_err(|e| {
        headliner::HeadlinerError::Configuration(format!("Invalid address: {e}"))
    })?;

    info!(
        version = headliner::PKG_VERSION,
        %addr,
        model = %service.options().model,
        "headlinerd starting"
    );

    let app = create_router(Arc::new(service));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
