//! pulse-ai - NPS enrichment microservice
//!
//! **Module Identity:**
//! - Name: pulse-ai (Survey Enrichment)
//! - Default port: 5741
//!
//! Stores NPS survey responses and enriches the free-text comments with
//! sentiment and topics through a local Ollama-style endpoint. The
//! dashboard talks to this service over HTTP REST + SSE.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pulse_common::events::EventBus;

use pulse_ai::config::AiSettings;
use pulse_ai::AppState;

/// Command-line arguments for pulse-ai
#[derive(Parser, Debug)]
#[command(name = "pulse-ai")]
#[command(about = "Survey enrichment microservice for Pulse")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5741", env = "PULSE_AI_PORT")]
    port: u16,

    /// Root folder holding the database (overrides environment and TOML)
    #[arg(short, long, env = "PULSE_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulse_ai=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting pulse-ai (Survey Enrichment) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 1: Resolve root folder
    let toml_config = pulse_common::config::load_toml_config("pulse-ai");
    let resolver = pulse_common::config::RootFolderResolver::new("pulse-ai")
        .with_cli_override(args.root_folder.clone());
    let root_folder = resolver.resolve();

    // Step 2: Create root folder directory if missing
    let initializer = pulse_common::config::RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;

    // Step 3: Open or create database
    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());

    let db_pool = pulse_ai::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Step 4: Resolve enrichment settings (database > environment > TOML)
    let settings = AiSettings::resolve(&db_pool, &toml_config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to resolve settings: {}", e))?;

    // Event bus for SSE broadcasting
    let event_bus = EventBus::new(100); // 100 event capacity

    let state = AppState::new(db_pool, event_bus, &settings)
        .map_err(|e| anyhow::anyhow!("Failed to build application state: {}", e))?;

    let app = pulse_ai::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
