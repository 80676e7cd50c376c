//! mealplan-server - weekly meal planner HTTP service
//!
//! Resolves the root folder, opens (or creates) the database, and serves the
//! JSON API until Ctrl+C / SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mealplan_common::config::{RootFolderInitializer, RootFolderResolver, ServiceConfig, TomlConfig};
use mealplan_common::db::init::init_database;
use mealplan_common::session::load_session_secret;
use mealplan_server::{build_router, seed, AppState};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for mealplan-server
#[derive(Parser, Debug)]
#[command(name = "mealplan-server")]
#[command(about = "Weekly meal planner HTTP service")]
#[command(version)]
struct Args {
    /// Folder holding the database and uploaded images
    #[arg(short, long, env = "MEALPLAN_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "MEALPLAN_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "MEALPLAN_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mealplan_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting mealplan-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let toml = TomlConfig::load_or_default();
    let config = ServiceConfig::from_toml(&toml);

    let root_folder = RootFolderResolver::new(args.root_folder, toml).resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to prepare root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path();
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    info!("Database: {}", db_path.display());

    let session_secret = match config.session_secret {
        Some(secret) => {
            info!("Using session secret from config file");
            secret
        }
        None => load_session_secret(&pool)
            .await
            .context("Failed to load session secret")?,
    };

    seed::ensure_default_admin(&pool)
        .await
        .context("Failed to create default user")?;

    let state = AppState::new(pool, session_secret, initializer.uploads_path())
        .with_secure_cookies(config.secure_cookies)
        .with_max_upload_bytes(config.max_upload_bytes);
    let app = build_router(state);

    let host = args.host.unwrap_or(config.host);
    let port = args.port.unwrap_or(config.port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("Invalid listen address {host}:{port}"))?;

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
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
