//! imgvote-server - blind image comparison survey service
//!
//! Serves the participant API (sessions, next item, votes), public results
//! and the admin summary over one SQLite database.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use imgvote_common::config::{default_database_path, load_survey_config};
use imgvote_common::db::{init_database, partition};
use imgvote_server::{build_router, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for imgvote-server
#[derive(Parser, Debug)]
#[command(name = "imgvote-server")]
#[command(about = "Blind image comparison survey service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "IMGVOTE_PORT")]
    port: u16,

    /// Address to bind
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// SQLite database file
    #[arg(short, long, env = "IMGVOTE_DATABASE")]
    database: Option<PathBuf>,

    /// Survey configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Admin summary secret (overrides the config file)
    #[arg(long, env = "IMGVOTE_ADMIN_SECRET", hide_env_values = true)]
    admin_secret: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imgvote_server=info,imgvote_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any database delay
    info!(
        "Starting imgvote-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let mut config =
        load_survey_config(args.config.as_deref()).context("Failed to load survey config")?;
    if args.admin_secret.is_some() {
        config.admin_secret = args.admin_secret;
    }
    config.validate().context("Invalid survey config")?;

    info!(
        "Survey mode: {}, models: {:?}, completion goal: {}",
        config.mode, config.models, config.completion_goal
    );
    if config.admin_secret.is_none() {
        warn!("No admin secret configured; /admin/summary will refuse every request");
    }

    let db_path = args.database.unwrap_or_else(default_database_path);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let mut conn = pool.acquire().await.context("Failed to acquire connection")?;
    let chunks = partition::chunk_count(&mut conn).await?;
    drop(conn);
    if chunks == 0 {
        if config.allow_unpartitioned {
            warn!("No chunks built; sessions will cover the whole catalog");
        } else {
            error!("No chunks built; session creation will fail until build-chunks has run");
        }
    } else {
        info!("✓ {} chunks available", chunks);
    }

    let app = build_router(AppState::new(pool, config));

    let addr = SocketAddr::new(args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("imgvote-server listening on http://{}", addr);
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
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
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
