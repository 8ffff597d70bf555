use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leadboard::auth::accounts::ensure_bootstrap_admin;
use leadboard::config::Config;
use leadboard::engine::spawn_session_sweeper;
use leadboard::AppState;

#[derive(Parser, Debug)]
#[command(name = "leadboard")]
#[command(author, version, about = "Account and session backend for the lead board", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "leadboard.toml", env = "LEADBOARD_CONFIG")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;

    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting leadboard v{}", env!("CARGO_PKG_VERSION"));

    let db = leadboard::db::init(&config.database.url).await?;
    let state = Arc::new(AppState::new(config, db));

    if let Some(admin) = &state.config.auth.bootstrap_admin {
        ensure_bootstrap_admin(state.users.as_ref(), admin)
            .await
            .context("Failed to create bootstrap admin")?;
    }

    let sweeper = spawn_session_sweeper(state.sessions.clone(), &state.config.sessions);
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);

    let app = leadboard::api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
