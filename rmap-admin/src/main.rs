//! rmap-admin - Resource Map admin backend
//!
//! Upload wizard (stage, geocode, preview, promote) plus manual listing
//! management. Binds to the configured `admin_bind` address (default
//! 127.0.0.1:5050).

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rmap_admin::AppState;
use rmap_common::config::{load_config, CONFIG_ENV_VAR};
use rmap_common::db::init_database;

#[derive(Debug, Parser)]
#[command(name = "rmap-admin", version, about = "Resource Map admin backend")]
struct Args {
    /// Path to the TOML config file
    #[arg(long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting rmap-admin (Resource Map admin backend)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    info!("Database: {}", config.database.display());
    let db_pool = init_database(&config.database).await?;
    info!("Database connection established");

    let bind = args.bind.unwrap_or_else(|| config.admin_bind.clone());
    let state = AppState::new(db_pool, config)?;
    let app = rmap_admin::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("Listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app).await?;

    Ok(())
}
