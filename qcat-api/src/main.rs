//! qcat-api - Quantum computing catalog service
//!
//! Serves the catalog REST API on `127.0.0.1:6626` unless configured
//! otherwise. The SQLite database lives in the resolved root folder.

use anyhow::{Context, Result};
use clap::Parser;
use qcat_api::{build_router, AppState};
use qcat_common::config::{
    load_toml_config, LoggingConfig, PaginationConfig, RootFolderInitializer, RootFolderResolver,
    TomlConfig,
};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "qcat-api", version, about = "Quantum computing catalog service")]
struct Args {
    /// Root folder holding the catalog database
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Listen address
    #[arg(long, env = "QCAT_HOST")]
    host: Option<String>,

    /// Listen port
    #[arg(long, env = "QCAT_PORT")]
    port: Option<u16>,

    /// Config file to use instead of the platform locations
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Install the tracing subscriber; `RUST_LOG` overrides the configured level
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config problems are reported once logging is up
    let (toml_config, config_error) = match load_toml_config(args.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (None, Some(e)),
    };
    let config = toml_config.clone().unwrap_or_default();

    init_tracing(&config.logging)?;

    info!(
        "Starting qcat-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if let Some(e) = config_error {
        warn!("Ignoring config file: {}", e);
    }

    let pagination = match config.pagination.validate() {
        Ok(()) => config.pagination,
        Err(e) => {
            warn!("{}; using default page sizes", e);
            PaginationConfig::default()
        }
    };

    // Root folder: CLI > env > TOML > compiled default
    let resolver = RootFolderResolver::new(args.root_folder, toml_config.as_ref());
    let initializer = RootFolderInitializer::new(resolver.resolve());
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());

    let pool = qcat_common::db::init_database(&db_path)
        .await
        .context("Failed to open catalog database")?;
    info!("Database connection established");

    let state = AppState::new(pool, pagination);
    let app = build_router(state);

    let addr = listen_address(&args.host, args.port, &config);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// CLI/env values win over the `[server]` section
fn listen_address(host: &Option<String>, port: Option<u16>, config: &TomlConfig) -> String {
    let host = host
        .clone()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    format!("{}:{}", host, port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcat_common::config::{DEFAULT_HOST, DEFAULT_PORT};

    #[test]
    fn test_listen_address_defaults() {
        let config = TomlConfig::default();
        assert_eq!(
            listen_address(&None, None, &config),
            format!("{}:{}", DEFAULT_HOST, DEFAULT_PORT)
        );
    }

    #[test]
    fn test_listen_address_cli_overrides_config() {
        let mut config = TomlConfig::default();
        config.server.port = 7000;
        assert_eq!(
            listen_address(&Some("0.0.0.0".to_string()), None, &config),
            "0.0.0.0:7000"
        );
        assert_eq!(
            listen_address(&Some("  ".to_string()), Some(8080), &config),
            "127.0.0.1:8080"
        );
    }
}
