//! Image Vault - An authenticated image ingestion and retrieval service.
//!
//! This binary starts the HTTP server and configures all components.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_vault::{
    config::Config,
    server::{create_router, AppState, RouterConfig, TokenService},
    store::PgMediaStore,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    run_serve(config).await
}

async fn run_serve(config: Config) -> ExitCode {
    // Initialize logging first; the file sink must exist before anything logs
    if let Err(e) = init_logging(&config) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("image-vault v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!(
        "  Database: {}@{}:{}/{}",
        config.db_user, config.db_host, config.db_port, config.db_name
    );
    info!("  Token TTL: {}s", config.token_ttl);
    info!("  Log file: {}", config.log_file.display());

    // Create the connection pool and bootstrap the schema
    info!("Connecting to PostgreSQL...");
    let store = match PgMediaStore::connect(&config).await {
        Ok(store) => {
            info!("  Connected successfully");
            store
        }
        Err(e) => {
            error!("  Failed to connect: {}", e);
            error!("");
            error!("  Please check:");
            error!(
                "    - PostgreSQL is running and reachable at {}:{}",
                config.db_host, config.db_port
            );
            error!("    - The database credentials and name are correct");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = store.init_schema().await {
        error!("Failed to initialize the database schema: {}", e);
        return ExitCode::FAILURE;
    }

    // Build application state and router
    let tokens = TokenService::new(&config.auth_secret, config.token_ttl());
    let state = AppState::new(store.clone(), tokens, &config.log_file);
    let router = create_router(state, build_router_config(&config));

    // Bind and serve
    let addr = config.bind_address();
    info!("Server listening on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    let result = axum::serve(listener, router).await;

    // Scoped pool lifecycle: drain connections on every exit path
    store.close().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing/logging subsystem: an ANSI layer on stdout and a
/// plain-text layer appending to the log file served by `/api/get_logs`.
fn init_logging(config: &Config) -> Result<(), String> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .map_err(|e| format!("cannot open log file {}: {}", config.log_file.display(), e))?;

    let env_filter = if config.verbose {
        "image_vault=debug,tower_http=debug"
    } else {
        "image_vault=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
        .init();

    Ok(())
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new().with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}
