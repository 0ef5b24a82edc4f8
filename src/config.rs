//! Configuration management for the image vault.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `VAULT_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use image_vault::config::Config;
//!
//! // Parse from command line and environment
//! let config = Config::parse();
//!
//! println!("Listening on {}", config.bind_address());
//! println!("Database: {}@{}", config.db_name, config.db_host);
//! ```
//!
//! # Environment Variables
//!
//! All configuration options can be set via environment variables with the
//! `VAULT_` prefix:
//!
//! - `VAULT_HOST` - Server bind address (default: 0.0.0.0)
//! - `VAULT_PORT` - Server port (default: 8080)
//! - `VAULT_DB_HOST` - PostgreSQL host (default: localhost)
//! - `VAULT_DB_PORT` - PostgreSQL port (default: 5432)
//! - `VAULT_DB_NAME` - Database name (required)
//! - `VAULT_DB_USER` - Database user (required)
//! - `VAULT_DB_PASSWORD` - Database password
//! - `VAULT_DB_MAX_CONNECTIONS` - Pool size (default: 5)
//! - `VAULT_AUTH_SECRET` - HMAC secret for access tokens (required)
//! - `VAULT_TOKEN_TTL` - Token lifetime in seconds (default: 30)
//! - `VAULT_LOG_FILE` - Append-only log file path (default: server.log)
//! - `VAULT_CORS_ORIGINS` - Allowed CORS origins (comma-separated)

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::server::auth::DEFAULT_TOKEN_TTL;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default PostgreSQL host.
pub const DEFAULT_DB_HOST: &str = "localhost";

/// Default PostgreSQL port.
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Default connection pool size.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Default log file path.
pub const DEFAULT_LOG_FILE: &str = "server.log";

// =============================================================================
// CLI Arguments
// =============================================================================

/// Image Vault - An authenticated image ingestion and retrieval service.
///
/// Accepts image uploads over HTTP, transcodes them to JPEG, and stores them
/// in PostgreSQL keyed by caller-supplied identifiers.
#[derive(Parser, Debug, Clone)]
#[command(name = "image-vault")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "VAULT_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "VAULT_PORT")]
    pub port: u16,

    // =========================================================================
    // Database Configuration
    // =========================================================================
    /// PostgreSQL host.
    #[arg(long, default_value = DEFAULT_DB_HOST, env = "VAULT_DB_HOST")]
    pub db_host: String,

    /// PostgreSQL port.
    #[arg(long, default_value_t = DEFAULT_DB_PORT, env = "VAULT_DB_PORT")]
    pub db_port: u16,

    /// Database name.
    #[arg(long, env = "VAULT_DB_NAME")]
    pub db_name: String,

    /// Database user.
    #[arg(long, env = "VAULT_DB_USER")]
    pub db_user: String,

    /// Database password.
    #[arg(long, default_value = "", env = "VAULT_DB_PASSWORD")]
    pub db_password: String,

    /// Maximum number of pooled database connections.
    #[arg(long, default_value_t = DEFAULT_DB_MAX_CONNECTIONS, env = "VAULT_DB_MAX_CONNECTIONS")]
    pub db_max_connections: u32,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Secret key for HMAC-SHA256 token signing.
    #[arg(long, env = "VAULT_AUTH_SECRET")]
    pub auth_secret: String,

    /// Access token lifetime in seconds. Deliberately short: clients are
    /// expected to re-authenticate and retry when a token lapses.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL.as_secs(), env = "VAULT_TOKEN_TTL")]
    pub token_ttl: u64,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Path of the append-only log file (also served by /api/get_logs).
    #[arg(long, default_value = DEFAULT_LOG_FILE, env = "VAULT_LOG_FILE")]
    pub log_file: PathBuf,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "VAULT_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.auth_secret.is_empty() {
            return Err(
                "Auth secret is required. Set --auth-secret or VAULT_AUTH_SECRET".to_string(),
            );
        }

        if self.db_name.is_empty() {
            return Err("Database name is required. Set --db-name or VAULT_DB_NAME".to_string());
        }

        if self.db_user.is_empty() {
            return Err("Database user is required. Set --db-user or VAULT_DB_USER".to_string());
        }

        if self.token_ttl == 0 {
            return Err("token_ttl must be greater than 0".to_string());
        }

        if self.db_max_connections == 0 {
            return Err("db_max_connections must be greater than 0".to_string());
        }

        Ok(())
    }

    /// The socket address string to bind the server to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Token lifetime as a [`Duration`].
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl)
    }
}

// =============================================================================
// Tests
// =============================================================================
