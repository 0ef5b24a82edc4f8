//! Router configuration for the image vault.
//!
//! This module defines the HTTP routes and applies middleware for token
//! authentication and CORS.
//!
//! # Route Structure
//!
//! ```text
//! /health                 - Health check (public)
//! /register_user          - Registration (public)
//! /auth                   - Token issuance (public)
//! /api/upload_image       - Image ingestion (token required)
//! /api/get_image          - Image retrieval (token required)
//! /api/get_logs           - Server log retrieval (token required)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use image_vault::server::{create_router, AppState, RouterConfig, TokenService};
//!
//! let state = AppState::new(store, tokens, "server.log");
//! let router = create_router(state, RouterConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use http::header::{HeaderName, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::store::MediaStore;

use super::auth::token_middleware;
use super::handlers::{
    auth_handler, get_image_handler, get_logs_handler, health_handler, register_handler,
    upload_image_handler, AppState,
};

/// Default cap on uploaded request bodies. Axum's stock 2 MB limit is too
/// small for camera images.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Maximum accepted upload body size in bytes
    pub max_upload_bytes: usize,
}

impl RouterConfig {
    /// Create a router configuration with defaults: any CORS origin, tracing
    /// enabled, 32 MB upload cap.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Set specific allowed CORS origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Set the maximum accepted upload body size.
    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// The `/api` subtree is nested first and then layered with the token
/// middleware, so the middleware sees every protected route; registration,
/// authentication and the health check stay public.
pub fn create_router<S>(state: AppState<S>, config: RouterConfig) -> Router
where
    S: MediaStore + 'static,
{
    let cors = build_cors_layer(&config);
    let tokens = state.tokens.clone();

    let api_routes = Router::new()
        .route("/upload_image", post(upload_image_handler::<S>))
        .route("/get_image", get(get_image_handler::<S>))
        .route("/get_logs", get(get_logs_handler::<S>))
        .layer(middleware::from_fn_with_state(tokens, token_middleware))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes));

    let public_routes = Router::new()
        .route("/register_user", post(register_handler::<S>))
        .route("/auth", post(auth_handler::<S>))
        .route("/health", get(health_handler));

    let router = Router::new()
        .nest("/api", api_routes)
        .merge(public_routes)
        .with_state(state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static("access_token"),
            HeaderName::from_static("imageid"),
            HeaderName::from_static("compressionparameters"),
        ])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => {
            // No origins allowed - this effectively disables CORS
            cors
        }
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
