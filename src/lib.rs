//! # Image Vault
//!
//! An authenticated image ingestion and retrieval service backed by
//! PostgreSQL.
//!
//! Clients register an account, exchange their credentials for a short-lived
//! signed token, and use it to upload and fetch images. Uploads are decoded,
//! resized to a requested bounding box, re-encoded to a canonical JPEG, and
//! stored under a caller-supplied identifier with insert-if-absent semantics:
//! an id is written exactly once and never overwritten.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`mod@image`] - Decode/resize/encode pipeline
//! - [`store`] - Persistence trait and the PostgreSQL backend
//! - [`server`] - Axum-based HTTP server: token auth, handlers, routes
//! - [`client`] - API client with the one-shot re-authentication retry
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use image_vault::{create_router, AppState, RouterConfig, TokenService};
//! use image_vault::store::PgMediaStore;
//!
//! # async fn run(store: PgMediaStore) {
//! let tokens = TokenService::new("my-secret-key", Duration::from_secs(30));
//! let state = AppState::new(store, tokens, "server.log");
//! let router = create_router(state, RouterConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//! axum::serve(listener, router).await.unwrap();
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod image;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use client::{ClientError, VaultClient};
pub use config::Config;
pub use error::{ImageError, StoreError};
pub use self::image::{
    decode, process_upload, CompressionParams, DecodedImage, CANONICAL_FORMAT,
    DEFAULT_JPEG_QUALITY, MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
pub use server::{
    create_router, token_middleware, ApiError, AppState, AuthResponse, Credentials,
    HealthResponse, RouterConfig, TokenClaims, TokenError, TokenService, ACCESS_TOKEN_HEADER,
    COMPRESSION_PARAMS_HEADER, IMAGE_ID_HEADER,
};
pub use store::{MediaStore, PgMediaStore, SaveOutcome, User};
