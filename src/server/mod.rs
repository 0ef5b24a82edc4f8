//! HTTP server layer for the image vault.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          HTTP Layer                              │
//! │   POST /auth    POST /api/upload_image    GET /api/get_image     │
//! │                                                                  │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │     auth     │  │         routes          │  │
//! │  │ (requests)  │  │(HMAC tokens) │  │    (router config)      │  │
//! │  └─────────────┘  └──────────────┘  └─────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod routes;

pub use auth::{token_middleware, TokenClaims, TokenError, TokenService, ACCESS_TOKEN_HEADER};
pub use handlers::{
    auth_handler, get_image_handler, get_logs_handler, health_handler, register_handler,
    upload_image_handler, ApiError, AppState, AuthResponse, Credentials, HealthResponse,
    COMPRESSION_PARAMS_HEADER, IMAGE_ID_HEADER,
};
pub use routes::{create_router, RouterConfig, DEFAULT_MAX_UPLOAD_BYTES};
