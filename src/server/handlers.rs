//! HTTP request handlers for the image vault API.
//!
//! # Endpoints
//!
//! - `POST /register_user` - Create a user account
//! - `POST /auth` - Exchange credentials for an access token
//! - `POST /api/upload_image` - Ingest an image (token required)
//! - `GET /api/get_image` - Fetch a stored image (token required)
//! - `GET /api/get_logs` - Fetch the server log (token required)
//! - `GET /health` - Health check
//!
//! The `/api` endpoints sit behind the token middleware
//! ([`super::auth::token_middleware`]); handlers here never re-validate the
//! token. Conflict outcomes (duplicate user, duplicate image id) are reported
//! with a 200 status and a descriptive text body, a wire format existing
//! clients depend on.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{ImageError, StoreError};
use crate::image::{process_upload, CompressionParams};
use crate::store::{MediaStore, SaveOutcome};

use super::auth::TokenService;

/// Request header naming the image being uploaded or fetched.
pub const IMAGE_ID_HEADER: &str = "ImageID";

/// Request header carrying the JSON-encoded [`CompressionParams`].
pub const COMPRESSION_PARAMS_HEADER: &str = "CompressionParameters";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state, passed to all handlers via Axum's State
/// extractor.
pub struct AppState<S: MediaStore> {
    /// The persistence backend
    pub store: Arc<S>,

    /// Token issuance/validation service
    pub tokens: TokenService,

    /// Path of the append-only log file served by `/api/get_logs`
    pub log_file: PathBuf,
}

impl<S: MediaStore> AppState<S> {
    /// Create a new application state.
    pub fn new(store: S, tokens: TokenService, log_file: impl Into<PathBuf>) -> Self {
        Self {
            store: Arc::new(store),
            tokens,
            log_file: log_file.into(),
        }
    }
}

impl<S: MediaStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            tokens: self.tokens.clone(),
            log_file: self.log_file.clone(),
        }
    }
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// Credentials accepted by `/register_user` and `/auth`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Unique login name
    pub user_name: String,

    /// Password, compared verbatim against the stored value
    pub password: String,
}

/// Successful response from `/auth`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Always "success" on the 200 path
    pub status: String,

    /// Signed bearer token for the `/api` endpoints
    pub access_token: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Handler-level failures, mapped to HTTP status codes and plain-text bodies.
///
/// Token failures never appear here; they are rejected by the middleware
/// before a handler runs.
#[derive(Debug)]
pub enum ApiError {
    /// A required request header is absent or not valid UTF-8 (400)
    MissingHeader(&'static str),

    /// The `CompressionParameters` header is present but malformed (400)
    BadParameters(String),

    /// Image pipeline failure (decode: 400, encode: 500)
    Image(ImageError),

    /// Unknown user or password mismatch on `/auth` (401)
    WrongCredentials,

    /// No image stored under the requested id (404)
    ImageNotFound(String),

    /// Persistence failure (500)
    Store(StoreError),

    /// Any other infrastructure failure (500); the detail is logged, not sent
    Internal(String),
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        ApiError::Image(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

/// Convert ApiError to an HTTP response.
///
/// 4xx bodies carry the reason; 5xx bodies are generic and the detail goes to
/// the log. Severity follows the status: 5xx at error, 401 at warn, the rest
/// at debug.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::MissingHeader(name) => (
                StatusCode::BAD_REQUEST,
                format!("missing {} header", name),
            ),

            ApiError::BadParameters(detail) => (
                StatusCode::BAD_REQUEST,
                format!("invalid {} header: {}", COMPRESSION_PARAMS_HEADER, detail),
            ),

            ApiError::Image(inner) => {
                let status = match inner {
                    ImageError::Decode { .. } => StatusCode::BAD_REQUEST,
                    ImageError::Encode { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, inner.to_string())
            }

            ApiError::WrongCredentials => (
                StatusCode::UNAUTHORIZED,
                "wrong user_name or password".to_string(),
            ),

            ApiError::ImageNotFound(image_id) => (
                StatusCode::NOT_FOUND,
                format!("image_id: {} not found", image_id),
            ),

            ApiError::Store(_) | ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        };

        match &self {
            ApiError::Store(err) => {
                error!(status = status.as_u16(), "storage failure: {}", err);
            }
            ApiError::Internal(detail) => {
                error!(status = status.as_u16(), "internal failure: {}", detail);
            }
            ApiError::Image(ImageError::Encode { message }) => {
                error!(status = status.as_u16(), "encode failure: {}", message);
            }
            ApiError::WrongCredentials => {
                warn!(status = status.as_u16(), "authentication rejected");
            }
            _ => {
                debug!(status = status.as_u16(), "request rejected: {}", message);
            }
        }

        (status, message).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle user registration.
///
/// # Endpoint
///
/// `POST /register_user` with a JSON body `{"user_name": ..., "password": ...}`.
///
/// # Response
///
/// `200 OK` with a text body, both for a fresh registration and for a
/// duplicate name. The duplicate case is still a distinct outcome in the
/// store; only the wire status collapses the two.
pub async fn register_handler<S: MediaStore>(
    State(state): State<AppState<S>>,
    Json(credentials): Json<Credentials>,
) -> Result<String, ApiError> {
    let created = state
        .store
        .add_user(&credentials.user_name, &credentials.password)
        .await?;

    if created {
        info!(user_name = %credentials.user_name, "user registered");
        Ok(format!("user {} registered", credentials.user_name))
    } else {
        debug!(user_name = %credentials.user_name, "duplicate registration");
        Ok(format!("user {} already exists", credentials.user_name))
    }
}

/// Handle authentication.
///
/// # Endpoint
///
/// `POST /auth` with a JSON body `{"user_name": ..., "password": ...}`.
///
/// # Response
///
/// - `200 OK` with `{"status": "success", "access_token": ...}` on a match
/// - `401 Unauthorized` on an unknown user or password mismatch, with no
///   distinction between the two cases
pub async fn auth_handler<S: MediaStore>(
    State(state): State<AppState<S>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = state.store.get_user(&credentials.user_name).await?;

    // Verbatim comparison against the stored value. Cleartext credential
    // handling is a known defect kept for wire compatibility; see DESIGN.md.
    match user {
        Some(user) if user.password == credentials.password => {
            info!(user_name = %user.user_name, user_id = user.id, "token issued");
            Ok(Json(AuthResponse {
                status: "success".to_string(),
                access_token: state.tokens.issue(user.id),
            }))
        }
        _ => Err(ApiError::WrongCredentials),
    }
}

/// Handle image uploads.
///
/// # Endpoint
///
/// `POST /api/upload_image` with the raw image bytes as the body and headers:
///
/// - `access_token`: bearer token (checked by the middleware)
/// - `ImageID`: storage key for the payload
/// - `CompressionParameters`: optional JSON `{"quality"?, "width"?, "height"?}`
///
/// # Response
///
/// - `200 OK` "image_id: {id} saved" after decode → resize → JPEG re-encode →
///   insert
/// - `200 OK` "image_id: {id} already exist" when the id is taken; the stored
///   payload is untouched
/// - `400 Bad Request` on a missing `ImageID`, malformed parameters, or an
///   undecodable payload (nothing is stored)
/// - `500 Internal Server Error` on storage failure
pub async fn upload_image_handler<S: MediaStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<String, ApiError> {
    let image_id = require_header(&headers, IMAGE_ID_HEADER)?.to_string();
    let params = parse_compression_params(&headers)?;

    // Decode/resize/encode is CPU-bound; keep it off the async workers.
    let encoded = tokio::task::spawn_blocking(move || process_upload(&body, &params))
        .await
        .map_err(|e| ApiError::Internal(format!("image task panicked: {}", e)))??;

    match state.store.save_image(&image_id, &encoded).await? {
        SaveOutcome::Saved => {
            info!(image_id = %image_id, size = encoded.len(), "image saved");
            Ok(format!("image_id: {} saved", image_id))
        }
        SaveOutcome::AlreadyExists => {
            debug!(image_id = %image_id, "duplicate image id");
            Ok(format!("image_id: {} already exist", image_id))
        }
    }
}

/// Handle image retrieval.
///
/// # Endpoint
///
/// `GET /api/get_image` with headers `access_token` and `ImageID`.
///
/// # Response
///
/// - `200 OK` with the stored bytes and `Content-Type:
///   application/octet-stream`
/// - `404 Not Found` for an unknown id
pub async fn get_image_handler<S: MediaStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let image_id = require_header(&headers, IMAGE_ID_HEADER)?;

    match state.store.get_image(image_id).await? {
        Some(data) => {
            debug!(image_id = %image_id, size = data.len(), "image served");
            Ok((
                [(header::CONTENT_TYPE, "application/octet-stream")],
                data,
            )
                .into_response())
        }
        None => Err(ApiError::ImageNotFound(image_id.to_string())),
    }
}

/// Handle log retrieval.
///
/// # Endpoint
///
/// `GET /api/get_logs` with an `access_token` header.
///
/// # Response
///
/// `200 OK` with the full contents of the server's append-only log file as an
/// opaque text blob.
pub async fn get_logs_handler<S: MediaStore>(
    State(state): State<AppState<S>>,
) -> Result<String, ApiError> {
    tokio::fs::read_to_string(&state.log_file)
        .await
        .map_err(|e| {
            ApiError::Internal(format!(
                "failed to read log file {}: {}",
                state.log_file.display(),
                e
            ))
        })
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Header Parsing
// =============================================================================

fn require_header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, ApiError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::MissingHeader(name))
}

/// Parse the `CompressionParameters` header. A missing header means
/// all-defaults; a present-but-malformed header is a client error.
fn parse_compression_params(headers: &HeaderMap) -> Result<CompressionParams, ApiError> {
    match headers.get(COMPRESSION_PARAMS_HEADER) {
        None => Ok(CompressionParams::default()),
        Some(value) => {
            let raw = value
                .to_str()
                .map_err(|_| ApiError::BadParameters("header is not valid UTF-8".to_string()))?;
            serde_json::from_str(raw).map_err(|e| ApiError::BadParameters(e.to_string()))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
