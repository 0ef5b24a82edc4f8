//! Access token issuance and validation.
//!
//! This module provides HMAC-SHA256 signed bearer tokens for the API
//! endpoints.
//!
//! # Token Scheme
//!
//! A token carries its claims (the authenticated user id and an absolute
//! expiration timestamp) as a base64url-encoded JSON payload, signed by
//! computing an HMAC-SHA256 over the encoded payload:
//!
//! ```text
//! token = "{base64url(claims_json)}.{hex(HMAC-SHA256(secret, base64url(claims_json)))}"
//! ```
//!
//! Tokens are never persisted; the claims are reconstructed from the
//! presented string on every request.
//!
//! # Security Properties
//!
//! - **Tamper-evident**: the signature is bound to the exact payload bytes;
//!   altering the user id or expiration invalidates it
//! - **Time-limited**: a token is rejected the instant the current time
//!   reaches its expiration
//! - **Constant-time comparison**: signature verification uses constant-time
//!   comparison to prevent timing attacks
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use image_vault::server::auth::TokenService;
//!
//! let tokens = TokenService::new("my-secret-key", Duration::from_secs(30));
//!
//! let token = tokens.issue(42);
//! let claims = tokens.validate(&token).unwrap();
//! assert_eq!(claims.user_id, 42);
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

// =============================================================================
// Types
// =============================================================================

/// HMAC-SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// Request header carrying the bearer token.
pub const ACCESS_TOKEN_HEADER: &str = "access_token";

/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30);

/// Claims embedded in a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Id of the authenticated user
    pub user_id: i32,

    /// Expiration timestamp (Unix epoch seconds)
    pub exp: u64,
}

/// Token validation failures.
///
/// Everything that is not a well-formed, correctly signed, unexpired token
/// collapses into [`TokenError::Invalid`]: malformed structure, undecodable
/// payload, and signature mismatch are deliberately indistinguishable to the
/// caller.
#[derive(Debug, Clone)]
pub enum TokenError {
    /// No `access_token` header on the request
    Missing,

    /// Token is well-formed but past its expiration
    Expired {
        /// When the token expired
        expired_at: u64,
        /// Current time
        current_time: u64,
    },

    /// Token is malformed, has an undecodable payload, or fails signature
    /// verification
    Invalid,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Missing => write!(f, "missing access_token header"),
            TokenError::Expired {
                expired_at,
                current_time,
            } => write!(
                f,
                "token expired at {} (current time: {})",
                expired_at, current_time
            ),
            TokenError::Invalid => write!(f, "invalid token"),
        }
    }
}

impl IntoResponse for TokenError {
    fn into_response(self) -> Response {
        let message = self.to_string();

        // Invalid signatures could indicate an attack, so log at warn level.
        // Expired and missing tokens are common and expected, log at debug.
        match &self {
            TokenError::Invalid => {
                warn!(status = 403, "token validation failed: {}", message);
            }
            _ => {
                debug!(status = 403, "token validation failed: {}", message);
            }
        }

        (StatusCode::FORBIDDEN, message).into_response()
    }
}

// =============================================================================
// Token Service
// =============================================================================

/// Issues and validates signed access tokens.
#[derive(Clone)]
pub struct TokenService {
    /// Secret key for HMAC computation
    secret_key: Vec<u8>,

    /// Lifetime applied to issued tokens
    ttl: Duration,
}

impl TokenService {
    /// Create a new token service.
    ///
    /// # Arguments
    ///
    /// * `secret_key` - The secret key used for HMAC computation. Should be
    ///   at least 32 bytes for security.
    /// * `ttl` - Lifetime of issued tokens.
    pub fn new(secret_key: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
            ttl,
        }
    }

    /// Issue a token for `user_id`, expiring `ttl` from now.
    pub fn issue(&self, user_id: i32) -> String {
        self.issue_with_expiry(user_id, unix_now() + self.ttl.as_secs())
    }

    /// Issue a token with a pinned expiration timestamp.
    ///
    /// Useful for generating tokens for a specific time window, and for
    /// exercising expiry handling in tests.
    pub fn issue_with_expiry(&self, user_id: i32, exp: u64) -> String {
        let claims = TokenClaims { user_id, exp };
        // Serializing a two-field struct of primitives cannot fail
        let payload = serde_json::to_vec(&claims).expect("claims serialize to JSON");
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload);
        let signature = hex::encode(self.compute_mac(&payload_b64));

        format!("{}.{}", payload_b64, signature)
    }

    /// Validate a presented token, returning its claims on success.
    ///
    /// Fails closed: expiry is checked first (reason "expired"), then the
    /// signature is recomputed over the payload segment exactly as carried
    /// and compared in constant time (reason "invalid"). Malformed input of
    /// any kind is "invalid", never a panic.
    pub fn validate(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let (payload_b64, signature) = token.split_once('.').ok_or(TokenError::Invalid)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Invalid)?;
        let claims: TokenClaims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::Invalid)?;

        let current_time = unix_now();
        if current_time >= claims.exp {
            return Err(TokenError::Expired {
                expired_at: claims.exp,
                current_time,
            });
        }

        let provided = hex::decode(signature).map_err(|_| TokenError::Invalid)?;
        let expected = self.compute_mac(payload_b64);

        if provided.ct_eq(&expected).into() {
            Ok(claims)
        } else {
            Err(TokenError::Invalid)
        }
    }

    /// Compute the HMAC-SHA256 over the encoded payload.
    fn compute_mac(&self, payload_b64: &str) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret_key).expect("HMAC can take key of any size");
        mac.update(payload_b64.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_secs()
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Axum middleware guarding the `/api` routes.
///
/// Extracts the bearer token from the `access_token` header, validates it,
/// and rejects unauthorized requests with a 403 status and the validation
/// reason as a plain-text body. Every validation attempt is logged; none is
/// persisted.
pub async fn token_middleware(
    State(tokens): State<TokenService>,
    request: Request,
    next: Next,
) -> Result<Response, TokenError> {
    let token = request
        .headers()
        .get(ACCESS_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(TokenError::Missing)?;

    let claims = tokens.validate(token)?;
    debug!(user_id = claims.user_id, "token accepted");

    Ok(next.run(request).await)
}

// =============================================================================
// Tests
// =============================================================================
