//! HTTP client for the image vault API.
//!
//! [`VaultClient`] owns the credential/token lifecycle on the caller's side:
//! it caches the most recently issued token and, when an `/api` request comes
//! back 403 (expired or invalidated token), re-authenticates **exactly once**
//! and replays the request. A second 403 is surfaced to the caller. The
//! server itself never retries anything.
//!
//! # Example
//!
//! ```ignore
//! use image_vault::client::VaultClient;
//! use image_vault::image::CompressionParams;
//!
//! let client = VaultClient::new("http://localhost:8080", "alice", "p1");
//!
//! client.register().await?;
//! client.authenticate().await?;
//!
//! let params = CompressionParams { quality: Some(85), width: Some(500), height: Some(200) };
//! client.upload_image("img1", image_bytes, &params).await?;
//!
//! let stored = client.get_image("img1").await?;
//! ```

use reqwest::StatusCode;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::image::CompressionParams;
use crate::server::{
    AuthResponse, Credentials, ACCESS_TOKEN_HEADER, COMPRESSION_PARAMS_HEADER, IMAGE_ID_HEADER,
};

// =============================================================================
// Types
// =============================================================================

/// Client-side failures.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connection, timeout, malformed response)
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// `/auth` rejected the stored credentials
    #[error("authentication failed ({status}): {message}")]
    AuthFailed { status: u16, message: String },

    /// The server answered with a non-success status
    #[error("request failed ({status}): {message}")]
    Failed { status: u16, message: String },
}

/// API client holding credentials and a cached access token.
pub struct VaultClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    token: Mutex<Option<String>>,
}

impl VaultClient {
    /// Create a client for the service at `base_url` (e.g.
    /// `"http://localhost:8080"`).
    pub fn new(
        base_url: impl Into<String>,
        user_name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: Credentials {
                user_name: user_name.into(),
                password: password.into(),
            },
            token: Mutex::new(None),
        }
    }

    /// Register the stored credentials. Succeeds (200) both for a fresh
    /// registration and for an already-taken name; the returned message
    /// distinguishes the two.
    pub async fn register(&self) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.url("/register_user"))
            .json(&self.credentials)
            .send()
            .await?;

        Ok(Self::expect_success(response).await?.text().await?)
    }

    /// Exchange the stored credentials for a fresh access token, replacing
    /// the cached one.
    pub async fn authenticate(&self) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.url("/auth"))
            .json(&self.credentials)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ClientError::AuthFailed {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let auth: AuthResponse = response.json().await?;
        *self.token.lock().await = Some(auth.access_token.clone());
        Ok(auth.access_token)
    }

    /// Upload an image under `image_id` with the given transcoding
    /// parameters. Returns the server's text message ("saved" or
    /// "already exist").
    pub async fn upload_image(
        &self,
        image_id: &str,
        bytes: Vec<u8>,
        params: &CompressionParams,
    ) -> Result<String, ClientError> {
        let params_json =
            serde_json::to_string(params).expect("compression params serialize to JSON");

        let response = self
            .send_authorized(|token| {
                self.http
                    .post(self.url("/api/upload_image"))
                    .header(ACCESS_TOKEN_HEADER, token)
                    .header(IMAGE_ID_HEADER, image_id)
                    .header(COMPRESSION_PARAMS_HEADER, params_json.as_str())
                    .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                    .body(bytes.clone())
            })
            .await?;

        Ok(Self::expect_success(response).await?.text().await?)
    }

    /// Fetch the stored bytes for `image_id`.
    pub async fn get_image(&self, image_id: &str) -> Result<Vec<u8>, ClientError> {
        let response = self
            .send_authorized(|token| {
                self.http
                    .get(self.url("/api/get_image"))
                    .header(ACCESS_TOKEN_HEADER, token)
                    .header(IMAGE_ID_HEADER, image_id)
            })
            .await?;

        Ok(Self::expect_success(response).await?.bytes().await?.to_vec())
    }

    /// Fetch the server's log file contents.
    pub async fn get_logs(&self) -> Result<String, ClientError> {
        let response = self
            .send_authorized(|token| {
                self.http
                    .get(self.url("/api/get_logs"))
                    .header(ACCESS_TOKEN_HEADER, token)
            })
            .await?;

        Ok(Self::expect_success(response).await?.text().await?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Current token, authenticating first if none is cached.
    async fn token(&self) -> Result<String, ClientError> {
        let cached = self.token.lock().await.clone();
        match cached {
            Some(token) => Ok(token),
            None => self.authenticate().await,
        }
    }

    /// Send an authorized request, re-authenticating once on 403.
    ///
    /// The retry covers the expected expired-token case. Any 403 on the
    /// replayed request (or a failed re-authentication) is surfaced.
    async fn send_authorized<F>(&self, build: F) -> Result<reqwest::Response, ClientError>
    where
        F: Fn(&str) -> reqwest::RequestBuilder,
    {
        let token = self.token().await?;
        let response = build(&token).send().await?;

        if response.status() != StatusCode::FORBIDDEN {
            return Ok(response);
        }

        let reason = response.text().await.unwrap_or_default();
        debug!("token rejected ({}), re-authenticating once", reason);

        let token = self.authenticate().await?;
        Ok(build(&token).send().await?)
    }

    async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(ClientError::Failed {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            })
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
