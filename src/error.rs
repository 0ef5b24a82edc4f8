use thiserror::Error;

/// Errors from the persistence backend.
///
/// Uniqueness conflicts are *not* errors: they are reported as typed results
/// by the store (`add_user` returning `false`, `SaveOutcome::AlreadyExists`).
/// Anything that surfaces here is an infrastructure failure and maps to a
/// 5xx response at the request boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database query or connection failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failed to build the connection pool at startup
    #[error("connection pool error: {0}")]
    Pool(String),
}

/// Errors from the image pipeline.
#[derive(Debug, Clone, Error)]
pub enum ImageError {
    /// Payload could not be decoded as an image (malformed or unsupported bytes)
    #[error("failed to decode image: {message}")]
    Decode { message: String },

    /// Re-encoding the processed image failed
    #[error("failed to encode image: {message}")]
    Encode { message: String },
}
