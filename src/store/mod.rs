//! Persistence layer for users and image payloads.
//!
//! The [`MediaStore`] trait is the seam between the request handlers and the
//! concrete backend: handlers are generic over it, and integration tests
//! inject an in-memory implementation. The production backend is
//! [`PgMediaStore`], a PostgreSQL store.
//!
//! Uniqueness of `user_name` and `image_id` is enforced by the store itself
//! (UNIQUE constraints), never by caller-side check-then-act, so
//! insert-if-absent holds even when two conflicting inserts race: exactly one
//! wins, the rest observe a deterministic conflict result.

mod postgres;

use async_trait::async_trait;

use crate::error::StoreError;

pub use postgres::PgMediaStore;

/// A registered user, as stored.
///
/// `password` is kept verbatim; cleartext storage is a known defect, kept
/// for compatibility with existing clients. See DESIGN.md.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Server-assigned row id
    pub id: i32,

    /// Unique, immutable login name
    pub user_name: String,

    /// Stored credential (cleartext, see above)
    pub password: String,
}

/// Outcome of an image insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The payload was stored under the given id
    Saved,

    /// An image with this id already exists; nothing was written
    AlreadyExists,
}

/// Persistence operations needed by the request handlers.
///
/// All methods are insert/read only: users and images are never updated or
/// deleted. Infrastructure failures surface as [`StoreError`]; expected
/// conflicts are part of the return types.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Look up a user by name.
    async fn get_user(&self, user_name: &str) -> Result<Option<User>, StoreError>;

    /// Insert a user if the name is free. Returns `true` if the user was
    /// created, `false` if the name was already taken.
    async fn add_user(&self, user_name: &str, password: &str) -> Result<bool, StoreError>;

    /// Insert an image payload if the id is free. Never overwrites.
    async fn save_image(&self, image_id: &str, data: &[u8]) -> Result<SaveOutcome, StoreError>;

    /// Fetch the stored payload for an image id.
    async fn get_image(&self, image_id: &str) -> Result<Option<Vec<u8>>, StoreError>;
}
