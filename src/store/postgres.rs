//! PostgreSQL-backed media store.
//!
//! One process-wide [`PgPool`] is created at startup and shared by all
//! requests; connections are acquired per operation and returned on every
//! exit path. The `users` and `images` tables are created idempotently by
//! [`PgMediaStore::init_schema`] before the server starts accepting traffic.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::info;

use crate::config::Config;
use crate::error::StoreError;

use super::{MediaStore, SaveOutcome, User};

/// Upper bound on waiting for a pooled connection. Keeps a saturated or
/// unreachable database from stalling requests indefinitely.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_USERS_TABLE: &str = "\
    CREATE TABLE IF NOT EXISTS users(
        id SERIAL PRIMARY KEY,
        user_name VARCHAR(255),
        password VARCHAR(255),
        UNIQUE(user_name))";

const CREATE_IMAGES_TABLE: &str = "\
    CREATE TABLE IF NOT EXISTS images(
        id SERIAL PRIMARY KEY,
        image_id VARCHAR(255),
        image BYTEA,
        UNIQUE(image_id))";

/// PostgreSQL implementation of [`MediaStore`].
#[derive(Clone)]
pub struct PgMediaStore {
    pool: PgPool,
}

impl PgMediaStore {
    /// Connect to PostgreSQL using the database parameters from `config`.
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        let options = PgConnectOptions::new()
            .host(&config.db_host)
            .port(config.db_port)
            .database(&config.db_name)
            .username(&config.db_user)
            .password(&config.db_password);

        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool (used by tests running against a live database).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `users` and `images` tables if they do not exist.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_USERS_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_IMAGES_TABLE).execute(&self.pool).await?;
        info!("database schema ready");
        Ok(())
    }

    /// Close the pool, waiting for in-flight operations to finish.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl MediaStore for PgMediaStore {
    async fn get_user(&self, user_name: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, user_name, password FROM users WHERE user_name = $1",
        )
        .bind(user_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn add_user(&self, user_name: &str, password: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("INSERT INTO users(user_name, password) VALUES ($1, $2)")
            .bind(user_name)
            .bind(password)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_image(&self, image_id: &str, data: &[u8]) -> Result<SaveOutcome, StoreError> {
        let result = sqlx::query("INSERT INTO images(image_id, image) VALUES ($1, $2)")
            .bind(image_id)
            .bind(data)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(SaveOutcome::Saved),
            Err(e) if is_unique_violation(&e) => Ok(SaveOutcome::AlreadyExists),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_image(&self, image_id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let image = sqlx::query_scalar::<_, Vec<u8>>(
            "SELECT image FROM images WHERE image_id = $1",
        )
        .bind(image_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(image)
    }
}

/// Check for a Postgres unique constraint violation (SQLSTATE 23505).
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}
