//! Store traits and their PostgreSQL implementations.
//!
//! Stores are abstract capabilities injected into [`crate::auth::AuthManager`],
//! so the orchestration layer can run against Postgres in production and
//! the in-memory doubles in tests.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE users (
//!     id            BIGSERIAL PRIMARY KEY,
//!     email         TEXT NOT NULL UNIQUE,
//!     password_hash TEXT NOT NULL,
//!     created_at    TIMESTAMP NOT NULL DEFAULT NOW(),
//!     updated_at    TIMESTAMP NOT NULL DEFAULT NOW()
//! );
//!
//! CREATE TABLE refresh_tokens (
//!     id         BIGSERIAL PRIMARY KEY,
//!     user_id    BIGINT NOT NULL REFERENCES users(id),
//!     secret     TEXT NOT NULL UNIQUE,
//!     expires_at TIMESTAMP NOT NULL
//! );
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use super::timeouts::{TimeoutError, with_default_timeout};
use crate::auth::{AuthError, AuthResult, RefreshTokenRecord, User, UserId, UserRecord};

/// User persistence operations
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a new user. A duplicate email yields `AuthError::Conflict`.
    async fn create(&self, email: &str, password_hash: &str) -> AuthResult<User>;

    /// Find a user by email, hash included (login path)
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserRecord>>;

    /// Find a user by id
    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<UserRecord>>;
}

/// Refresh-token persistence operations
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new refresh record.
    ///
    /// A secret collision on the unique column is astronomically unlikely
    /// given 32 bytes of entropy and is treated as an internal fault, not
    /// a normal error path.
    async fn save(
        &self,
        user_id: UserId,
        secret: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()>;

    /// Look up a refresh record by secret
    async fn find_by_secret(&self, secret: &str) -> AuthResult<Option<RefreshTokenRecord>>;

    /// Delete a refresh record by secret, returning the number of rows
    /// affected.
    ///
    /// The affected count is load-bearing: rotation uses it to detect that
    /// a concurrent caller already consumed the secret. The delete and the
    /// count report happen in one atomic statement on the store side, never
    /// as separate read-then-write steps.
    async fn delete_by_secret(&self, secret: &str) -> AuthResult<u64>;

    /// Delete all refresh records for a user (bulk session revocation)
    async fn delete_all_for_user(&self, user_id: UserId) -> AuthResult<u64>;
}

/// PostgreSQL implementation of [`UserStore`]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_record_from_row(row: &sqlx::postgres::PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
    }
}

/// Postgres unique_violation, the backstop for duplicate registration races
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, email: &str, password_hash: &str) -> AuthResult<User> {
        let result = with_default_timeout(
            sqlx::query(
                "INSERT INTO users (email, password_hash) VALUES ($1, $2)
                 RETURNING id, created_at, updated_at",
            )
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool),
        )
        .await;

        match result {
            Ok(row) => Ok(User {
                id: row.get("id"),
                email: email.to_string(),
                created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
                updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
            }),
            Err(TimeoutError::Database(err)) if is_unique_violation(&err) => {
                Err(AuthError::Conflict)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserRecord>> {
        let row = with_default_timeout(
            sqlx::query(
                "SELECT id, email, password_hash, created_at, updated_at
                 FROM users WHERE email = $1",
            )
            .bind(email)
            .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(user_record_from_row))
    }

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<UserRecord>> {
        let row = with_default_timeout(
            sqlx::query(
                "SELECT id, email, password_hash, created_at, updated_at
                 FROM users WHERE id = $1",
            )
            .bind(user_id)
            .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(user_record_from_row))
    }
}

/// PostgreSQL implementation of [`SessionStore`]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn save(
        &self,
        user_id: UserId,
        secret: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        with_default_timeout(
            sqlx::query("INSERT INTO refresh_tokens (user_id, secret, expires_at) VALUES ($1, $2, $3)")
                .bind(user_id)
                .bind(secret)
                .bind(expires_at.naive_utc())
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn find_by_secret(&self, secret: &str) -> AuthResult<Option<RefreshTokenRecord>> {
        let row = with_default_timeout(
            sqlx::query(
                "SELECT id, user_id, secret, expires_at
                 FROM refresh_tokens WHERE secret = $1",
            )
            .bind(secret)
            .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.map(|r| RefreshTokenRecord {
            id: r.get("id"),
            user_id: r.get("user_id"),
            secret: r.get("secret"),
            expires_at: r.get::<chrono::NaiveDateTime, _>("expires_at").and_utc(),
        }))
    }

    async fn delete_by_secret(&self, secret: &str) -> AuthResult<u64> {
        let result = with_default_timeout(
            sqlx::query("DELETE FROM refresh_tokens WHERE secret = $1")
                .bind(secret)
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_all_for_user(&self, user_id: UserId) -> AuthResult<u64> {
        let result = with_default_timeout(
            sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
                .bind(user_id)
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected())
    }
}
