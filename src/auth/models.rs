//! Authentication data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User ID type
pub type UserId = i64;

/// Outward-facing user model.
///
/// This is the only serializable user representation and it carries no
/// password hash, so the hash can never leak through a response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Internal user row including the password hash.
///
/// Only the store layer and the login path see this type; it is never
/// serialized.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Strip the password hash, producing the outward representation.
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            email: self.email,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Persisted refresh-token record.
///
/// The secret is single-use: rotation deletes the record before issuing a
/// replacement, and logout or lazy expiry detection deletes it outright.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: i64,
    pub user_id: UserId,
    pub secret: String,
    pub expires_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Access/refresh token pair returned by login and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// JWT claims for access tokens.
///
/// `sub` is a fixed-width `i64` end to end; it must never pass through a
/// floating-point intermediate, which would silently lose precision for
/// large ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// User ID
    pub sub: UserId,
    /// Issued-at timestamp (unix seconds)
    pub iat: i64,
    /// Expiration timestamp (unix seconds)
    pub exp: i64,
}
