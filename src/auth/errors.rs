//! Authentication error types.

use std::time::Duration;
use thiserror::Error;

/// Authentication and session lifecycle errors.
///
/// Security-relevant causes are deliberately collapsed at the variant
/// level: a login failure is always [`AuthError::InvalidCredentials`]
/// whether the account exists or not, and a refresh failure is always
/// [`AuthError::RefreshInvalid`] whether the secret was unknown, expired,
/// or already consumed. The real cause is logged internally.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed input, reported with field-level detail
    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// Account with this email already exists
    #[error("Account already exists")]
    Conflict,

    /// Login failed (unknown account or wrong password, uniformly)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Refresh secret unknown, expired, or already consumed (uniformly)
    #[error("Invalid refresh token")]
    RefreshInvalid,

    /// Missing or invalid access token
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Password hashing failed (e.g. malformed cost parameters)
    #[error("Password hashing failed")]
    HashingFailed,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JWT encoding error
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Storage operation exceeded its deadline
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information.
    ///
    /// Database, crypto, and JWT failures are sanitized to a generic
    /// internal-error string before crossing the boundary.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::Database(_)
            | AuthError::Jwt(_)
            | AuthError::HashingFailed
            | AuthError::Timeout(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether this error is an unexpected internal fault rather than a
    /// normal outcome of the operation.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::Database(_)
                | AuthError::Jwt(_)
                | AuthError::HashingFailed
                | AuthError::Timeout(_)
        )
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
