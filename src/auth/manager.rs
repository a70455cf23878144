//! Authentication orchestration.
//!
//! [`AuthManager`] wires the credential manager, token issuer, and injected
//! stores into the register/login/refresh/logout/identify operations. It
//! owns no mutable state of its own; every shared fact lives in the
//! external stores and is reached through their atomicity guarantees.

use super::{
    credentials::CredentialManager,
    errors::{AuthError, AuthResult},
    models::{SessionTokens, User, UserId},
    tokens::TokenIssuer,
};
use crate::db::{SessionStore, UserStore};
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Maximum email length accepted (RFC 5321 path limit)
const MAX_EMAIL_LEN: usize = 254;

/// Minimum password length accepted
const MIN_PASSWORD_LEN: usize = 8;

/// Authentication manager.
///
/// Stores are injected as trait objects so production (Postgres) and tests
/// (in-memory) run the same orchestration code.
#[derive(Clone)]
pub struct AuthManager {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    credentials: CredentialManager,
    tokens: TokenIssuer,
    refresh_ttl: Duration,
}

impl AuthManager {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        credentials: CredentialManager,
        tokens: TokenIssuer,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            credentials,
            tokens,
            refresh_ttl,
        }
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - Malformed email or short password
    /// * `AuthError::Conflict` - An account with this email exists
    pub async fn register(&self, email: &str, password: &str) -> AuthResult<User> {
        validate_email(email)?;
        validate_password(password)?;

        if self.users.find_by_email(email).await?.is_some() {
            return Err(AuthError::Conflict);
        }

        let password_hash = self.credentials.hash(password)?;
        // A concurrent registration between the check and this insert is
        // caught by the unique email constraint and surfaces as Conflict.
        let user = self.users.create(email, &password_hash).await?;

        tracing::info!(user_id = user.id, "account registered");
        Ok(user)
    }

    /// Log in with email and password, starting a new session.
    ///
    /// Unknown email and wrong password return the identical
    /// `InvalidCredentials` value, and both paths run a password
    /// verification so neither the error shape nor the timing reveals
    /// whether an account exists.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<SessionTokens> {
        let Some(record) = self.users.find_by_email(email).await? else {
            self.credentials.verify_decoy(password);
            crate::logging::log_security_event("failed_login", None, "unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.credentials.verify(password, &record.password_hash) {
            crate::logging::log_security_event("failed_login", Some(record.id), "wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        self.start_session(record.id).await
    }

    /// Rotate a refresh secret for a new access/refresh pair.
    ///
    /// The rotation contract: the old record is deleted and the affected
    /// row count checked **before** anything new is issued. A zero count
    /// means a concurrent refresh already consumed the secret, so two
    /// callers presenting the same stale secret can never both obtain
    /// valid sessions. Unknown, expired, and replayed secrets all
    /// collapse to `RefreshInvalid`.
    pub async fn refresh(&self, secret: &str) -> AuthResult<SessionTokens> {
        let Some(record) = self.sessions.find_by_secret(secret).await? else {
            return Err(AuthError::RefreshInvalid);
        };

        if record.is_expired() {
            // Lazy cleanup; failure to delete doesn't change the outcome
            if let Err(err) = self.sessions.delete_by_secret(secret).await {
                tracing::warn!(user_id = record.user_id, error = %err, "failed to purge expired refresh record");
            }
            return Err(AuthError::RefreshInvalid);
        }

        let deleted = self.sessions.delete_by_secret(secret).await?;
        if deleted == 0 {
            crate::logging::log_security_event(
                "refresh_replay",
                Some(record.user_id),
                "refresh secret consumed concurrently",
            );
            return Err(AuthError::RefreshInvalid);
        }

        self.start_session(record.user_id).await
    }

    /// Log out by invalidating a refresh secret.
    ///
    /// Idempotent: deleting an absent secret is not an error.
    pub async fn logout(&self, secret: &str) -> AuthResult<()> {
        self.sessions.delete_by_secret(secret).await?;
        Ok(())
    }

    /// Fetch a user for session introspection.
    ///
    /// # Errors
    ///
    /// * `AuthError::Unauthenticated` - No such user
    pub async fn identify(&self, user_id: UserId) -> AuthResult<User> {
        let record = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::Unauthenticated)?;
        Ok(record.into_user())
    }

    /// Invalidate every session of a user, returning how many were removed.
    ///
    /// Full revocation capability for flows like password change.
    pub async fn revoke_all_sessions(&self, user_id: UserId) -> AuthResult<u64> {
        let revoked = self.sessions.delete_all_for_user(user_id).await?;
        tracing::info!(user_id = user_id, revoked = revoked, "sessions revoked");
        Ok(revoked)
    }

    /// Validate an access token, returning the subject user id.
    pub fn validate_access(&self, token: &str) -> AuthResult<UserId> {
        self.tokens.validate_access(token)
    }

    /// Mint an access token and a fresh refresh record for a user
    async fn start_session(&self, user_id: UserId) -> AuthResult<SessionTokens> {
        let access_token = self.tokens.issue_access(user_id)?;
        let refresh_token = self.tokens.issue_refresh_secret();

        let expires_at = Utc::now() + self.refresh_ttl;
        self.sessions
            .save(user_id, &refresh_token, expires_at)
            .await?;

        Ok(SessionTokens {
            access_token,
            refresh_token,
        })
    }
}

fn validate_email(email: &str) -> AuthResult<()> {
    let valid = email.len() <= MAX_EMAIL_LEN
        && !email.contains(char::is_whitespace)
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));

    if valid {
        Ok(())
    } else {
        Err(AuthError::Validation {
            field: "email",
            message: "must be a valid email address".to_string(),
        })
    }
}

fn validate_password(password: &str) -> AuthResult<()> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation {
            field: "password",
            message: format!("must be at least {MIN_PASSWORD_LEN} characters"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("u.ser+tag@sub.example.com").is_ok());

        for bad in ["", "plain", "@example.com", "user@nodot", "a b@example.com"] {
            let err = validate_email(bad).unwrap_err();
            assert!(
                matches!(err, AuthError::Validation { field: "email", .. }),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("12345678").is_ok());

        let err = validate_password("1234567").unwrap_err();
        assert!(matches!(
            err,
            AuthError::Validation {
                field: "password",
                ..
            }
        ));
    }
}
