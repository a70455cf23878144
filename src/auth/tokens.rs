//! Access token issuance/validation and refresh secret generation.
//!
//! Access tokens are HS256 JWTs carrying `{sub, iat, exp}` and are
//! verifiable offline by any instance holding the shared signing secret.
//! They cannot be revoked before expiry. Refresh secrets are opaque
//! hex-encoded random strings with no embedded structure; their security
//! rests entirely on unguessability.

use super::{
    errors::{AuthError, AuthResult},
    models::{AccessTokenClaims, UserId},
};
use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

/// Minimum entropy for refresh secrets. Configured lengths below this are
/// clamped up.
pub const MIN_REFRESH_SECRET_BYTES: usize = 32;

/// Issues and validates access tokens; generates refresh secrets.
#[derive(Clone)]
pub struct TokenIssuer {
    jwt_secret: String,
    access_ttl: Duration,
    refresh_secret_bytes: usize,
}

impl TokenIssuer {
    pub fn new(jwt_secret: String, access_ttl: Duration, refresh_secret_bytes: usize) -> Self {
        Self {
            jwt_secret,
            access_ttl,
            refresh_secret_bytes: refresh_secret_bytes.max(MIN_REFRESH_SECRET_BYTES),
        }
    }

    /// Issue a signed access token for a user.
    ///
    /// Claims: `sub` = user id (i64), `iat` = now, `exp` = now + access TTL.
    pub fn issue_access(&self, user_id: UserId) -> AuthResult<String> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Validate an access token and extract the subject user id.
    ///
    /// Signature mismatch, malformed structure, and expiry all collapse to
    /// `AuthError::Unauthenticated`; the concrete cause is logged at debug
    /// level only.
    pub fn validate_access(&self, token: &str) -> AuthResult<UserId> {
        decode::<AccessTokenClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims.sub)
        .map_err(|err| {
            tracing::debug!(error = %err, "access token rejected");
            AuthError::Unauthenticated
        })
    }

    /// Generate an opaque refresh secret from the OS CSPRNG, hex-encoded.
    pub fn issue_refresh_secret(&self) -> String {
        let mut bytes = vec![0u8; self.refresh_secret_bytes];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Access token TTL, used by callers that report expiry to clients
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }
}
