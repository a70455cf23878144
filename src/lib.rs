//! # Authkit
//!
//! Authentication and session-lifecycle library: credential verification,
//! short-lived signed access tokens, rotating single-use refresh tokens
//! with replay protection, and per-client request throttling.
//!
//! ## Architecture
//!
//! - [`auth`]: credential hashing, token issuance/validation, and the
//!   orchestration manager behind register/login/refresh/logout/identify
//! - [`db`]: PostgreSQL pool plus injectable user/session store traits
//!   with in-memory doubles
//! - [`ratelimit`]: fixed-window throttling over a shared atomic counter
//!   backend, upstream of the auth operations
//! - [`config`]: environment-driven configuration with validation
//! - [`logging`]: structured logging setup and security event helpers
//!
//! Transport (HTTP routing, request marshaling) is a collaborator, not
//! part of this crate: it consumes the operation surface of
//! [`auth::AuthManager`] and the admission decisions of
//! [`ratelimit::RateLimiter`].
//!
//! ## Session lifecycle
//!
//! Anonymous -> Authenticated (access + refresh pair) -> Rotated (new
//! pair, old secret dead) -> Revoked (logout or expiry). Access tokens
//! are stateless and cannot be revoked before expiry; refresh secrets are
//! persisted, single-use, and rotated atomically.

pub mod config;
pub mod logging;

/// Authentication: credentials, tokens, and orchestration.
pub mod auth;
pub use auth::{AuthError, AuthManager, AuthResult, SessionTokens, User, UserId};

/// Persistence: connection pool and store implementations.
pub mod db;
pub use db::{Database, DatabaseConfig};

/// Request-rate throttling.
pub mod ratelimit;
pub use ratelimit::{RateLimitConfig, RateLimitDecision, RateLimiter};
