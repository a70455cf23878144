//! Authentication and session lifecycle.
//!
//! This module implements:
//! - Argon2id password hashing with server-side pepper
//! - HS256 JWT access tokens (stateless, unrevocable before expiry)
//! - Rotating single-use refresh secrets with replay protection
//!
//! ## Example
//!
//! ```no_run
//! use authkit::auth::{Argon2Cost, AuthManager, CredentialManager, TokenIssuer};
//! use authkit::db::{MemorySessionStore, MemoryUserStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let auth = AuthManager::new(
//!         Arc::new(MemoryUserStore::new()),
//!         Arc::new(MemorySessionStore::new()),
//!         CredentialManager::new("pepper".to_string(), Argon2Cost::default())?,
//!         TokenIssuer::new(
//!             "jwt-signing-secret-of-sufficient-len".to_string(),
//!             chrono::Duration::minutes(15),
//!             32,
//!         ),
//!         chrono::Duration::days(7),
//!     );
//!
//!     let user = auth.register("user@example.com", "SecurePass123").await?;
//!     let tokens = auth.login("user@example.com", "SecurePass123").await?;
//!     let rotated = auth.refresh(&tokens.refresh_token).await?;
//!     auth.logout(&rotated.refresh_token).await?;
//!     println!("done for user {}", user.id);
//!     Ok(())
//! }
//! ```

pub mod credentials;
pub mod errors;
pub mod manager;
pub mod models;
pub mod tokens;

pub use credentials::{Argon2Cost, CredentialManager};
pub use errors::{AuthError, AuthResult};
pub use manager::AuthManager;
pub use models::{AccessTokenClaims, RefreshTokenRecord, SessionTokens, User, UserId, UserRecord};
pub use tokens::{MIN_REFRESH_SECRET_BYTES, TokenIssuer};
