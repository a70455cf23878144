//! Integration tests for the authentication flows.
//!
//! Runs the full register/login/refresh/logout/identify orchestration
//! against the in-memory stores, so every test exercises the same code
//! paths as production minus the Postgres wire.

use authkit::auth::{
    AccessTokenClaims, Argon2Cost, AuthError, AuthManager, CredentialManager, TokenIssuer,
};
use authkit::db::{MemorySessionStore, MemoryUserStore, SessionStore};
use chrono::{Duration, Utc};
use std::sync::Arc;

const JWT_SECRET: &str = "integration-test-jwt-secret-0123456789";
const ACCESS_TTL_MINUTES: i64 = 15;
const REFRESH_TTL_HOURS: i64 = 168;

struct Harness {
    auth: AuthManager,
    sessions: Arc<MemorySessionStore>,
}

fn setup() -> Harness {
    let users = Arc::new(MemoryUserStore::new());
    let sessions = Arc::new(MemorySessionStore::new());

    // Low-cost hashing so the suite stays fast
    let credentials = CredentialManager::new(
        "test-pepper".to_string(),
        Argon2Cost {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        },
    )
    .expect("credential manager");

    let tokens = TokenIssuer::new(
        JWT_SECRET.to_string(),
        Duration::minutes(ACCESS_TTL_MINUTES),
        32,
    );

    let auth = AuthManager::new(
        users,
        sessions.clone(),
        credentials,
        tokens,
        Duration::hours(REFRESH_TTL_HOURS),
    );

    Harness { auth, sessions }
}

#[tokio::test]
async fn test_register_returns_user_without_hash() {
    let h = setup();

    let user = h
        .auth
        .register("user@example.com", "SecurePass123")
        .await
        .expect("registration should succeed");

    assert!(user.id > 0);
    assert_eq!(user.email, "user@example.com");

    // The outward representation must not carry the hash in any field
    let json = serde_json::to_string(&user).unwrap();
    assert!(!json.contains("password"));
    assert!(!json.contains("hash"));
    assert!(!json.contains("argon2"));
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let h = setup();

    h.auth
        .register("user@example.com", "SecurePass123")
        .await
        .unwrap();

    let result = h.auth.register("user@example.com", "OtherPass456").await;
    assert!(matches!(result, Err(AuthError::Conflict)));
}

#[tokio::test]
async fn test_register_rejects_malformed_input() {
    let h = setup();

    let result = h.auth.register("not-an-email", "SecurePass123").await;
    assert!(matches!(
        result,
        Err(AuthError::Validation { field: "email", .. })
    ));

    let result = h.auth.register("user@example.com", "short").await;
    assert!(matches!(
        result,
        Err(AuthError::Validation {
            field: "password",
            ..
        })
    ));
}

#[tokio::test]
async fn test_login_failures_are_uniform() {
    let h = setup();
    h.auth
        .register("user@example.com", "SecurePass123")
        .await
        .unwrap();

    // Unknown email and wrong password yield the identical error value
    let unknown = h.auth.login("ghost@example.com", "SecurePass123").await;
    let wrong = h.auth.login("user@example.com", "WrongPass456").await;

    assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
    assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
    assert_eq!(
        unknown.unwrap_err().client_message(),
        wrong.unwrap_err().client_message()
    );
}

#[tokio::test]
async fn test_login_issues_valid_pair() {
    let h = setup();
    let user = h
        .auth
        .register("user@example.com", "SecurePass123")
        .await
        .unwrap();

    let before = Utc::now();
    let tokens = h
        .auth
        .login("user@example.com", "SecurePass123")
        .await
        .unwrap();
    let after = Utc::now();

    // Access token: subject is the user id, expiry = issuance + access TTL
    assert_eq!(h.auth.validate_access(&tokens.access_token).unwrap(), user.id);

    let claims = jsonwebtoken::decode::<AccessTokenClaims>(
        &tokens.access_token,
        &jsonwebtoken::DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &jsonwebtoken::Validation::default(),
    )
    .unwrap()
    .claims;
    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.exp, claims.iat + ACCESS_TTL_MINUTES * 60);

    // Exactly one refresh record, expiring refresh_ttl from now
    assert_eq!(h.sessions.len(), 1);
    let record = h
        .sessions
        .find_by_secret(&tokens.refresh_token)
        .await
        .unwrap()
        .expect("refresh record should be persisted");
    assert_eq!(record.user_id, user.id);

    let lower = before + Duration::hours(REFRESH_TTL_HOURS);
    let upper = after + Duration::hours(REFRESH_TTL_HOURS) + Duration::seconds(1);
    assert!(record.expires_at >= lower && record.expires_at <= upper);
}

#[tokio::test]
async fn test_refresh_rotates_and_old_secret_dies() {
    let h = setup();
    h.auth
        .register("user@example.com", "SecurePass123")
        .await
        .unwrap();
    let tokens = h
        .auth
        .login("user@example.com", "SecurePass123")
        .await
        .unwrap();

    let rotated = h.auth.refresh(&tokens.refresh_token).await.unwrap();
    assert_ne!(rotated.refresh_token, tokens.refresh_token);
    assert_eq!(h.sessions.len(), 1, "rotation replaces, never accumulates");

    // Single-use: the original secret is spent
    let replay = h.auth.refresh(&tokens.refresh_token).await;
    assert!(matches!(replay, Err(AuthError::RefreshInvalid)));

    // The rotated secret still works
    assert!(h.auth.refresh(&rotated.refresh_token).await.is_ok());
}

#[tokio::test]
async fn test_unknown_refresh_secret_invalid() {
    let h = setup();
    let result = h.auth.refresh("deadbeef".repeat(8).as_str()).await;
    assert!(matches!(result, Err(AuthError::RefreshInvalid)));
}

#[tokio::test]
async fn test_expired_refresh_record_is_purged() {
    let h = setup();
    let user = h
        .auth
        .register("user@example.com", "SecurePass123")
        .await
        .unwrap();

    // Plant an already-expired record directly in the store
    let secret = "aa".repeat(32);
    h.sessions
        .save(user.id, &secret, Utc::now() - Duration::minutes(1))
        .await
        .unwrap();

    let result = h.auth.refresh(&secret).await;
    assert!(matches!(result, Err(AuthError::RefreshInvalid)));

    // Lazy cleanup removed the record
    assert!(h.sessions.find_by_secret(&secret).await.unwrap().is_none());
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let h = setup();
    h.auth
        .register("user@example.com", "SecurePass123")
        .await
        .unwrap();
    let tokens = h
        .auth
        .login("user@example.com", "SecurePass123")
        .await
        .unwrap();

    h.auth.logout(&tokens.refresh_token).await.unwrap();
    assert_eq!(h.sessions.len(), 0);

    // Second logout with the same secret is not an error
    h.auth.logout(&tokens.refresh_token).await.unwrap();

    // And the secret no longer refreshes
    let result = h.auth.refresh(&tokens.refresh_token).await;
    assert!(matches!(result, Err(AuthError::RefreshInvalid)));
}

#[tokio::test]
async fn test_identify_strips_hash_and_rejects_unknown() {
    let h = setup();
    let user = h
        .auth
        .register("user@example.com", "SecurePass123")
        .await
        .unwrap();

    let fetched = h.auth.identify(user.id).await.unwrap();
    assert_eq!(fetched, user);

    let result = h.auth.identify(999_999).await;
    assert!(matches!(result, Err(AuthError::Unauthenticated)));
}

#[tokio::test]
async fn test_revoke_all_sessions() {
    let h = setup();
    let user = h
        .auth
        .register("user@example.com", "SecurePass123")
        .await
        .unwrap();

    // Three concurrent sessions for the same account
    let t1 = h.auth.login("user@example.com", "SecurePass123").await.unwrap();
    let t2 = h.auth.login("user@example.com", "SecurePass123").await.unwrap();
    let t3 = h.auth.login("user@example.com", "SecurePass123").await.unwrap();
    assert_eq!(h.sessions.len(), 3);

    let revoked = h.auth.revoke_all_sessions(user.id).await.unwrap();
    assert_eq!(revoked, 3);

    for secret in [&t1.refresh_token, &t2.refresh_token, &t3.refresh_token] {
        let result = h.auth.refresh(secret).await;
        assert!(matches!(result, Err(AuthError::RefreshInvalid)));
    }
}

#[tokio::test]
async fn test_concurrent_refresh_single_winner() {
    let h = setup();
    h.auth
        .register("user@example.com", "SecurePass123")
        .await
        .unwrap();
    let tokens = h
        .auth
        .login("user@example.com", "SecurePass123")
        .await
        .unwrap();

    // Both tasks present the same secret; the atomic delete-and-count
    // guarantees at most one obtains a new pair.
    let auth_a = h.auth.clone();
    let auth_b = h.auth.clone();
    let secret_a = tokens.refresh_token.clone();
    let secret_b = tokens.refresh_token.clone();

    let (a, b) = tokio::join!(
        tokio::spawn(async move { auth_a.refresh(&secret_a).await }),
        tokio::spawn(async move { auth_b.refresh(&secret_b).await }),
    );

    let results = [a.unwrap(), b.unwrap()];
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert!(winners <= 1, "at most one concurrent refresh may succeed");
    for result in results.iter().filter(|r| r.is_err()) {
        assert!(matches!(
            result.as_ref().unwrap_err(),
            AuthError::RefreshInvalid
        ));
    }
}
