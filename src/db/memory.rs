//! In-memory store implementations.
//!
//! Drop-in [`UserStore`]/[`SessionStore`] doubles backing integration tests
//! and local development without a database. Not `#[cfg(test)]`-gated so
//! `tests/` crates can inject them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use super::store::{SessionStore, UserStore};
use crate::auth::{AuthError, AuthResult, RefreshTokenRecord, User, UserId, UserRecord};

/// In-memory [`UserStore`]
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<UserId, UserRecord>>,
    next_id: Mutex<UserId>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            next_id: Mutex::new(1),
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, email: &str, password_hash: &str) -> AuthResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == email) {
            return Err(AuthError::Conflict);
        }

        let mut next_id = self.next_id.lock().unwrap();
        let id = *next_id;
        *next_id += 1;

        let now = Utc::now();
        let record = UserRecord {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        users.insert(id, record.clone());

        Ok(record.into_user())
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserRecord>> {
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<UserRecord>> {
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }
}

/// In-memory [`SessionStore`], keyed by secret
#[derive(Default)]
pub struct MemorySessionStore {
    records: Mutex<HashMap<String, RefreshTokenRecord>>,
    next_id: Mutex<i64>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            next_id: Mutex::new(1),
        }
    }

    /// Number of live records, for test assertions
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(
        &self,
        user_id: UserId,
        secret: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        let mut records = self.records.lock().unwrap();
        if records.contains_key(secret) {
            // Mirrors the unique constraint on the secret column
            return Err(AuthError::Database(sqlx::Error::Protocol(
                "duplicate refresh secret".into(),
            )));
        }

        let mut next_id = self.next_id.lock().unwrap();
        let id = *next_id;
        *next_id += 1;

        records.insert(
            secret.to_string(),
            RefreshTokenRecord {
                id,
                user_id,
                secret: secret.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn find_by_secret(&self, secret: &str) -> AuthResult<Option<RefreshTokenRecord>> {
        Ok(self.records.lock().unwrap().get(secret).cloned())
    }

    async fn delete_by_secret(&self, secret: &str) -> AuthResult<u64> {
        match self.records.lock().unwrap().remove(secret) {
            Some(_) => Ok(1),
            None => Ok(0),
        }
    }

    async fn delete_all_for_user(&self, user_id: UserId) -> AuthResult<u64> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|_, r| r.user_id != user_id);
        Ok((before - records.len()) as u64)
    }
}
