//! Counter backends for the rate limiter.
//!
//! The shared counter cache is an external collaborator reached only
//! through atomic increment, expire, and TTL inspection. The Postgres
//! implementation folds increment-or-reset into a single upsert statement
//! so concurrent requests never race a read-then-write gap.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::RateLimitError;

/// Atomic counter operations against the shared cache.
///
/// Semantics mirror a volatile key-value counter: a key's value is an
/// integer, `expire` attaches a time-to-live, and an expired key behaves
/// as absent (the next increment restarts it at 1).
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the counter at `key`, returning the new value.
    /// An expired or absent key restarts at 1.
    async fn increment(&self, key: &str) -> Result<i64, RateLimitError>;

    /// Attach a time-to-live to `key`
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), RateLimitError>;

    /// Remaining time-to-live of `key`, `None` if absent or without expiry
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, RateLimitError>;
}

/// PostgreSQL-backed [`CounterStore`].
///
/// Expected schema:
///
/// ```sql
/// CREATE TABLE rate_counters (
///     counter_key TEXT PRIMARY KEY,
///     count       BIGINT NOT NULL,
///     expires_at  TIMESTAMP
/// );
/// ```
pub struct PgCounterStore {
    pool: PgPool,
}

impl PgCounterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CounterStore for PgCounterStore {
    async fn increment(&self, key: &str) -> Result<i64, RateLimitError> {
        // Single statement: insert, or bump, or restart if the key expired.
        let row = sqlx::query(
            r#"
            INSERT INTO rate_counters (counter_key, count, expires_at)
            VALUES ($1, 1, NULL)
            ON CONFLICT (counter_key) DO UPDATE SET
                count = CASE
                    WHEN rate_counters.expires_at IS NOT NULL AND rate_counters.expires_at < NOW()
                    THEN 1
                    ELSE rate_counters.count + 1
                END,
                expires_at = CASE
                    WHEN rate_counters.expires_at IS NOT NULL AND rate_counters.expires_at < NOW()
                    THEN NULL
                    ELSE rate_counters.expires_at
                END
            RETURNING count
            "#,
        )
        .bind(key)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("count"))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), RateLimitError> {
        sqlx::query(
            "UPDATE rate_counters
             SET expires_at = NOW() + ($2 * INTERVAL '1 second')
             WHERE counter_key = $1",
        )
        .bind(key)
        .bind(ttl.as_secs_f64())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, RateLimitError> {
        let row = sqlx::query("SELECT expires_at FROM rate_counters WHERE counter_key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let Some(expires_at) = row.get::<Option<chrono::NaiveDateTime>, _>("expires_at") else {
            return Ok(None);
        };

        let remaining = (expires_at.and_utc() - Utc::now()).num_milliseconds();
        if remaining <= 0 {
            return Ok(None);
        }
        Ok(Some(Duration::from_millis(remaining as u64)))
    }
}

struct CounterEntry {
    count: i64,
    expires_at: Option<Instant>,
}

impl CounterEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Instant::now())
    }
}

/// In-memory [`CounterStore`] for tests and single-process deployments
#[derive(Default)]
pub struct MemoryCounterStore {
    entries: Mutex<HashMap<String, CounterEntry>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &str) -> Result<i64, RateLimitError> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry(key.to_string()).or_insert(CounterEntry {
            count: 0,
            expires_at: None,
        });

        if entry.is_expired() {
            entry.count = 0;
            entry.expires_at = None;
        }
        entry.count += 1;
        Ok(entry.count)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), RateLimitError> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, RateLimitError> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .get(key)
            .and_then(|entry| entry.expires_at)
            .and_then(|at| at.checked_duration_since(Instant::now())))
    }
}
