//! Request-rate throttling per client identity and route.
//!
//! Fixed-window limiting over a shared atomic counter cache, sitting
//! upstream of the auth operations: admission is decided before any
//! credential or session work runs.
//!
//! Two documented approximations, both inherited deliberately:
//!
//! - The window is **fixed, not sliding**: the counter resets entirely
//!   when its key expires, so a client can burst up to 2x the limit
//!   across a window edge.
//! - Setting the expiry happens in a separate step after the first
//!   increment; if that step fails, the key briefly counts without a
//!   window until a later increment observes the expiry missing.
//!
//! On counter-backend failure the limiter **fails open** by default
//! (availability over strictness); this is a policy knob, not an
//! assumption — see [`RateLimitConfig::fail_open`].

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod counters;

pub use counters::{CounterStore, MemoryCounterStore, PgCounterStore};

/// Rate limiting errors
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Counter backend error
    #[error("Counter backend error: {0}")]
    Backend(#[from] sqlx::Error),
}

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests allowed per window
    pub max_requests: u32,

    /// Window duration
    pub window: Duration,

    /// Admit requests when the counter backend is unreachable.
    ///
    /// Defaults to true: an infrastructure outage degrades throttling
    /// rather than taking down login. Flip to false to prefer strictness.
    pub fail_open: bool,
}

impl RateLimitConfig {
    /// Configuration from environment variables.
    ///
    /// - `RATE_LIMIT_REQUESTS` (default: 10)
    /// - `RATE_LIMIT_WINDOW_SECONDS` (default: 60)
    /// - `RATE_LIMIT_FAIL_OPEN` (default: true)
    pub fn from_env() -> Self {
        Self {
            max_requests: parse_env_or("RATE_LIMIT_REQUESTS", 10),
            window: Duration::from_secs(parse_env_or("RATE_LIMIT_WINDOW_SECONDS", 60)),
            fail_open: parse_env_or("RATE_LIMIT_FAIL_OPEN", true),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
            fail_open: true,
        }
    }
}

fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Admission decision
#[derive(Debug, Clone)]
pub enum RateLimitDecision {
    /// Request admitted
    Allowed { remaining: u32 },

    /// Request denied; retry after the reported duration
    Denied { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }

    pub fn remaining(&self) -> Option<u32> {
        match self {
            RateLimitDecision::Allowed { remaining } => Some(*remaining),
            _ => None,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            RateLimitDecision::Denied { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Fixed-window rate limiter over a [`CounterStore`]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Decide admission for one request from `identity` on `route`.
    ///
    /// Atomically increments the composite counter; the first increment of
    /// a window attaches the window TTL. Exceeding the limit denies with
    /// the key's remaining TTL as the retry hint.
    pub async fn admit(&self, identity: &str, route: &str) -> RateLimitDecision {
        let key = format!("rl:{identity}:{route}");

        let count = match self.store.increment(&key).await {
            Ok(count) => count,
            Err(err) => return self.on_backend_failure(&key, &err),
        };

        if count == 1
            && let Err(err) = self.store.expire(&key, self.config.window).await
        {
            // The key keeps counting without a window until a later
            // increment finds it unexpired; bounded staleness, accepted.
            tracing::warn!(key = %key, error = %err, "failed to set rate window expiry");
        }

        if count > i64::from(self.config.max_requests) {
            let retry_after = match self.store.ttl(&key).await {
                Ok(Some(ttl)) => ttl,
                Ok(None) => self.config.window,
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "failed to read rate window ttl");
                    self.config.window
                }
            };
            tracing::warn!(
                identity = identity,
                route = route,
                count = count,
                "rate limit exceeded"
            );
            return RateLimitDecision::Denied { retry_after };
        }

        RateLimitDecision::Allowed {
            remaining: self.config.max_requests - count as u32,
        }
    }

    fn on_backend_failure(&self, key: &str, err: &RateLimitError) -> RateLimitDecision {
        if self.config.fail_open {
            tracing::warn!(key = %key, error = %err, "counter backend unavailable; failing open");
            RateLimitDecision::Allowed { remaining: 0 }
        } else {
            tracing::warn!(key = %key, error = %err, "counter backend unavailable; failing closed");
            RateLimitDecision::Denied {
                retry_after: self.config.window,
            }
        }
    }
}
