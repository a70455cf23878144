//! Database configuration module.

use std::env;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,
}

impl DatabaseConfig {
    /// Create configuration from environment variables.
    ///
    /// Expected environment variables:
    /// - `DATABASE_URL`: PostgreSQL connection string (required)
    /// - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 20)
    /// - `DB_MIN_CONNECTIONS`: Minimum pool size (default: 5)
    /// - `DB_CONNECTION_TIMEOUT_SECS`: Connection timeout (default: 10)
    /// - `DB_IDLE_TIMEOUT_SECS`: Idle timeout (default: 600)
    /// - `DB_MAX_LIFETIME_SECS`: Max lifetime (default: 1800)
    ///
    /// # Panics
    ///
    /// Panics if `DATABASE_URL` is not set
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", 20),
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", 5),
            connection_timeout_secs: parse_env_or("DB_CONNECTION_TIMEOUT_SECS", 10),
            idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT_SECS", 600),
            max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME_SECS", 1800),
        }
    }

    /// Default configuration for local development
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/authkit_dev".to_string(),
            max_connections: 20,
            min_connections: 5,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}

fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
