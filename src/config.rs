//! Service configuration management.
//!
//! Consolidates all environment variable reads and provides validated
//! configuration for the auth subsystem.

use crate::auth::{Argon2Cost, MIN_REFRESH_SECRET_BYTES};
use crate::db::DatabaseConfig;
use crate::ratelimit::RateLimitConfig;

/// Complete service configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Security configuration
    pub security: SecurityConfig,
    /// Token lifetime configuration
    pub tokens: TokenConfig,
    /// Rate limiter configuration
    pub rate_limit: RateLimitConfig,
}

/// Security-related configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// JWT signing secret (required)
    pub jwt_secret: String,
    /// Password hashing pepper (required)
    pub password_pepper: String,
    /// Argon2id cost parameters
    pub argon2: Argon2Cost,
}

/// Token lifetime configuration
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Access token lifetime in minutes
    pub access_ttl_minutes: i64,
    /// Refresh token lifetime in hours
    pub refresh_ttl_hours: i64,
    /// Entropy of refresh secrets in bytes
    pub refresh_secret_bytes: usize,
}

impl TokenConfig {
    pub fn access_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.access_ttl_minutes)
    }

    pub fn refresh_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.refresh_ttl_hours)
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid
    pub fn from_env() -> Result<Self, ConfigError> {
        let database = DatabaseConfig::from_env();

        // Security configuration (REQUIRED)
        let jwt_secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        let password_pepper =
            std::env::var("PASSWORD_PEPPER").map_err(|_| ConfigError::MissingRequired {
                var: "PASSWORD_PEPPER".to_string(),
                hint: "Generate with: openssl rand -hex 16".to_string(),
            })?;

        if jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: "Must be at least 32 characters (128-bit security)".to_string(),
            });
        }

        if password_pepper.len() < 16 {
            return Err(ConfigError::Invalid {
                var: "PASSWORD_PEPPER".to_string(),
                reason: "Must be at least 16 characters (64-bit security)".to_string(),
            });
        }

        let security = SecurityConfig {
            jwt_secret,
            password_pepper,
            argon2: Argon2Cost {
                memory_kib: parse_env_or("ARGON2_MEMORY_KIB", Argon2Cost::default().memory_kib),
                iterations: parse_env_or("ARGON2_ITERATIONS", Argon2Cost::default().iterations),
                parallelism: parse_env_or("ARGON2_PARALLELISM", Argon2Cost::default().parallelism),
            },
        };

        let tokens = TokenConfig {
            access_ttl_minutes: parse_env_or("JWT_ACCESS_TTL_MIN", 15),
            refresh_ttl_hours: parse_env_or("JWT_REFRESH_TTL_HOURS", 168),
            refresh_secret_bytes: parse_env_or("REFRESH_SECRET_BYTES", 32),
        };

        let config = ServiceConfig {
            database,
            security,
            tokens,
            rate_limit: RateLimitConfig::from_env(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tokens.access_ttl_minutes <= 0 {
            return Err(ConfigError::Invalid {
                var: "JWT_ACCESS_TTL_MIN".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.tokens.refresh_ttl() <= self.tokens.access_ttl() {
            return Err(ConfigError::Invalid {
                var: "JWT_REFRESH_TTL_HOURS".to_string(),
                reason: format!(
                    "Must exceed the access TTL ({} minutes)",
                    self.tokens.access_ttl_minutes
                ),
            });
        }

        if self.tokens.refresh_secret_bytes < MIN_REFRESH_SECRET_BYTES {
            return Err(ConfigError::Invalid {
                var: "REFRESH_SECRET_BYTES".to_string(),
                reason: format!("Must be at least {MIN_REFRESH_SECRET_BYTES}"),
            });
        }

        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::Invalid {
                var: "RATE_LIMIT_REQUESTS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.rate_limit.window.is_zero() {
            return Err(ConfigError::Invalid {
                var: "RATE_LIMIT_WINDOW_SECONDS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn valid_config() -> ServiceConfig {
        ServiceConfig {
            database: DatabaseConfig::development(),
            security: SecurityConfig {
                jwt_secret: "a".repeat(32),
                password_pepper: "a".repeat(16),
                argon2: Argon2Cost::default(),
            },
            tokens: TokenConfig {
                access_ttl_minutes: 15,
                refresh_ttl_hours: 168,
                refresh_secret_bytes: 32,
            },
            rate_limit: RateLimitConfig::default(),
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Use openssl".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("JWT_SECRET"));
        assert!(msg.contains("Use openssl"));
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_refresh_ttl_must_exceed_access_ttl() {
        let mut config = valid_config();
        config.tokens.access_ttl_minutes = 120;
        config.tokens.refresh_ttl_hours = 1;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_refresh_secret_bytes_minimum() {
        let mut config = valid_config();
        config.tokens.refresh_secret_bytes = 16;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "REFRESH_SECRET_BYTES"));
    }

    #[test]
    fn test_rate_limit_validation() {
        let mut config = valid_config();
        config.rate_limit.max_requests = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.rate_limit.window = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_token_config_durations() {
        let tokens = TokenConfig {
            access_ttl_minutes: 15,
            refresh_ttl_hours: 168,
            refresh_secret_bytes: 32,
        };
        assert_eq!(tokens.access_ttl(), chrono::Duration::minutes(15));
        assert_eq!(tokens.refresh_ttl(), chrono::Duration::days(7));
    }
}
