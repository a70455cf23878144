//! Database query timeout helpers.
//!
//! Every store call is bounded by a short timeout. Besides preventing
//! indefinite hangs, this caps the window in which a caller that cancels
//! mid-operation can leave behind an orphaned write (e.g. a refresh record
//! saved but never revealed).

use crate::auth::AuthError;
use std::time::Duration;
use tokio::time::timeout;

/// Default timeout for store queries
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Error type for timeout operations
#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    /// Operation timed out
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<TimeoutError> for AuthError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => AuthError::Timeout(duration),
            TimeoutError::Database(err) => AuthError::Database(err),
        }
    }
}

/// Result type for timeout operations
pub type TimeoutResult<T> = Result<T, TimeoutError>;

/// Execute a database future with a timeout.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> TimeoutResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(TimeoutError::Database(e)),
        Err(_) => Err(TimeoutError::Timeout(duration)),
    }
}

/// Execute a database future with the default query timeout.
pub async fn with_default_timeout<F, T>(future: F) -> TimeoutResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_slow_future_times_out() {
        let result: TimeoutResult<()> = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(TimeoutError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_fast_future_passes_through() {
        let result = with_timeout(Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn test_timeout_maps_to_auth_error() {
        let err: AuthError = TimeoutError::Timeout(Duration::from_secs(3)).into();
        assert!(matches!(err, AuthError::Timeout(_)));
        assert!(err.is_internal());
    }
}
