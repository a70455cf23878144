//! Structured logging configuration.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging.
///
/// Log levels are configurable via the `RUST_LOG` environment variable.
///
/// # Example
///
/// ```no_run
/// authkit::logging::init();
/// tracing::info!("service starting");
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a security event with structured data.
///
/// Used for failed logins, refresh replay detection, and fail-open
/// admissions. The internal cause is recorded here even where the outward
/// error deliberately hides it.
pub fn log_security_event(event_type: &str, user_id: Option<i64>, message: &str) {
    tracing::warn!(
        event_type = event_type,
        user_id = user_id,
        "SECURITY: {}",
        message
    );
}
