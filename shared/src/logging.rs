//! Shared logging utilities for consistent tracing across the supervisor

use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Build the default filter directive for a base level
pub fn filter_directive(log_level: Option<&str>) -> String {
    let base_level = log_level.unwrap_or("info");
    format!("supervisor={base_level},shared={base_level},reqwest=warn,hyper=warn")
}

/// Initialize tracing subscriber with an optional log level
///
/// `RUST_LOG` replaces the generated filter when set. Output goes to stderr so
/// that machine-readable command output on stdout stays clean.
pub fn init_tracing(log_level: Option<&str>) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(log_level)));

    // A second init (e.g. from tests) keeps the first subscriber
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .try_init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for node-scoped info logging
#[macro_export]
macro_rules! node_info {
    ($node_id:expr, $($arg:tt)*) => {
        tracing::info!(
            node = %$node_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for node-scoped warning logging
#[macro_export]
macro_rules! node_warn {
    ($node_id:expr, $($arg:tt)*) => {
        tracing::warn!(
            node = %$node_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for node-scoped error logging
#[macro_export]
macro_rules! node_error {
    ($node_id:expr, $($arg:tt)*) => {
        tracing::error!(
            node = %$node_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for node-scoped debug logging
#[macro_export]
macro_rules! node_debug {
    ($node_id:expr, $($arg:tt)*) => {
        tracing::debug!(
            node = %$node_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(details: &str) {
    info!(timestamp = format_timestamp(), "🚀 Starting {}", details);
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(reason: &str) {
    info!(timestamp = format_timestamp(), "🛑 Shutting down: {}", reason);
}

/// Contextual logging helper for error conditions
pub fn log_error(context: &str, error: &dyn std::fmt::Display) {
    error!(
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(message: &str) {
    info!(timestamp = format_timestamp(), "✅ {}", message);
}

/// Contextual logging helper for progress updates
pub fn log_progress(action: &str, details: &str) {
    info!(timestamp = format_timestamp(), "📋 {}: {}", action, details);
}
