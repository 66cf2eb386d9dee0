//! Shared logging utilities for consistent tracing across the engine

use crate::types::RunId;
use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Crates whose events pass the default filter
const ENGINE_TARGETS: [&str; 2] = ["runner", "shared"];

/// Build the `EnvFilter` directive string for a base level
pub fn filter_directives(log_level: Option<&str>) -> String {
    let base_level = log_level.unwrap_or("info");
    ENGINE_TARGETS
        .iter()
        .map(|target| format!("{target}={base_level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize a stdout tracing subscriber.
///
/// Safe to call more than once: later calls leave the installed subscriber in place.
pub fn init_tracing(log_level: Option<&str>) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::new(filter_directives(log_level));

    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for unit-aware info logging
#[macro_export]
macro_rules! unit_info {
    ($unit:expr, $($arg:tt)*) => {
        tracing::info!(
            unit = %$unit,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for unit-aware warning logging
#[macro_export]
macro_rules! unit_warn {
    ($unit:expr, $($arg:tt)*) => {
        tracing::warn!(
            unit = %$unit,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for unit-aware error logging
#[macro_export]
macro_rules! unit_error {
    ($unit:expr, $($arg:tt)*) => {
        tracing::error!(
            unit = %$unit,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for unit-aware debug logging
#[macro_export]
macro_rules! unit_debug {
    ($unit:expr, $($arg:tt)*) => {
        tracing::debug!(
            unit = %$unit,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for suite startup
pub fn log_suite_start(run_id: &RunId, details: &str) {
    info!(
        run = %run_id,
        timestamp = format_timestamp(),
        "🚀 Starting suite: {}",
        details
    );
}

/// Contextual logging helper for suite completion
pub fn log_suite_finish(run_id: &RunId, summary: &str) {
    info!(
        run = %run_id,
        timestamp = format_timestamp(),
        "🏁 Suite finished: {}",
        summary
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(run_id: &RunId, context: &str, error: &dyn std::fmt::Display) {
    error!(
        run = %run_id,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives() {
        assert_eq!(filter_directives(None), "runner=info,shared=info");
        assert_eq!(filter_directives(Some("debug")), "runner=debug,shared=debug");
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing(Some("warn"));
        init_tracing(Some("debug"));
        unit_warn!("sample", "still logging after double init");
    }
}
