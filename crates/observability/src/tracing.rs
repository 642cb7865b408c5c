//! Tracing/logging initialization.
//!
//! Library crates only emit `tracing` events; whoever embeds them decides
//! where they go by calling [`init`] or [`init_with`] once at startup.

use tracing_subscriber::EnvFilter;

/// Default directive when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

/// Output format of the fmt subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event (log shippers).
    #[default]
    Json,
    /// Human-readable lines (local development).
    Pretty,
}

/// JSON logs with timestamps, filtered by `RUST_LOG`.
pub fn init() {
    init_with(LogFormat::Json);
}

/// Install the global subscriber in `format`.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_with(format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    match format {
        LogFormat::Json => builder.json().try_init().is_ok(),
        LogFormat::Pretty => builder.try_init().is_ok(),
    }
}
