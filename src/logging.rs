//! Logging setup
//!
//! Installs the global `tracing` subscriber used by the binary. `RUST_LOG`
//! takes precedence over the configured level.

use crate::config::LogFormat;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Build the filter from RUST_LOG or fall back to `log_level`
pub fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

/// Initialize the tracing subscriber with the given level and output format
pub fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = build_filter(log_level);
    let registry = tracing_subscriber::registry();

    match format {
        LogFormat::Json => {
            let console_layer = fmt::layer().json().with_filter(filter);
            registry.with(console_layer).init();
        }
        LogFormat::Pretty => {
            let console_layer = fmt::layer().pretty().with_filter(filter);
            registry.with(console_layer).init();
        }
    }
}
