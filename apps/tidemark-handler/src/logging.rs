//! Structured logging setup using tracing.
//!
//! JSON output for log aggregation in deployed receivers, pretty output for
//! operators running the CLI. Logs go to stderr so command output on stdout
//! stays machine-readable.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,tidemark=debug";

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence over `filter`. Exits the process if neither
/// yields a valid filter.
pub fn init_logging(filter: &str, format: LogFormat) {
    let filter_layer =
        match EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(filter)) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("FATAL: Failed to create log filter: {e}");
                std::process::exit(1);
            }
        };

    let registry = tracing_subscriber::registry().with(filter_layer);
    match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .flatten_event(true),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .init(),
    }

    tracing::debug!(filter = %filter, ?format, "Logging initialized");
}

/// Initialize logging for tests (with simpler output).
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_logging_does_not_panic() {
        init_test_logging();
        init_test_logging();
    }
}
