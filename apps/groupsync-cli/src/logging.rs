//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins over `--log-level`. Log lines go to stderr so stdout
//! stays clean for reports and exports.

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{CliError, CliResult};

/// Log line encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Builds the filter from `RUST_LOG`, falling back to `level`.
pub fn build_filter(level: &str) -> CliResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| CliError::Config(format!("invalid log level '{level}': {e}")))
}

/// Installs the global subscriber.
///
/// A second call is a no-op.
pub fn init_logging(level: &str, format: LogFormat) -> CliResult<()> {
    let filter = build_filter(level)?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .flatten_event(true),
            )
            .try_init(),
    };

    if result.is_ok() {
        tracing::debug!(level = %level, ?format, "Logging initialized");
    }
    Ok(())
}
