//! Telemetry and tracing configuration.

mod tracing;

use anyhow::Context;
use clap::ValueEnum;

/// How log lines are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines with targets and levels.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Initializes the tracing subscriber.
///
/// # Errors
///
/// Returns an error if the tracing subscriber fails to initialize.
pub(crate) fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    tracing::init_tracing(format).context("Failed to initialize tracing")
}
