//! Process-wide `tracing` subscriber for the `apphost` binary.
//!
//! Supports three formats:
//! - `pretty`: multi-line, coloured, for interactive use
//! - `compact`: one line per event with the target
//! - `json`: structured JSON lines for log aggregators
//!
//! Host log entries reach this subscriber through the `tracing` sink
//! (`log.loggers.tracing.enabled`).

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingSettings};
use crate::error::{HostError, Result};

/// Filter directive: `RUST_LOG` when set, otherwise `settings.level`.
pub fn env_filter(settings: &LoggingSettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level))
}

/// Install the global subscriber. Call once, before emitting events.
///
/// With `settings.file` set, JSON lines are appended to that file instead
/// of stderr regardless of `format`.
pub fn init_logging(settings: &LoggingSettings) -> Result<()> {
    let filter = env_filter(settings);

    let installed = match (&settings.file, settings.format) {
        (Some(path), _) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(Arc::new(file))
                .try_init()
        }
        (None, LogFormat::Json) => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init(),
        (None, LogFormat::Compact) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init(),
        (None, LogFormat::Pretty) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .pretty()
            .try_init(),
    };
    installed.map_err(|e| HostError::Config(format!("failed to install log subscriber: {}", e)))
}
