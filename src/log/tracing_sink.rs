//! Sink forwarding host log entries to the `tracing` subscriber.
//!
//! Lets a process that already installed a subscriber (see
//! [`crate::utils::logging::init_logging`]) collect host and component
//! output through the same pipeline. Verbose maps to `TRACE`.

use super::{LogEntry, LogLevel, LogSink};
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, entry: &LogEntry) -> Result<()> {
        let data = entry.data.as_ref().map(|d| d.render()).unwrap_or_default();
        let ctx = entry.ctx.as_str();
        let message = entry.message.as_str();
        match entry.level {
            LogLevel::None => {}
            LogLevel::Error => tracing::error!(target: "apphost", ctx = %ctx, data = %data, "{}", message),
            LogLevel::Warn => tracing::warn!(target: "apphost", ctx = %ctx, data = %data, "{}", message),
            LogLevel::Info => tracing::info!(target: "apphost", ctx = %ctx, data = %data, "{}", message),
            LogLevel::Debug => tracing::debug!(target: "apphost", ctx = %ctx, data = %data, "{}", message),
            LogLevel::Verbose => tracing::trace!(target: "apphost", ctx = %ctx, data = %data, "{}", message),
        }
        Ok(())
    }
}
