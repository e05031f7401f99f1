//! Console sink: colored single-line output.

use std::io::Write;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::watch;

use super::{LogEntry, LogLevel, LogSink};
use crate::config::{coerce_bool, merge, RootConfig};
use crate::error::Result;

const ENABLED_PATH: &str = "log.loggers.console.enabled";
const RESET: &str = "\u{1b}[0m";

/// Writes `[time][Level] ctx - message data` lines to stdout (or any writer).
///
/// The sink follows the live configuration: flipping
/// `log.loggers.console.enabled` through a new overlay takes effect on the
/// next entry.
pub struct ConsoleSink {
    config: watch::Receiver<Arc<Value>>,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    /// Console sink writing to stdout.
    pub fn new(config: &RootConfig) -> Self {
        Self::with_writer(config, Box::new(std::io::stdout()))
    }

    /// Console sink writing to a custom writer.
    pub fn with_writer(config: &RootConfig, writer: Box<dyn Write + Send>) -> Self {
        Self {
            config: config.subscribe(),
            writer: Mutex::new(writer),
        }
    }

    /// Whether the sink currently emits anything. Defaults to `true`.
    pub fn is_enabled(&self) -> bool {
        let data = self.config.borrow();
        merge::lookup(&data, ENABLED_PATH)
            .and_then(coerce_bool)
            .unwrap_or(true)
    }

    /// Render an entry without color codes.
    pub fn format_entry(entry: &LogEntry) -> String {
        let data = entry
            .data
            .as_ref()
            .map(|d| d.render())
            .filter(|d| !d.is_empty());
        let head = format!(
            "[{}][{}] {} - {}",
            entry.time.format("%Y-%m-%d %H:%M:%S%.3f"),
            entry.level,
            entry.ctx,
            entry.message
        );
        match data {
            Some(data) => format!("{} {}", head, data),
            None => head,
        }
    }

    fn color(level: LogLevel) -> &'static str {
        match level {
            LogLevel::Error => "\u{1b}[91m",
            LogLevel::Warn => "\u{1b}[93m",
            LogLevel::Debug => "\u{1b}[96m",
            LogLevel::Verbose => "\u{1b}[92m",
            _ => "\u{1b}[37m",
        }
    }
}

impl LogSink for ConsoleSink {
    fn log(&self, entry: &LogEntry) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        let line = format!(
            "{}{}{}",
            Self::color(entry.level),
            Self::format_entry(entry),
            RESET
        );
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}
