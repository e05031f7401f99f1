//! Log dispatcher for apphost
//!
//! Components never talk to a global logger. They receive a [`Log`] from
//! the [`LogFactory`], which resolves a level per context name from the
//! configuration and hands entries to every sink registered on the
//! injected [`LogManager`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  create_log("Host")  ┌───────┐   level gate   ┌────────────┐
//! │LogFactory│─────────────────────>│  Log  │───────────────>│ LogManager │
//! └──────────┘                      └───────┘                └─────┬──────┘
//!                                                                  │ fan-out
//!                                                   ┌──────────────┼──────────────┐
//!                                                   ▼              ▼              ▼
//!                                             ConsoleSink    TracingSink     custom sinks
//! ```
//!
//! # Configuration
//!
//! ```json
//! {
//!     "log": {
//!         "level": "info",
//!         "instances": { "Config": "none", "Host": "debug" },
//!         "disable_default": false,
//!         "loggers": {
//!             "console": { "enabled": true },
//!             "tracing": { "enabled": false }
//!         }
//!     }
//! }
//! ```

pub mod console;
pub mod factory;
pub mod manager;
pub mod tracing_sink;

pub use console::ConsoleSink;
pub use factory::{Log, LogFactory};
pub use manager::{LogManager, LogSink};
pub use tracing_sink::TracingSink;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde_json::Value;

// ============================================================================
// LogLevel
// ============================================================================

/// Severity threshold. A logger at level `L` emits every entry `<= L`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    /// Nothing is emitted.
    #[default]
    None = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Verbose = 5,
}

impl LogLevel {
    /// All levels, lowest first.
    pub const ALL: [LogLevel; 6] = [
        LogLevel::None,
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Verbose,
    ];

    /// Display name used in log lines and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::None => "None",
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Verbose => "Verbose",
        }
    }

    /// Parse a level name, case-insensitively. Unknown names map to `None`.
    pub fn parse(name: &str) -> LogLevel {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(name))
            .unwrap_or(LogLevel::None)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(LogLevel::parse(s))
    }
}

// ============================================================================
// LogData / LogEntry
// ============================================================================

/// Optional payload attached to a log call.
#[derive(Debug, Clone, PartialEq)]
pub enum LogData {
    /// Structured payload, rendered as compact JSON.
    Json(Value),
    /// An error, rendered through its `Display` chain.
    Error(String),
}

impl LogData {
    /// Capture an error together with its `source()` chain.
    ///
    /// A cause whose text the rendered message already ends with (errors
    /// that embed their source in `Display`) is not repeated.
    pub fn error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut rendered = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            let text = cause.to_string();
            if !rendered.ends_with(&text) {
                rendered.push_str(": ");
                rendered.push_str(&text);
            }
            source = cause.source();
        }
        LogData::Error(rendered)
    }

    /// Text form used by sinks. Empty when there is nothing worth printing.
    pub fn render(&self) -> String {
        match self {
            LogData::Json(Value::Null) => String::new(),
            LogData::Json(value) => value.to_string(),
            LogData::Error(message) => message.clone(),
        }
    }
}

impl From<Value> for LogData {
    fn from(value: Value) -> Self {
        LogData::Json(value)
    }
}

/// A single dispatched log record.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    /// Context name the logger was created for (e.g. "Host").
    pub ctx: String,
    pub time: DateTime<Local>,
    pub message: String,
    pub data: Option<LogData>,
}

// ============================================================================
// Logger
// ============================================================================

/// Leveled logging interface injected into components.
///
/// Only [`Logger::will_log`] and [`Logger::write`] are required; the
/// leveled helpers are gated on `will_log` so calls below the threshold
/// have no side effect.
pub trait Logger: Send + Sync {
    /// Whether an entry at `level` would be emitted.
    fn will_log(&self, level: LogLevel) -> bool;

    /// Emit an entry unconditionally.
    fn write(&self, level: LogLevel, message: &str, data: Option<LogData>);

    fn log(&self, level: LogLevel, message: &str, data: Option<LogData>) {
        if level != LogLevel::None && self.will_log(level) {
            self.write(level, message, data);
        }
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message, None);
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message, None);
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message, None);
    }

    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message, None);
    }

    fn verbose(&self, message: &str) {
        self.log(LogLevel::Verbose, message, None);
    }

    fn error_with(&self, message: &str, data: LogData) {
        self.log(LogLevel::Error, message, Some(data));
    }

    fn warn_with(&self, message: &str, data: LogData) {
        self.log(LogLevel::Warn, message, Some(data));
    }

    fn info_with(&self, message: &str, data: LogData) {
        self.log(LogLevel::Info, message, Some(data));
    }

    fn debug_with(&self, message: &str, data: LogData) {
        self.log(LogLevel::Debug, message, Some(data));
    }

    /// Verbose entry with `value` appended as JSON; `null` is spelled out.
    fn verbose_json(&self, message: &str, value: &Value) {
        if !self.will_log(LogLevel::Verbose) {
            return;
        }
        let text = if value.is_null() {
            format!("{} - null or undefined", message)
        } else {
            format!("{} {}", message, value)
        };
        self.write(LogLevel::Verbose, &text, None);
    }
}

/// Logger that drops everything. Used until the host is initialized.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn will_log(&self, _level: LogLevel) -> bool {
        false
    }

    fn write(&self, _level: LogLevel, _message: &str, _data: Option<LogData>) {}
}
