//! Sink registry and fan-out.

use std::sync::{Arc, RwLock};

use chrono::Local;
use tracing::debug;

use super::{LogData, LogEntry, LogLevel};
use crate::error::Result;

/// Destination for dispatched log entries (console, tracing, files...).
pub trait LogSink: Send + Sync {
    /// Write one entry. Errors are reported but never stop the fan-out.
    fn log(&self, entry: &LogEntry) -> Result<()>;
}

struct NamedSink {
    name: String,
    sink: Arc<dyn LogSink>,
}

/// Ordered set of named sinks shared by every [`Log`](super::Log) created
/// from the same factory.
///
/// Cloning is cheap; clones share the same sink list.
#[derive(Clone, Default)]
pub struct LogManager {
    sinks: Arc<RwLock<Vec<NamedSink>>>,
}

impl LogManager {
    /// Create a manager with no sinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink under `name`. Returns `false` (and keeps the existing
    /// sink) when the name is already taken.
    pub fn add_sink(&self, name: &str, sink: Arc<dyn LogSink>) -> bool {
        let mut sinks = self.sinks.write().unwrap_or_else(|e| e.into_inner());
        if sinks.iter().any(|s| s.name == name) {
            debug!(sink = name, "Log sink already registered, keeping existing");
            return false;
        }
        sinks.push(NamedSink {
            name: name.to_string(),
            sink,
        });
        true
    }

    /// Remove the sink registered under `name`.
    pub fn remove_sink(&self, name: &str) -> bool {
        let mut sinks = self.sinks.write().unwrap_or_else(|e| e.into_inner());
        let before = sinks.len();
        sinks.retain(|s| s.name != name);
        sinks.len() != before
    }

    /// Names of the registered sinks, in registration order.
    pub fn sink_names(&self) -> Vec<String> {
        let sinks = self.sinks.read().unwrap_or_else(|e| e.into_inner());
        sinks.iter().map(|s| s.name.clone()).collect()
    }

    pub fn has_sink(&self, name: &str) -> bool {
        let sinks = self.sinks.read().unwrap_or_else(|e| e.into_inner());
        sinks.iter().any(|s| s.name == name)
    }

    /// Build an entry and hand it to every sink.
    pub fn dispatch(&self, level: LogLevel, ctx: &str, message: &str, data: Option<LogData>) {
        let entry = LogEntry {
            level,
            ctx: ctx.to_string(),
            time: Local::now(),
            message: message.to_string(),
            data,
        };
        let sinks = self.sinks.read().unwrap_or_else(|e| e.into_inner());
        for named in sinks.iter() {
            if let Err(e) = named.sink.log(&entry) {
                debug!(
                    sink = %named.name,
                    ctx = %entry.ctx,
                    "Log sink failed to write entry: {}",
                    e
                );
            }
        }
    }
}
