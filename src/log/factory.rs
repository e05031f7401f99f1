//! Per-context loggers.

use super::{LogData, LogLevel, LogManager, Logger};
use crate::config::{coerce_string, merge, RootConfig};

/// Creates [`Log`] instances bound to one configuration and one sink set.
#[derive(Clone)]
pub struct LogFactory {
    config: RootConfig,
    manager: LogManager,
}

impl LogFactory {
    pub fn new(config: RootConfig, manager: LogManager) -> Self {
        Self { config, manager }
    }

    /// Create a logger for `ctx`.
    ///
    /// The level comes from `log.instances.<ctx>`, falling back to
    /// `log.level`, and is fixed for the lifetime of the logger. Both keys
    /// are optional, so they are read from the raw tree without the
    /// missing-key diagnostics of [`crate::config::ConfigView`].
    pub fn create_log(&self, ctx: &str) -> Log {
        let data = self.config.data();
        let setting = |path: &str| merge::lookup(&data, path).and_then(coerce_string);
        let level = setting(&format!("log.instances.{}", ctx))
            .or_else(|| setting("log.level"))
            .unwrap_or_default();
        Log {
            ctx: ctx.to_string(),
            level: LogLevel::parse(&level),
            manager: self.manager.clone(),
        }
    }

    pub fn manager(&self) -> &LogManager {
        &self.manager
    }

    pub fn config(&self) -> &RootConfig {
        &self.config
    }
}

/// A logger for one named context.
#[derive(Clone)]
pub struct Log {
    ctx: String,
    level: LogLevel,
    manager: LogManager,
}

impl Log {
    pub fn ctx(&self) -> &str {
        &self.ctx
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }
}

impl Logger for Log {
    fn will_log(&self, level: LogLevel) -> bool {
        self.level >= level
    }

    fn write(&self, level: LogLevel, message: &str, data: Option<LogData>) {
        self.manager.dispatch(level, &self.ctx, message, data);
    }
}

impl std::fmt::Debug for Log {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Log")
            .field("ctx", &self.ctx)
            .field("level", &self.level)
            .finish()
    }
}
