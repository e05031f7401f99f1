//! Typed views over well-known configuration sections.
//!
//! These structs are read from the merged tree with
//! [`ConfigView::get_as`](super::ConfigView::get_as); every field has a
//! serde default so partial sections deserialize cleanly.

use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Settings under the `host` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// Deadline for every module initializer and runnable hook, in
    /// milliseconds. Absent means hooks may take as long as they need.
    /// Numeric strings are accepted, as environment overrides produce them.
    #[serde(deserialize_with = "u64_or_numeric_string")]
    pub hook_timeout_ms: Option<u64>,
}

fn u64_or_numeric_string<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(text)) => text
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid millisecond value '{}'", text))),
    }
}

impl HostSettings {
    pub fn hook_timeout(&self) -> Option<Duration> {
        self.hook_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

/// Output format of the process-wide `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Settings under `log.subscriber`, used by the binary to install the
/// `tracing` subscriber before the host exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
    /// Write JSON lines to this file instead of stderr.
    pub file: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}
