//! Error types for apphost
//!
//! `HostError` is the error returned by components and host-level
//! operations. `LifecycleError` is the classification the orchestrator
//! records on module and runnable entries when a hook fails.

use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Primary Error Type
// ============================================================================

/// The primary error type for apphost operations.
#[derive(Error, Debug)]
pub enum HostError {
    /// Configuration errors (unreadable file, unsupported format, bad value)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Object graph errors (missing binding, type mismatch)
    #[error("Container error: {0}")]
    Container(String),

    /// A module or runnable reported a failure of its own
    #[error("Component error: {0}")]
    Component(String),

    /// A lifecycle hook did not settle within the configured deadline
    #[error("Hook timed out after {0:?}")]
    Timeout(Duration),

    /// The host was stopped and released its object graph
    #[error("Host is closed: {0}")]
    Closed(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML parse errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Anything else a component wants to propagate with `?`
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A specialized `Result` type for apphost operations.
pub type Result<T> = std::result::Result<T, HostError>;

// ============================================================================
// Lifecycle Error Classification
// ============================================================================

/// Failure recorded against a module or runnable entry.
///
/// Each variant names the hook that failed; none of them aborts the pass
/// that produced it.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// The module initializer failed; the module stays uninitialized.
    #[error("module '{name}' failed to initialize: {source}")]
    ModuleInit { name: String, source: HostError },

    /// `start` failed; the runnable is excluded from the later phases.
    #[error("runnable '{name}' failed to start: {source}")]
    RunnableStart { name: String, source: HostError },

    /// `all_started` failed on a started runnable; it is rolled back.
    #[error("runnable '{name}' failed to confirm start: {source}")]
    RunnableConfirm { name: String, source: HostError },

    /// `stop` failed; teardown of the other runnables continues.
    #[error("runnable '{name}' failed to stop: {source}")]
    RunnableStop { name: String, source: HostError },

    /// `all_stopped` failed; the runnable keeps its started flag.
    #[error("runnable '{name}' failed to finish stopping: {source}")]
    RunnableAllStopped { name: String, source: HostError },
}

impl LifecycleError {
    /// Name of the module or runnable the failure belongs to.
    pub fn name(&self) -> &str {
        match self {
            LifecycleError::ModuleInit { name, .. }
            | LifecycleError::RunnableStart { name, .. }
            | LifecycleError::RunnableConfirm { name, .. }
            | LifecycleError::RunnableStop { name, .. }
            | LifecycleError::RunnableAllStopped { name, .. } => name,
        }
    }

    /// The underlying component error.
    pub fn cause(&self) -> &HostError {
        match self {
            LifecycleError::ModuleInit { source, .. }
            | LifecycleError::RunnableStart { source, .. }
            | LifecycleError::RunnableConfirm { source, .. }
            | LifecycleError::RunnableStop { source, .. }
            | LifecycleError::RunnableAllStopped { source, .. } => source,
        }
    }

    /// Returns `true` when the failure happened while tearing down.
    pub fn is_teardown(&self) -> bool {
        matches!(
            self,
            LifecycleError::RunnableStop { .. } | LifecycleError::RunnableAllStopped { .. }
        )
    }
}
