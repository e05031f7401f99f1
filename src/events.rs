//! Lifecycle notifications.
//!
//! The host publishes a [`LifecycleEvent`] for every observable step of
//! initialization, startup and shutdown on a `tokio::sync::broadcast`
//! channel. Publishing never blocks and never fails: with no subscribers
//! the event is dropped, and slow subscribers see `RecvError::Lagged`.

use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::error::LifecycleError;

/// Capacity of the event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The runnable hook an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    Start,
    AllStarted,
    Stop,
    AllStopped,
}

impl LifecyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecyclePhase::Start => "start",
            LifecyclePhase::AllStarted => "allStarted",
            LifecyclePhase::Stop => "stop",
            LifecyclePhase::AllStopped => "allStopped",
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something observable that happened to the host.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// Configuration and logging are wired.
    Initialized,
    ModuleAdded { name: String },
    ModuleInitialized { name: String },
    ModuleFailed { name: String, error: Arc<LifecycleError> },
    RunnablesDiscovered { names: Vec<String> },
    RunnableStarted { name: String },
    RunnableFailed {
        name: String,
        phase: LifecyclePhase,
        error: Arc<LifecycleError>,
    },
    RunnableAllStarted { name: String },
    RunnableStopped { name: String },
    RunnableAllStopped { name: String },
    /// `start()` finished every phase.
    Started,
    /// `stop()` finished and the host is closed.
    Stopped,
}

impl LifecycleEvent {
    /// Dotted event name, e.g. `runnable.allStarted`.
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::Initialized => "initialized",
            LifecycleEvent::ModuleAdded { .. } => "module.added",
            LifecycleEvent::ModuleInitialized { .. } => "module.initialized",
            LifecycleEvent::ModuleFailed { .. } => "module.failed",
            LifecycleEvent::RunnablesDiscovered { .. } => "runnables.discovered",
            LifecycleEvent::RunnableStarted { .. } => "runnable.started",
            LifecycleEvent::RunnableFailed { .. } => "runnable.failed",
            LifecycleEvent::RunnableAllStarted { .. } => "runnable.allStarted",
            LifecycleEvent::RunnableStopped { .. } => "runnable.stop",
            LifecycleEvent::RunnableAllStopped { .. } => "runnable.allStopped",
            LifecycleEvent::Started => "start",
            LifecycleEvent::Stopped => "stop",
        }
    }

    /// The module or runnable the event is about, if any.
    pub fn subject(&self) -> Option<&str> {
        match self {
            LifecycleEvent::ModuleAdded { name }
            | LifecycleEvent::ModuleInitialized { name }
            | LifecycleEvent::ModuleFailed { name, .. }
            | LifecycleEvent::RunnableStarted { name }
            | LifecycleEvent::RunnableFailed { name, .. }
            | LifecycleEvent::RunnableAllStarted { name }
            | LifecycleEvent::RunnableStopped { name }
            | LifecycleEvent::RunnableAllStopped { name } => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.subject() {
            Some(subject) => write!(f, "{} ({})", self.name(), subject),
            None => f.write_str(self.name()),
        }
    }
}

/// Cloneable publishing side of the event channel.
#[derive(Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl EventEmitter {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.tx.subscribe()
    }

    /// Publish an event; dropped when nobody listens.
    pub fn emit(&self, event: LifecycleEvent) {
        let _ = self.tx.send(event);
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}
