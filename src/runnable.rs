//! Runnables and the runnable registry.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{LifecycleError, Result};
use crate::module::short_type_name;

/// A long-running component driven through the host lifecycle.
///
/// Startup calls `start` on every runnable, then `all_started` on those
/// that started. Shutdown calls `stop` on every started runnable, then
/// `all_stopped`. Every hook defaults to a no-op.
#[async_trait]
pub trait Runnable: Send + Sync {
    /// Name used in logs and events. Defaults to the type name.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    async fn start(&self) -> Result<()> {
        Ok(())
    }

    /// Called once every runnable had its `start` attempt.
    async fn all_started(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    /// Called once every runnable had its `stop` attempt.
    async fn all_stopped(&self) -> Result<()> {
        Ok(())
    }
}

/// A discovered runnable and its lifecycle status.
pub struct RunnableEntry {
    runnable: Arc<dyn Runnable>,
    name: String,
    pub(crate) started: bool,
    pub(crate) last_error: Option<Arc<LifecycleError>>,
}

impl RunnableEntry {
    pub fn new(runnable: Arc<dyn Runnable>) -> Self {
        let name = runnable.name().to_string();
        Self {
            runnable,
            name,
            started: false,
            last_error: None,
        }
    }

    pub fn runnable(&self) -> &Arc<dyn Runnable> {
        &self.runnable
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Most recent failure; overwritten by later failures, never cleared.
    pub fn last_error(&self) -> Option<&Arc<LifecycleError>> {
        self.last_error.as_ref()
    }
}

impl std::fmt::Debug for RunnableEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnableEntry")
            .field("name", &self.name)
            .field("started", &self.started)
            .field("last_error", &self.last_error)
            .finish()
    }
}

/// Runnables in discovery order.
#[derive(Default, Debug)]
pub struct RunnableRegistry {
    entries: Vec<RunnableEntry>,
}

impl RunnableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry per runnable, keeping the given order.
    pub fn populate(&mut self, runnables: Vec<Arc<dyn Runnable>>) {
        self.entries
            .extend(runnables.into_iter().map(RunnableEntry::new));
    }

    pub fn entries(&self) -> &[RunnableEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [RunnableEntry] {
        &mut self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&RunnableEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Entries that recorded a failure at any point.
    pub fn failures(&self) -> Vec<&RunnableEntry> {
        self.entries
            .iter()
            .filter(|e| e.last_error.is_some())
            .collect()
    }

    pub fn started_count(&self) -> usize {
        self.entries.iter().filter(|e| e.started).count()
    }

    /// Indices of every entry, in order.
    pub fn all_indices(&self) -> Vec<usize> {
        (0..self.entries.len()).collect()
    }
}
