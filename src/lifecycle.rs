//! Lifecycle orchestration.
//!
//! Every pass is strictly sequential and best effort: each entry gets its
//! attempt for a phase regardless of how earlier entries fared, and a phase
//! only begins once the previous one visited every entry. Failures are
//! recorded on the entry, logged once and published as events; none of
//! them aborts a pass.
//!
//! ```text
//! start:  Start(all) ──> AllStarted(started) ──> rollback(stop set)
//! stop:   Stop(started) ──> AllStopped(still started)
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::config::merge;
use crate::container::Container;
use crate::error::{HostError, LifecycleError, Result};
use crate::events::{EventEmitter, LifecycleEvent, LifecyclePhase};
use crate::host::Host;
use crate::log::{LogData, Logger};
use crate::module::ModuleOutcome;
use crate::runnable::RunnableRegistry;

/// Drives module initialization and the runnable phases for one host.
pub struct Orchestrator {
    log: Arc<dyn Logger>,
    events: EventEmitter,
    hook_timeout: Option<Duration>,
}

impl Orchestrator {
    pub fn new(log: Arc<dyn Logger>, events: EventEmitter, hook_timeout: Option<Duration>) -> Self {
        Self {
            log,
            events,
            hook_timeout,
        }
    }

    async fn call<F>(&self, hook: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        match self.hook_timeout {
            Some(limit) => tokio::time::timeout(limit, hook)
                .await
                .unwrap_or_else(|_| Err(HostError::Timeout(limit))),
            None => hook.await,
        }
    }

    /// Run every pending module initializer of `host`, in registration order.
    ///
    /// Each initializer receives `shared` merged under the entry's own
    /// options. The outcomes are returned for the caller to record, since
    /// the registry is borrowed from `host` for the duration of the pass.
    pub async fn initialize_modules(
        &self,
        host: &Host,
        container: &Container,
        shared: &Value,
    ) -> Vec<ModuleOutcome> {
        let modules = host.modules();
        let mut outcomes = Vec::new();
        for index in modules.pending() {
            let entry = &modules.entries()[index];
            let name = entry.name().to_string();
            let options = merge::overlay(shared, entry.options());
            self.log
                .debug(&format!(" -> Initializing module '{}'.", name));

            let result = match self.call(entry.module().init(container, host, &options)).await {
                Ok(()) => {
                    self.events
                        .emit(LifecycleEvent::ModuleInitialized { name: name.clone() });
                    Ok(())
                }
                Err(source) => {
                    self.log.error_with(
                        &format!("Error initializing module {}.", name),
                        LogData::error(&source),
                    );
                    let error = Arc::new(LifecycleError::ModuleInit {
                        name: name.clone(),
                        source,
                    });
                    self.events.emit(LifecycleEvent::ModuleFailed {
                        name,
                        error: error.clone(),
                    });
                    Err(error)
                }
            };
            outcomes.push(ModuleOutcome { index, result });
        }
        outcomes
    }

    /// Start phase then AllStarted phase over every entry.
    ///
    /// Returns the indices of entries whose `all_started` failed; they are
    /// still marked started and must be rolled back with
    /// [`Orchestrator::stop_entries`].
    pub async fn start_all(&self, registry: &mut RunnableRegistry) -> Vec<usize> {
        for entry in registry.entries_mut() {
            let name = entry.name().to_string();
            self.log.debug(&format!(" -> Starting runnable '{}'.", name));
            let runnable = entry.runnable().clone();
            match self.call(runnable.start()).await {
                Ok(()) => {
                    entry.started = true;
                    self.events.emit(LifecycleEvent::RunnableStarted { name });
                }
                Err(source) => {
                    entry.started = false;
                    self.log.error_with(
                        &format!(" -> Error starting runnable '{}'", name),
                        LogData::error(&source),
                    );
                    let error = Arc::new(LifecycleError::RunnableStart {
                        name: name.clone(),
                        source,
                    });
                    entry.last_error = Some(error.clone());
                    self.events.emit(LifecycleEvent::RunnableFailed {
                        name,
                        phase: LifecyclePhase::Start,
                        error,
                    });
                }
            }
        }

        let mut stop_set = Vec::new();
        for (index, entry) in registry.entries_mut().iter_mut().enumerate() {
            if !entry.started {
                continue;
            }
            let name = entry.name().to_string();
            self.log.debug(&format!(" -> All Started '{}'.", name));
            let runnable = entry.runnable().clone();
            match self.call(runnable.all_started()).await {
                Ok(()) => {
                    self.events
                        .emit(LifecycleEvent::RunnableAllStarted { name });
                }
                Err(source) => {
                    self.log.error_with(
                        &format!(" -> Error calling allStarted on runnable '{}'", name),
                        LogData::error(&source),
                    );
                    let error = Arc::new(LifecycleError::RunnableConfirm {
                        name: name.clone(),
                        source,
                    });
                    entry.last_error = Some(error.clone());
                    stop_set.push(index);
                    self.events.emit(LifecycleEvent::RunnableFailed {
                        name,
                        phase: LifecyclePhase::AllStarted,
                        error,
                    });
                }
            }
        }
        stop_set
    }

    /// Stop phase then AllStopped phase over the entries at `indices`.
    ///
    /// Only entries still marked started are visited. `stop` leaves the
    /// flag alone; a successful `all_stopped` clears it.
    pub async fn stop_entries(&self, registry: &mut RunnableRegistry, indices: &[usize]) {
        for &index in indices {
            let Some(entry) = registry.entries_mut().get_mut(index) else {
                continue;
            };
            if !entry.started {
                continue;
            }
            let name = entry.name().to_string();
            self.log.debug(&format!(" -> Stopping runnable '{}'.", name));
            let runnable = entry.runnable().clone();
            match self.call(runnable.stop()).await {
                Ok(()) => {
                    self.events.emit(LifecycleEvent::RunnableStopped { name });
                }
                Err(source) => {
                    self.log.error_with(
                        &format!(" -> Error stopping runnable '{}'", name),
                        LogData::error(&source),
                    );
                    let error = Arc::new(LifecycleError::RunnableStop {
                        name: name.clone(),
                        source,
                    });
                    entry.last_error = Some(error.clone());
                    self.events.emit(LifecycleEvent::RunnableFailed {
                        name,
                        phase: LifecyclePhase::Stop,
                        error,
                    });
                }
            }
        }

        for &index in indices {
            let Some(entry) = registry.entries_mut().get_mut(index) else {
                continue;
            };
            if !entry.started {
                continue;
            }
            let name = entry.name().to_string();
            self.log.debug(&format!(" -> All Stopped '{}'.", name));
            let runnable = entry.runnable().clone();
            match self.call(runnable.all_stopped()).await {
                Ok(()) => {
                    entry.started = false;
                    self.events
                        .emit(LifecycleEvent::RunnableAllStopped { name });
                }
                Err(source) => {
                    self.log.error_with(
                        &format!(" -> Error calling allStopped on runnable '{}'", name),
                        LogData::error(&source),
                    );
                    let error = Arc::new(LifecycleError::RunnableAllStopped {
                        name: name.clone(),
                        source,
                    });
                    entry.last_error = Some(error.clone());
                    self.events.emit(LifecycleEvent::RunnableFailed {
                        name,
                        phase: LifecyclePhase::AllStopped,
                        error,
                    });
                }
            }
        }
    }
}
