//! Heartbeat runnable and the module that binds it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::{coerce_number, coerce_string, merge};
use crate::container::Container;
use crate::error::{HostError, Result};
use crate::host::Host;
use crate::log::Logger;
use crate::module::Module;
use crate::runnable::Runnable;

/// Tick interval used when `interval_ms` is not set.
pub const DEFAULT_INTERVAL_MS: u64 = 30_000;
/// Shorter intervals are raised to this value.
pub const MIN_INTERVAL_MS: u64 = 10;

/// Runnable that counts ticks on a background task.
pub struct HeartbeatRunnable {
    name: String,
    interval: Duration,
    log: Arc<dyn Logger>,
    ticks: Arc<AtomicU64>,
    stop_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HeartbeatRunnable {
    pub fn new(name: &str, interval: Duration, log: Arc<dyn Logger>) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            name: name.to_string(),
            interval: interval.max(Duration::from_millis(MIN_INTERVAL_MS)),
            log,
            ticks: Arc::new(AtomicU64::new(0)),
            stop_tx,
            task: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Ticks observed since creation.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Whether the background task is alive.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

#[async_trait]
impl Runnable for HeartbeatRunnable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) -> Result<()> {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.is_some() {
            self.log
                .warn(&format!("Heartbeat '{}' already running", self.name));
            return Ok(());
        }
        self.stop_tx.send_replace(false);

        let mut stop_rx = self.stop_tx.subscribe();
        let interval = self.interval;
        let ticks = Arc::clone(&self.ticks);
        let log = Arc::clone(&self.log);
        let name = self.name.clone();

        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let count = ticks.fetch_add(1, Ordering::Relaxed) + 1;
                        log.verbose(&format!("Heartbeat '{}' tick {}", name, count));
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            log.debug(&format!("Heartbeat '{}' stopped", name));
        }));

        self.log.info(&format!(
            "Heartbeat '{}' started (interval={}ms)",
            self.name,
            interval.as_millis()
        ));
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.stop_tx.send_replace(true);
        Ok(())
    }

    async fn all_stopped(&self) -> Result<()> {
        let handle = self
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.await.map_err(|e| {
                HostError::Component(format!("heartbeat task '{}' ended abnormally: {}", self.name, e))
            })?;
        }
        Ok(())
    }
}

/// Module that binds a [`HeartbeatRunnable`] built from its options.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeartbeatModule;

#[async_trait]
impl Module for HeartbeatModule {
    async fn init(&self, container: &Container, host: &Host, options: &Value) -> Result<()> {
        let interval_ms = merge::lookup(options, "interval_ms")
            .and_then(coerce_number)
            .map(|ms| ms.max(0.0) as u64)
            .unwrap_or(DEFAULT_INTERVAL_MS)
            .max(MIN_INTERVAL_MS);
        let name = merge::lookup(options, "name")
            .and_then(coerce_string)
            .unwrap_or_else(|| "Heartbeat".to_string());

        let log = Arc::new(host.log_factory().create_log(&name));
        let runnable = Arc::new(HeartbeatRunnable::new(
            &name,
            Duration::from_millis(interval_ms),
            log,
        ));
        container.bind_arc(Arc::clone(&runnable));
        container.bind_runnable(runnable);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::NoopLogger;
    use serde_json::json;

    fn runnable(ms: u64) -> HeartbeatRunnable {
        HeartbeatRunnable::new("hb", Duration::from_millis(ms), Arc::new(NoopLogger))
    }

    #[test]
    fn test_interval_floor() {
        assert_eq!(runnable(1).interval(), Duration::from_millis(MIN_INTERVAL_MS));
        assert_eq!(runnable(250).interval(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_ticks_until_stopped() {
        let hb = runnable(10);
        hb.start().await.unwrap();
        assert!(hb.is_running());
        tokio::time::sleep(Duration::from_millis(80)).await;
        hb.stop().await.unwrap();
        hb.all_stopped().await.unwrap();
        assert!(!hb.is_running());

        let ticks = hb.ticks();
        assert!(ticks > 0);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(hb.ticks(), ticks);
    }

    #[tokio::test]
    async fn test_double_start_is_noop() {
        let hb = runnable(10);
        hb.start().await.unwrap();
        hb.start().await.unwrap();
        hb.stop().await.unwrap();
        hb.all_stopped().await.unwrap();
        assert!(!hb.is_running());
    }

    #[tokio::test]
    async fn test_all_stopped_without_start() {
        let hb = runnable(10);
        assert!(hb.all_stopped().await.is_ok());
    }

    #[tokio::test]
    async fn test_module_binds_runnable() {
        let mut host = Host::new();
        host.init(json!({"log": {"disable_default": true}}));
        let container = Container::new();
        HeartbeatModule
            .init(&container, &host, &json!({"interval_ms": "5", "name": "pulse"}))
            .await
            .unwrap();

        let bound = container.resolve::<HeartbeatRunnable>().unwrap();
        assert_eq!(bound.interval(), Duration::from_millis(MIN_INTERVAL_MS));
        let runnables = container.runnables();
        assert_eq!(runnables.len(), 1);
        assert_eq!(runnables[0].name(), "pulse");
    }

    #[tokio::test]
    async fn test_module_defaults() {
        let mut host = Host::new();
        host.init(json!({"log": {"disable_default": true}}));
        let container = Container::new();
        HeartbeatModule.init(&container, &host, &json!({})).await.unwrap();
        let bound = container.resolve::<HeartbeatRunnable>().unwrap();
        assert_eq!(bound.interval(), Duration::from_millis(DEFAULT_INTERVAL_MS));
        assert_eq!(bound.name(), "Heartbeat");
    }
}
