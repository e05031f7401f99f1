//! The host facade.
//!
//! A [`Host`] owns the configuration, the log dispatcher, the object graph
//! and the module and runnable registries. Its lifecycle is one-way:
//!
//! ```text
//! new ──> init ──> start ──> stop (closed)
//! ```
//!
//! `init` and `start` are idempotent. After `stop` the object graph is
//! released and the host cannot be started again.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::broadcast;

use crate::config::{merge, ConfigBuilder, ConfigView, HostSettings, RootConfig};
use crate::container::Container;
use crate::error::{HostError, Result};
use crate::events::{EventEmitter, LifecycleEvent};
use crate::lifecycle::Orchestrator;
use crate::log::{
    ConsoleSink, LogData, LogFactory, LogLevel, LogManager, Logger, NoopLogger, TracingSink,
};
use crate::module::{Module, ModuleFn, ModuleRegistry};
use crate::runnable::RunnableRegistry;

/// Lifecycle flags and registries of one host.
#[derive(Default, Debug)]
pub struct HostState {
    initialized: bool,
    started: bool,
    closed: bool,
    modules: ModuleRegistry,
    runnables: RunnableRegistry,
}

/// Application host.
///
/// # Example
/// ```no_run
/// use apphost::{Host, ModuleFn};
/// use serde_json::json;
///
/// # async fn run() -> apphost::Result<()> {
/// let mut host = Host::new();
/// host.add_module(ModuleFn::new("Wiring", |_container, _host, _options| Ok(())), json!({}));
/// host.start(json!({"log": {"level": "debug"}})).await?;
/// host.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct Host {
    state: HostState,
    container: Option<Arc<Container>>,
    config: RootConfig,
    builder: Arc<ConfigBuilder>,
    log_manager: LogManager,
    log_factory: LogFactory,
    log: Arc<dyn Logger>,
    events: EventEmitter,
    hook_timeout: Option<Duration>,
    /// Deadline set through `with_hook_timeout`; wins over configuration.
    fixed_hook_timeout: Option<Duration>,
}

impl Host {
    pub fn new() -> Self {
        Self::with_container(Arc::new(Container::new()))
    }

    /// Host using an existing object graph.
    pub fn with_container(container: Arc<Container>) -> Self {
        let config = RootConfig::new();
        let builder = Arc::new(ConfigBuilder::new(config.clone()));
        let log_manager = LogManager::new();
        let log_factory = LogFactory::new(config.clone(), log_manager.clone());
        Self {
            state: HostState::default(),
            container: Some(container),
            config,
            builder,
            log_manager,
            log_factory,
            log: Arc::new(NoopLogger),
            events: EventEmitter::new(),
            hook_timeout: None,
            fixed_hook_timeout: None,
        }
    }

    /// Put a deadline on every module initializer and runnable hook.
    ///
    /// Takes precedence over `host.hook_timeout_ms`.
    pub fn with_hook_timeout(mut self, timeout: Duration) -> Self {
        self.hook_timeout = Some(timeout);
        self.fixed_hook_timeout = Some(timeout);
        self
    }

    /// Create an initialized host with a single closure module.
    pub fn build<F>(init: F, options: Value) -> Self
    where
        F: Fn(&Container, &Host, &Value) -> Result<()> + Send + Sync + 'static,
    {
        let mut host = Host::new();
        host.init(Value::Null)
            .add_module(ModuleFn::new("Main", init), options);
        host
    }

    /// Register a module. Modules initialize in registration order.
    pub fn add_module<M: Module + 'static>(&mut self, module: M, options: Value) -> &mut Self {
        self.add_module_arc(Arc::new(module), options)
    }

    pub fn add_module_arc(&mut self, module: Arc<dyn Module>, options: Value) -> &mut Self {
        let name = self.state.modules.register(module, options).name().to_string();
        self.log.debug(&format!("Module '{}' added.", name));
        self.events.emit(LifecycleEvent::ModuleAdded { name });
        self
    }

    /// Wire configuration and logging. Runs once; later calls are no-ops.
    ///
    /// `options` becomes the first configuration overlay, with the log
    /// defaults filled in underneath it, followed by the environment
    /// (under `env`).
    pub fn init(&mut self, options: Value) -> &mut Self {
        if self.state.initialized {
            return self;
        }

        let mut options = if options.is_null() { json!({}) } else { options };
        merge::defaults_deep(
            &mut options,
            &json!({
                "log": {
                    "level": LogLevel::Info.as_str(),
                    "loggers": { "console": { "enabled": true } }
                }
            }),
        );
        self.builder.add_json(options).add_environment().build();

        if !self.config.get_bool("log.disable_default", false) {
            self.log_manager
                .add_sink("console", Arc::new(ConsoleSink::new(&self.config)));
        }
        if self.config.get_bool("log.loggers.tracing.enabled", false) {
            self.log_manager.add_sink("tracing", Arc::new(TracingSink));
        }

        if let Some(container) = &self.container {
            container.bind(self.config.clone());
            container.bind_arc(self.builder.clone());
            container.bind(self.log_factory.clone());
            container.bind(self.log_manager.clone());
        }

        self.config
            .set_logger(Arc::new(self.log_factory.create_log("Config")));
        self.log = Arc::new(self.log_factory.create_log("Host"));

        self.apply_host_settings();

        self.state.initialized = true;
        self.events.emit(LifecycleEvent::Initialized);
        self
    }

    /// Initialize pending modules, then start every discovered runnable.
    ///
    /// Individual failures never make this return an error; inspect
    /// [`Host::modules`] and [`Host::runnables`] afterwards. The only error
    /// is [`HostError::Closed`] once the host has been stopped.
    pub async fn start(&mut self, options: Value) -> Result<()> {
        if self.state.closed {
            return Err(HostError::Closed("start() called after stop()".to_string()));
        }
        if self.state.started {
            return Ok(());
        }

        self.init(options.clone());
        self.builder.add_json(options.clone()).build();
        self.apply_host_settings();

        let container = self
            .container
            .clone()
            .ok_or_else(|| HostError::Closed("object graph released".to_string()))?;
        let orchestrator = self.orchestrator();

        let outcomes = orchestrator
            .initialize_modules(self, &container, &options)
            .await;
        self.state.modules.apply(outcomes);

        if container.has_runnables() {
            self.state.runnables.populate(container.runnables());
            self.log
                .info(&format!("Found {} runnables.", self.state.runnables.len()));
            self.events.emit(LifecycleEvent::RunnablesDiscovered {
                names: self.state.runnables.names(),
            });
        }

        let stop_set = orchestrator.start_all(&mut self.state.runnables).await;
        self.state.started = true;
        orchestrator
            .stop_entries(&mut self.state.runnables, &stop_set)
            .await;

        self.events.emit(LifecycleEvent::Started);
        Ok(())
    }

    /// Stop every started runnable and close the host.
    ///
    /// Calling it again on a closed host does nothing.
    pub async fn stop(&mut self) -> Result<()> {
        if self.state.closed {
            return Ok(());
        }
        let orchestrator = self.orchestrator();
        let all = self.state.runnables.all_indices();
        orchestrator
            .stop_entries(&mut self.state.runnables, &all)
            .await;

        self.container = None;
        self.state.started = false;
        self.state.closed = true;
        self.log.debug("Host stopped.");
        self.events.emit(LifecycleEvent::Stopped);
        Ok(())
    }

    /// Re-read `host` settings from the merged configuration.
    fn apply_host_settings(&mut self) {
        let configured = match self.config.get_as::<HostSettings>("host") {
            Ok(settings) => settings.and_then(|s| s.hook_timeout()),
            Err(e) => {
                self.log
                    .warn_with("Ignoring invalid 'host' settings", LogData::error(&e));
                None
            }
        };
        self.hook_timeout = self.fixed_hook_timeout.or(configured);
    }

    fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(self.log.clone(), self.events.clone(), self.hook_timeout)
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.state.modules
    }

    pub fn runnables(&self) -> &RunnableRegistry {
        &self.state.runnables
    }

    /// The object graph; `None` once the host is stopped.
    pub fn container(&self) -> Option<&Arc<Container>> {
        self.container.as_ref()
    }

    pub fn config(&self) -> &RootConfig {
        &self.config
    }

    pub fn config_builder(&self) -> &Arc<ConfigBuilder> {
        &self.builder
    }

    pub fn log_factory(&self) -> &LogFactory {
        &self.log_factory
    }

    pub fn log_manager(&self) -> &LogManager {
        &self.log_manager
    }

    /// The host's own logger (context `Host`).
    pub fn log(&self) -> &Arc<dyn Logger> {
        &self.log
    }

    pub fn hook_timeout(&self) -> Option<Duration> {
        self.hook_timeout
    }

    pub fn is_initialized(&self) -> bool {
        self.state.initialized
    }

    pub fn is_started(&self) -> bool {
        self.state.started
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed
    }

    /// Receive lifecycle events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("state", &self.state)
            .field("container", &self.container)
            .field("hook_timeout", &self.hook_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> Value {
        json!({"log": {"disable_default": true}})
    }

    #[test]
    fn test_new_host_is_idle() {
        let host = Host::new();
        assert!(!host.is_initialized());
        assert!(!host.is_started());
        assert!(!host.is_closed());
        assert!(host.container().is_some());
        assert!(host.modules().is_empty());
    }

    #[test]
    fn test_init_applies_log_defaults() {
        let mut host = Host::new();
        host.init(json!({"app": {"name": "demo"}}));
        assert!(host.is_initialized());
        assert_eq!(host.config().get_string("log.level", ""), "Info");
        assert!(host.config().get_bool("log.loggers.console.enabled", false));
        assert_eq!(host.config().get_string("app.name", ""), "demo");
        assert!(host.log_manager().has_sink("console"));
    }

    #[test]
    fn test_init_keeps_explicit_log_settings() {
        let mut host = Host::new();
        host.init(json!({"log": {"level": "verbose", "disable_default": true}}));
        assert_eq!(host.config().get_string("log.level", ""), "verbose");
        assert!(!host.log_manager().has_sink("console"));
    }

    #[test]
    fn test_init_is_idempotent() {
        let mut host = Host::new();
        host.init(json!({"first": true}));
        host.init(json!({"second": true}));
        assert!(host.config().get_bool("first", false));
        assert!(host.config().lookup("second").is_none());
    }

    #[test]
    fn test_init_binds_services() {
        let mut host = Host::new();
        host.init(quiet());
        let container = host.container().unwrap();
        assert!(container.is_bound::<RootConfig>());
        assert!(container.is_bound::<ConfigBuilder>());
        assert!(container.is_bound::<LogFactory>());
        assert!(container.is_bound::<LogManager>());
    }

    #[test]
    fn test_hook_timeout_from_config() {
        let mut host = Host::new();
        host.init(json!({"host": {"hook_timeout_ms": 1500}, "log": {"disable_default": true}}));
        assert_eq!(host.hook_timeout(), Some(Duration::from_millis(1500)));

        let mut host = Host::new().with_hook_timeout(Duration::from_millis(20));
        host.init(json!({"host": {"hook_timeout_ms": 1500}}));
        assert_eq!(host.hook_timeout(), Some(Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_hook_timeout_from_start_options_after_init() {
        let mut host = Host::build(|_, _, _| Ok(()), Value::Null);
        assert_eq!(host.hook_timeout(), None);
        host.start(json!({"host": {"hook_timeout_ms": 50}, "log": {"disable_default": true}}))
            .await
            .unwrap();
        assert_eq!(host.hook_timeout(), Some(Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_invalid_host_settings_are_ignored() {
        let mut host = Host::new();
        host.start(json!({"host": {"hook_timeout_ms": "soon"}, "log": {"disable_default": true}}))
            .await
            .unwrap();
        assert_eq!(host.hook_timeout(), None);
        assert!(host.is_started());
    }

    #[test]
    fn test_build_registers_main_module() {
        let host = Host::build(|_, _, _| Ok(()), json!({"a": 1}));
        assert!(host.is_initialized());
        assert_eq!(host.modules().len(), 1);
        assert_eq!(host.modules().entries()[0].name(), "Main");
    }

    #[tokio::test]
    async fn test_stop_closes_host() {
        let mut host = Host::new();
        host.start(quiet()).await.unwrap();
        assert!(host.is_started());
        host.stop().await.unwrap();
        assert!(host.is_closed());
        assert!(!host.is_started());
        assert!(host.container().is_none());
        assert!(matches!(
            host.start(Value::Null).await,
            Err(HostError::Closed(_))
        ));
        assert!(host.stop().await.is_ok());
    }
}
