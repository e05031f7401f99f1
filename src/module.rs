//! Modules and the module registry.
//!
//! A module is a one-shot initializer: it runs once per host, during the
//! first `start()` in which it succeeds, and wires bindings (including
//! runnables) into the [`Container`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::container::Container;
use crate::error::{LifecycleError, Result};
use crate::host::Host;

/// Last path segment of a type name, without generic arguments.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// A one-shot initializer registered on a [`Host`].
#[async_trait]
pub trait Module: Send + Sync {
    /// Name used in logs and events. Defaults to the type name.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Wire the module into `container`.
    ///
    /// `options` is the module's own options merged with the options
    /// passed to `start()`; the module's own values win.
    async fn init(&self, container: &Container, host: &Host, options: &Value) -> Result<()>;
}

type InitFn = dyn Fn(&Container, &Host, &Value) -> Result<()> + Send + Sync;

/// A module built from a synchronous closure.
///
/// # Example
/// ```
/// use apphost::module::ModuleFn;
///
/// let module = ModuleFn::new("Wiring", |container, _host, _options| {
///     container.bind(42u16);
///     Ok(())
/// });
/// ```
pub struct ModuleFn {
    name: String,
    init: Box<InitFn>,
}

impl ModuleFn {
    pub fn new<F>(name: impl Into<String>, init: F) -> Self
    where
        F: Fn(&Container, &Host, &Value) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            init: Box::new(init),
        }
    }
}

#[async_trait]
impl Module for ModuleFn {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self, container: &Container, host: &Host, options: &Value) -> Result<()> {
        (self.init)(container, host, options)
    }
}

/// A registered module and its initialization status.
pub struct ModuleEntry {
    module: Arc<dyn Module>,
    name: String,
    options: Value,
    initialized: bool,
    last_error: Option<Arc<LifecycleError>>,
}

impl ModuleEntry {
    pub fn module(&self) -> &Arc<dyn Module> {
        &self.module
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &Value {
        &self.options
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Most recent initialization failure, kept after a later success.
    pub fn last_error(&self) -> Option<&Arc<LifecycleError>> {
        self.last_error.as_ref()
    }
}

impl std::fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("initialized", &self.initialized)
            .field("last_error", &self.last_error)
            .finish()
    }
}

/// Result of one initializer call, applied back onto the registry.
#[derive(Debug)]
pub struct ModuleOutcome {
    pub index: usize,
    pub result: std::result::Result<(), Arc<LifecycleError>>,
}

/// Ordered list of registered modules. Registration order is
/// initialization order; entries are never removed.
#[derive(Default, Debug)]
pub struct ModuleRegistry {
    entries: Vec<ModuleEntry>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a module. `Null` options are stored as `{}`.
    pub fn register(&mut self, module: Arc<dyn Module>, options: Value) -> &ModuleEntry {
        let options = if options.is_null() {
            Value::Object(Default::default())
        } else {
            options
        };
        let name = module.name().to_string();
        let index = self.entries.len();
        self.entries.push(ModuleEntry {
            module,
            name,
            options,
            initialized: false,
            last_error: None,
        });
        &self.entries[index]
    }

    pub fn entries(&self) -> &[ModuleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ModuleEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Indices of entries that still need initializing, in order.
    pub fn pending(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.initialized)
            .map(|(i, _)| i)
            .collect()
    }

    /// Record the outcomes of an initialization pass.
    pub fn apply(&mut self, outcomes: Vec<ModuleOutcome>) {
        for outcome in outcomes {
            let Some(entry) = self.entries.get_mut(outcome.index) else {
                continue;
            };
            match outcome.result {
                Ok(()) => entry.initialized = true,
                Err(error) => entry.last_error = Some(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostError;
    use serde_json::json;

    struct Wiring;

    #[async_trait]
    impl Module for Wiring {
        async fn init(&self, _c: &Container, _h: &Host, _o: &Value) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("apphost::heartbeat::HeartbeatModule"), "HeartbeatModule");
        assert_eq!(short_type_name("a::Wrapper<b::Inner>"), "Wrapper");
        assert_eq!(short_type_name("Plain"), "Plain");
    }

    #[test]
    fn test_default_name_is_type_name() {
        assert_eq!(Wiring.name(), "Wiring");
        let named = ModuleFn::new("Custom", |_, _, _| Ok(()));
        assert_eq!(named.name(), "Custom");
    }

    #[test]
    fn test_register_preserves_order() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(ModuleFn::new("a", |_, _, _| Ok(()))), json!({"x": 1}));
        registry.register(Arc::new(ModuleFn::new("b", |_, _, _| Ok(()))), Value::Null);
        let names: Vec<&str> = registry.entries().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(registry.get("b").unwrap().options(), &json!({}));
        assert!(!registry.get("a").unwrap().is_initialized());
        assert_eq!(registry.pending(), vec![0, 1]);
    }

    #[test]
    fn test_apply_outcomes() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(Wiring), Value::Null);
        registry.register(Arc::new(Wiring), Value::Null);
        let error = Arc::new(LifecycleError::ModuleInit {
            name: "Wiring".into(),
            source: HostError::Component("boom".into()),
        });
        registry.apply(vec![
            ModuleOutcome { index: 0, result: Ok(()) },
            ModuleOutcome { index: 1, result: Err(error) },
        ]);
        assert!(registry.entries()[0].is_initialized());
        assert!(!registry.entries()[1].is_initialized());
        assert!(registry.entries()[1].last_error().is_some());
        assert_eq!(registry.pending(), vec![1]);
    }
}
