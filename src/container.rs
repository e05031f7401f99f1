//! Object graph shared between the host, its modules and their runnables.
//!
//! Values are bound once per type (`bind`) and resolved by type
//! (`get`/`resolve`). Runnables are a separate ordered multi-binding: every
//! `bind_runnable` call appends, and `runnables()` returns them in that
//! order, which is the order the lifecycle orchestrator uses.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{HostError, Result};
use crate::runnable::Runnable;

type Binding = Arc<dyn Any + Send + Sync>;

/// Type-keyed singleton bindings plus the ordered runnable list.
#[derive(Default)]
pub struct Container {
    bindings: RwLock<HashMap<TypeId, Binding>>,
    runnables: RwLock<Vec<Arc<dyn Runnable>>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` as the singleton for `T`, replacing any earlier binding.
    pub fn bind<T: Any + Send + Sync>(&self, value: T) {
        self.bind_arc(Arc::new(value));
    }

    /// Bind an already shared value as the singleton for `T`.
    pub fn bind_arc<T: Any + Send + Sync>(&self, value: Arc<T>) {
        self.bindings
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(TypeId::of::<T>(), value);
    }

    /// The singleton bound for `T`, if any.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let binding = self
            .bindings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&TypeId::of::<T>())
            .cloned()?;
        binding.downcast::<T>().ok()
    }

    /// Like [`Container::get`], but an unbound type is an error.
    pub fn resolve<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        self.get::<T>().ok_or_else(|| {
            HostError::Container(format!("no binding for type '{}'", type_name::<T>()))
        })
    }

    pub fn is_bound<T: Any + Send + Sync>(&self) -> bool {
        self.bindings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&TypeId::of::<T>())
    }

    /// Remove the binding for `T`. Returns whether one existed.
    pub fn unbind<T: Any + Send + Sync>(&self) -> bool {
        self.bindings
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&TypeId::of::<T>())
            .is_some()
    }

    /// Append a runnable to the multi-binding.
    pub fn bind_runnable(&self, runnable: Arc<dyn Runnable>) {
        self.runnables
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(runnable);
    }

    /// All bound runnables in binding order.
    pub fn runnables(&self) -> Vec<Arc<dyn Runnable>> {
        self.runnables
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn has_runnables(&self) -> bool {
        !self
            .runnables
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bindings = self.bindings.read().unwrap_or_else(|e| e.into_inner()).len();
        let runnables: Vec<String> = self
            .runnables()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        f.debug_struct("Container")
            .field("bindings", &bindings)
            .field("runnables", &runnables)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Port(u16);

    struct Named(&'static str);

    #[async_trait::async_trait]
    impl Runnable for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_bind_and_get() {
        let container = Container::new();
        assert!(container.get::<Port>().is_none());
        container.bind(Port(8080));
        assert_eq!(*container.get::<Port>().unwrap(), Port(8080));
        assert!(container.is_bound::<Port>());
    }

    #[test]
    fn test_bind_replaces() {
        let container = Container::new();
        container.bind(Port(1));
        container.bind(Port(2));
        assert_eq!(container.resolve::<Port>().unwrap().0, 2);
    }

    #[test]
    fn test_bind_arc_shares_instance() {
        let container = Container::new();
        let shared = Arc::new(Port(9));
        container.bind_arc(shared.clone());
        assert!(Arc::ptr_eq(&shared, &container.resolve::<Port>().unwrap()));
    }

    #[test]
    fn test_resolve_unbound_is_error() {
        let container = Container::new();
        let err = container.resolve::<Port>().unwrap_err();
        assert!(matches!(err, HostError::Container(_)));
        assert!(err.to_string().contains("Port"));
    }

    #[test]
    fn test_unbind() {
        let container = Container::new();
        container.bind(Port(1));
        assert!(container.unbind::<Port>());
        assert!(!container.unbind::<Port>());
        assert!(!container.is_bound::<Port>());
    }

    #[test]
    fn test_runnables_keep_binding_order() {
        let container = Container::new();
        assert!(!container.has_runnables());
        container.bind_runnable(Arc::new(Named("first")));
        container.bind_runnable(Arc::new(Named("second")));
        container.bind_runnable(Arc::new(Named("third")));
        let names: Vec<String> = container
            .runnables()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        assert!(container.has_runnables());
    }
}
