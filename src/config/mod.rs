//! Configuration store for apphost
//!
//! The merged configuration is a single JSON tree owned by [`RootConfig`].
//! Overlays are collected by [`ConfigBuilder`] (JSON values, files, the
//! environment) and merged into the root on `build()`. Components read it
//! through the [`ConfigView`] trait, either from the root or from a
//! [`ScopedConfig`] whose lookups are prefixed with a path.
//!
//! Every change to the tree is published on a `tokio::sync::watch` channel
//! so long-lived readers (for example the console log sink) follow live
//! overlay updates.

pub mod builder;
pub mod merge;
pub mod scoped;
mod types;

pub use builder::ConfigBuilder;
pub use scoped::ScopedConfig;
pub use types::*;

use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::error::Result;
use crate::log::{Logger, NoopLogger};

// ============================================================================
// Value coercion
// ============================================================================

/// Interpret a value as a boolean.
///
/// `true/yes/1` and `false/no/0` (case-insensitive) are recognised; any
/// other non-empty scalar is `true`. `null` has no boolean value.
pub fn coerce_bool(value: &Value) -> Option<bool> {
    let text = match value {
        Value::Null => return None,
        Value::Bool(b) => return Some(*b),
        Value::String(s) => s.trim().to_lowercase(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => return Some(true),
    };
    match text.as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        other => Some(!other.is_empty()),
    }
}

/// Interpret a value as a number; strings are parsed.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| !n.is_nan()),
        _ => None,
    }
}

/// Interpret a value as a string; scalars are rendered, strings kept verbatim.
pub fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

// ============================================================================
// ConfigView
// ============================================================================

/// Read access to (a part of) the configuration tree.
pub trait ConfigView {
    /// Value at `path` relative to this view. `None` when missing or `null`.
    fn lookup(&self, path: &str) -> Option<Value>;

    /// A view whose lookups are prefixed with `path`.
    fn scope(&self, path: &str) -> ScopedConfig;

    /// Value at `path`, or `default` when missing or `null`.
    fn get(&self, path: &str, default: Value) -> Value {
        self.lookup(path).unwrap_or(default)
    }

    /// The whole tree under this view.
    fn value(&self) -> Value {
        self.lookup("").unwrap_or(Value::Null)
    }

    fn get_number(&self, path: &str, default: f64) -> f64 {
        self.lookup(path)
            .and_then(|v| coerce_number(&v))
            .unwrap_or(default)
    }

    fn get_string(&self, path: &str, default: &str) -> String {
        self.lookup(path)
            .and_then(|v| coerce_string(&v))
            .unwrap_or_else(|| default.to_string())
    }

    fn get_bool(&self, path: &str, default: bool) -> bool {
        self.lookup(path)
            .and_then(|v| coerce_bool(&v))
            .unwrap_or(default)
    }

    /// Deserialize the subtree at `path`. `Ok(None)` when it is missing.
    fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>>
    where
        Self: Sized,
    {
        match self.lookup(path) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}

// ============================================================================
// RootConfig
// ============================================================================

struct RootInner {
    data: watch::Sender<Arc<Value>>,
    log: RwLock<Arc<dyn Logger>>,
}

/// Owner of the merged configuration tree.
///
/// Cloning is cheap; clones share the same tree, logger and watch channel.
///
/// # Example
/// ```
/// use apphost::config::{ConfigView, RootConfig};
/// use serde_json::json;
///
/// let config = RootConfig::with_data(json!({"test": {"message": "Hello World"}}));
/// assert_eq!(config.get_string("test.message", ""), "Hello World");
/// assert_eq!(config.scope("test").get_string("message", ""), "Hello World");
/// assert_eq!(config.get_string("hello.data", "Default Value"), "Default Value");
/// ```
#[derive(Clone)]
pub struct RootConfig {
    inner: Arc<RootInner>,
}

impl RootConfig {
    /// Empty configuration (`{}`).
    pub fn new() -> Self {
        Self::with_data(Value::Object(Map::new()))
    }

    /// Configuration holding `data` as its initial tree.
    pub fn with_data(data: Value) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(data));
        Self {
            inner: Arc::new(RootInner {
                data: tx,
                log: RwLock::new(Arc::new(NoopLogger)),
            }),
        }
    }

    /// Snapshot of the current tree.
    pub fn data(&self) -> Arc<Value> {
        self.inner.data.borrow().clone()
    }

    /// Merge `data` over the current tree (new values win, existing values
    /// fill the gaps) and notify subscribers.
    pub fn set_data(&self, data: Value) {
        let mut merged = data;
        merge::defaults_deep(&mut merged, &self.data());
        self.inner.data.send_replace(Arc::new(merged));
        self.logger().info("Configuration changed");
    }

    /// Receiver that observes every change of the tree.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Value>> {
        self.inner.data.subscribe()
    }

    /// Replace the logger used for lookup diagnostics.
    pub fn set_logger(&self, log: Arc<dyn Logger>) {
        let mut slot = self.inner.log.write().unwrap_or_else(|e| e.into_inner());
        *slot = log;
    }

    fn logger(&self) -> Arc<dyn Logger> {
        self.inner
            .log
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for RootConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigView for RootConfig {
    fn lookup(&self, path: &str) -> Option<Value> {
        let log = self.logger();
        log.verbose(&format!("Getting configuration from path '{}'", path));
        let data = self.data();
        match merge::lookup(&data, path) {
            Some(Value::Null) | None => {
                log.warn(&format!("Configuration key '{}' not found", path));
                None
            }
            Some(value) => Some(value.clone()),
        }
    }

    fn scope(&self, path: &str) -> ScopedConfig {
        ScopedConfig::new(self.clone(), path)
    }
}

impl std::fmt::Debug for RootConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootConfig")
            .field("data", &self.data())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> RootConfig {
        RootConfig::with_data(json!({
            "test": {"message": "Hello World"},
            "numbers": {"int": 42, "text": "3.5", "bad": "abc"},
            "flags": {"yes": "YES", "zero": 0, "one": 1, "word": "maybe", "empty": "", "no": "no"},
            "nothing": null
        }))
    }

    #[test]
    fn test_get_present_value() {
        let config = sample();
        assert_eq!(
            config.get("test.message", Value::Null),
            json!("Hello World")
        );
    }

    #[test]
    fn test_get_missing_returns_default() {
        let config = sample();
        assert_eq!(
            config.get("hello.data", json!("Default Value")),
            json!("Default Value")
        );
        assert_eq!(config.get("nothing", json!(7)), json!(7));
    }

    #[test]
    fn test_root_value_is_whole_tree() {
        let config = sample();
        let root = config.value();
        assert_eq!(root["test"]["message"], json!("Hello World"));
        assert_eq!(*config.data(), root);
    }

    #[test]
    fn test_get_number() {
        let config = sample();
        assert_eq!(config.get_number("numbers.int", 0.0), 42.0);
        assert_eq!(config.get_number("numbers.text", 0.0), 3.5);
        assert_eq!(config.get_number("numbers.bad", 1.5), 1.5);
        assert_eq!(config.get_number("numbers.missing", 2.0), 2.0);
    }

    #[test]
    fn test_get_string() {
        let config = sample();
        assert_eq!(config.get_string("numbers.int", ""), "42");
        assert_eq!(config.get_string("numbers.missing", "dflt"), "dflt");
    }

    #[test]
    fn test_get_bool() {
        let config = sample();
        assert!(config.get_bool("flags.yes", false));
        assert!(!config.get_bool("flags.zero", true));
        assert!(config.get_bool("flags.one", false));
        assert!(config.get_bool("flags.word", false));
        assert!(!config.get_bool("flags.empty", true));
        assert!(!config.get_bool("flags.no", true));
        assert!(config.get_bool("flags.missing", true));
    }

    #[test]
    fn test_get_as_typed() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Test {
            message: String,
        }
        let config = sample();
        let test: Option<Test> = config.get_as("test").unwrap();
        assert_eq!(
            test,
            Some(Test {
                message: "Hello World".into()
            })
        );
        let missing: Option<Test> = config.get_as("absent").unwrap();
        assert!(missing.is_none());
        assert!(config.get_as::<Test>("numbers").is_err());
    }

    #[test]
    fn test_set_data_new_values_win() {
        let config = sample();
        config.set_data(json!({"test": {"message": "Custom message"}}));
        assert_eq!(config.get_string("test.message", ""), "Custom message");
        assert_eq!(config.get_number("numbers.int", 0.0), 42.0);
    }

    #[test]
    fn test_subscribe_sees_changes() {
        let config = sample();
        let mut rx = config.subscribe();
        assert!(!rx.has_changed().unwrap());
        config.set_data(json!({"added": true}));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update()["added"], json!(true));
    }

    #[test]
    fn test_clones_share_tree() {
        let config = sample();
        let clone = config.clone();
        clone.set_data(json!({"shared": 1}));
        assert_eq!(config.get_number("shared", 0.0), 1.0);
    }

    #[test]
    fn test_coerce_helpers() {
        assert_eq!(coerce_bool(&Value::Null), None);
        assert_eq!(coerce_bool(&json!(true)), Some(true));
        assert_eq!(coerce_bool(&json!({"a": 1})), Some(true));
        assert_eq!(coerce_number(&json!(" 12 ")), Some(12.0));
        assert_eq!(coerce_number(&json!(true)), None);
        assert_eq!(coerce_string(&json!(false)), Some("false".to_string()));
    }
}
