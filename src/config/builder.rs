//! Overlay collection and merge.

use std::path::Path;
use std::sync::Mutex;

use serde_json::{Map, Value};
use tracing::debug;

use super::{merge, RootConfig};
use crate::error::{HostError, Result};

/// Collects configuration overlays and merges them into a [`RootConfig`].
///
/// Overlays added later win over earlier ones. Nothing reaches the root
/// until [`ConfigBuilder::build`] is called.
///
/// # Example
/// ```
/// use apphost::config::{ConfigBuilder, ConfigView, RootConfig};
/// use serde_json::json;
///
/// let root = RootConfig::new();
/// let builder = ConfigBuilder::new(root.clone());
/// builder
///     .add_json(json!({"test": {"message": "Hello World"}}))
///     .add_json(json!({"test": {"message": "Custom message"}}))
///     .build();
/// assert_eq!(root.get_string("test.message", ""), "Custom message");
/// ```
pub struct ConfigBuilder {
    root: RootConfig,
    layers: Mutex<Vec<Value>>,
}

impl ConfigBuilder {
    pub fn new(root: RootConfig) -> Self {
        Self {
            root,
            layers: Mutex::new(Vec::new()),
        }
    }

    /// The configuration this builder writes to.
    pub fn root(&self) -> &RootConfig {
        &self.root
    }

    /// Add a JSON overlay. `null` is ignored.
    pub fn add_json(&self, value: Value) -> &Self {
        if !value.is_null() {
            self.push(value);
        }
        self
    }

    /// Add every environment variable under the `env` key.
    pub fn add_environment(&self) -> &Self {
        let vars: Map<String, Value> = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, Value::String(v.into_string().ok()?))))
            .collect();
        let mut overlay = Map::new();
        overlay.insert("env".to_string(), Value::Object(vars));
        self.push(Value::Object(overlay));
        self
    }

    /// Add variables starting with `PREFIX_` as nested keys.
    ///
    /// `APPHOST_LOG__LEVEL=debug` with prefix `APPHOST` becomes
    /// `{"log": {"level": "debug"}}`. Segments are separated by `__` and
    /// lowercased; values stay strings.
    pub fn add_prefixed_environment(&self, prefix: &str) -> &Self {
        let overlay = prefixed_environment(prefix);
        if overlay.as_object().is_some_and(|o| !o.is_empty()) {
            self.push(overlay);
        }
        self
    }

    /// Add a configuration file. The format follows the extension:
    /// `.json`, `.toml`, `.yaml` / `.yml`.
    pub fn add_file(&self, path: &Path) -> Result<&Self> {
        let value = load_file(path)?;
        debug!(path = %path.display(), "Loaded configuration file");
        Ok(self.add_json(value))
    }

    /// Number of overlays collected so far.
    pub fn layer_count(&self) -> usize {
        self.layers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Merge all overlays (later ones win) into the root configuration.
    pub fn build(&self) {
        let merged = {
            let layers = self.layers.lock().unwrap_or_else(|e| e.into_inner());
            merge::merge_all(layers.iter())
        };
        self.root.set_data(merged);
    }

    fn push(&self, value: Value) {
        self.layers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(value);
    }
}

/// Parse a configuration file into a JSON tree.
pub fn load_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "json" => Ok(serde_json::from_str(&content)?),
        "toml" => Ok(toml::from_str(&content)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(&content)?),
        other => Err(HostError::Config(format!(
            "unsupported configuration file extension '{}' ({})",
            other,
            path.display()
        ))),
    }
}

/// Overlay built from the process environment variables starting with
/// `PREFIX_`. See [`ConfigBuilder::add_prefixed_environment`].
pub fn prefixed_environment(prefix: &str) -> Value {
    let vars = std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
    prefixed_overlay(prefix, vars)
}

fn prefixed_overlay<I>(prefix: &str, vars: I) -> Value
where
    I: IntoIterator<Item = (String, String)>,
{
    let marker = format!("{}_", prefix.trim_end_matches('_'));
    let mut overlay = Value::Object(Map::new());
    for (key, value) in vars {
        let Some(rest) = key.strip_prefix(&marker) else {
            continue;
        };
        let path = rest
            .split("__")
            .filter(|s| !s.is_empty())
            .map(|s| s.to_lowercase())
            .collect::<Vec<_>>()
            .join(".");
        if path.is_empty() {
            continue;
        }
        merge::insert_path(&mut overlay, &path, Value::String(value));
    }
    overlay
}
