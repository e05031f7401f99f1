//! Path-prefixed configuration views.

use serde_json::Value;

use super::{merge, ConfigView, RootConfig};

/// A view of the configuration rooted at `path`.
///
/// Lookups are forwarded to the root with the prefix prepended, so a
/// scoped view always reflects the current tree. Scopes nest:
/// `root.scope("log").scope("loggers")` reads under `log.loggers`.
#[derive(Clone, Debug)]
pub struct ScopedConfig {
    root: RootConfig,
    path: String,
}

impl ScopedConfig {
    pub fn new(root: RootConfig, path: &str) -> Self {
        Self {
            root,
            path: merge::normalize_path(path).to_string(),
        }
    }

    /// Absolute path of this scope.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn root(&self) -> &RootConfig {
        &self.root
    }
}

impl ConfigView for ScopedConfig {
    fn lookup(&self, path: &str) -> Option<Value> {
        self.root.lookup(&merge::join_path(&self.path, path))
    }

    fn scope(&self, path: &str) -> ScopedConfig {
        ScopedConfig::new(self.root.clone(), &merge::join_path(&self.path, path))
    }
}
