//! Tree helpers for the configuration store.
//!
//! The configuration is a single `serde_json::Value`. Overlays are combined
//! with [`defaults_deep`] (fill what is missing) and [`overlay`] (top wins);
//! lookups use dot separated paths where numeric segments index arrays.

use serde_json::{Map, Value};

/// Fill every key missing from `target` with the matching value of `source`.
///
/// Objects are merged key by key, recursively. Any other value already
/// present in `target` is kept, including an explicit `null`. A `null`
/// target as a whole is replaced by `source`.
pub fn defaults_deep(target: &mut Value, source: &Value) {
    if target.is_null() {
        *target = source.clone();
        return;
    }
    fill_missing(target, source);
}

fn fill_missing(target: &mut Value, source: &Value) {
    if let (Value::Object(target), Value::Object(source)) = (target, source) {
        for (key, source_value) in source {
            match target.get_mut(key) {
                Some(target_value) => fill_missing(target_value, source_value),
                None => {
                    target.insert(key.clone(), source_value.clone());
                }
            }
        }
    }
}

/// Merge `top` over `base`: values in `top` win, `base` fills the gaps.
pub fn overlay(base: &Value, top: &Value) -> Value {
    let mut merged = top.clone();
    defaults_deep(&mut merged, base);
    merged
}

/// Merge a list of overlays so that later entries win.
pub fn merge_all<'a, I>(overlays: I) -> Value
where
    I: IntoIterator<Item = &'a Value>,
    I::IntoIter: DoubleEndedIterator,
{
    let mut merged = Value::Null;
    for layer in overlays.into_iter().rev() {
        defaults_deep(&mut merged, layer);
    }
    if merged.is_null() {
        Value::Object(Map::new())
    } else {
        merged
    }
}

/// Normalise a dotted path: surrounding dots are dropped.
pub fn normalize_path(path: &str) -> &str {
    path.trim_matches('.')
}

/// Join a scope prefix and a relative path.
pub fn join_path(prefix: &str, path: &str) -> String {
    let joined = format!("{}.{}", prefix, path);
    normalize_path(&joined).to_string()
}

/// Resolve a dotted path. An empty path returns the root.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let path = normalize_path(path);
    if path.is_empty() {
        return Some(root);
    }
    path.split('.').try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Set `value` at a dotted path, creating intermediate objects.
///
/// Any non-object node found along the way is replaced by an object.
pub fn insert_path(root: &mut Value, path: &str, value: Value) {
    let path = normalize_path(path);
    if path.is_empty() {
        *root = value;
        return;
    }
    let mut node = root;
    for segment in path.split('.') {
        if !node.is_object() {
            *node = Value::Null;
        }
        // Indexing a null value turns it into an object holding the key.
        node = &mut node[segment];
    }
    *node = value;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_deep_fills_missing_keys() {
        let mut target = json!({"log": {"level": "debug"}});
        defaults_deep(
            &mut target,
            &json!({"log": {"level": "info", "loggers": {"console": {"enabled": true}}}}),
        );
        assert_eq!(
            target,
            json!({"log": {"level": "debug", "loggers": {"console": {"enabled": true}}}})
        );
    }

    #[test]
    fn test_defaults_deep_keeps_explicit_null() {
        let mut target = json!({"log": {"level": null}});
        defaults_deep(&mut target, &json!({"log": {"level": "info"}}));
        assert_eq!(target, json!({"log": {"level": null}}));
    }

    #[test]
    fn test_defaults_deep_replaces_null_root() {
        let mut target = Value::Null;
        defaults_deep(&mut target, &json!({"a": 1}));
        assert_eq!(target, json!({"a": 1}));
    }

    #[test]
    fn test_overlay_top_wins_at_leaf_level() {
        let base = json!({"db": {"host": "localhost", "port": 5432}});
        let top = json!({"db": {"port": 6543}});
        assert_eq!(
            overlay(&base, &top),
            json!({"db": {"host": "localhost", "port": 6543}})
        );
    }

    #[test]
    fn test_merge_all_later_layers_win() {
        let first = json!({"test": {"message": "Hello World", "keep": true}});
        let second = json!({"test": {"message": "Custom message"}});
        let merged = merge_all([&first, &second]);
        assert_eq!(
            merged,
            json!({"test": {"message": "Custom message", "keep": true}})
        );
    }

    #[test]
    fn test_merge_all_empty_is_object() {
        let merged = merge_all(std::iter::empty::<&Value>());
        assert_eq!(merged, json!({}));
    }

    #[test]
    fn test_lookup_paths() {
        let root = json!({"a": {"b": [10, {"c": "deep"}]}});
        assert_eq!(lookup(&root, "a.b.0"), Some(&json!(10)));
        assert_eq!(lookup(&root, "a.b.1.c"), Some(&json!("deep")));
        assert_eq!(lookup(&root, ".a.b.1.c."), Some(&json!("deep")));
        assert_eq!(lookup(&root, "a.x"), None);
        assert_eq!(lookup(&root, "a.b.9"), None);
        assert_eq!(lookup(&root, ""), Some(&root));
    }

    #[test]
    fn test_join_path_trims_dots() {
        assert_eq!(join_path("test", "message"), "test.message");
        assert_eq!(join_path("test", ""), "test");
        assert_eq!(join_path("", "message"), "message");
    }

    #[test]
    fn test_insert_path_creates_objects() {
        let mut root = json!({"log": "flat"});
        insert_path(&mut root, "log.level", json!("debug"));
        insert_path(&mut root, "server.port", json!("8080"));
        assert_eq!(
            root,
            json!({"log": {"level": "debug"}, "server": {"port": "8080"}})
        );
    }
}
