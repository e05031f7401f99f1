//! Shared CLI helpers: configuration file discovery and overrides.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::{json, Value};

use apphost::config::{builder, merge};

use super::ConfigArgs;

/// `~/.apphost/config.json`
pub(crate) fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".apphost").join("config.json"))
}

/// Parse `KEY=VALUE`. The value is read as JSON when it parses, otherwise
/// kept as a string, so `--set a=1` sets a number and `--set a=x` a string.
pub(crate) fn parse_set(pair: &str) -> Result<(String, Value)> {
    let (key, raw) = pair
        .split_once('=')
        .with_context(|| format!("expected KEY=VALUE, got '{}'", pair))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("empty key in '{}'", pair);
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

/// Options passed to the host: the configuration file, then prefixed
/// environment variables, then `--set` overrides, later ones winning.
pub(crate) fn load_options(args: &ConfigArgs) -> Result<Value> {
    let mut options = match &args.config {
        Some(path) => builder::load_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => builder::load_file(&path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => json!({}),
        },
    };

    if let Some(prefix) = &args.env_prefix {
        options = merge::overlay(&options, &builder::prefixed_environment(prefix));
    }

    for pair in &args.set {
        let (key, value) = parse_set(pair)?;
        merge::insert_path(&mut options, &key, value);
    }
    Ok(options)
}
