//! Config command handler.

use anyhow::{Context, Result};

use apphost::config::{ConfigBuilder, ConfigView, RootConfig};

use super::common::load_options;
use super::ConfigArgs;

/// Print the merged configuration, or the value at `path`.
pub(crate) fn cmd_config(args: ConfigArgs, path: Option<String>) -> Result<()> {
    let options = load_options(&args)?;
    let root = RootConfig::new();
    ConfigBuilder::new(root.clone()).add_json(options).build();

    let value = match path.as_deref() {
        Some(path) => root
            .lookup(path)
            .with_context(|| format!("No configuration value at '{}'", path))?,
        None => root.value(),
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
