//! Run command handler.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::{info, warn};

use apphost::config::LoggingSettings;
use apphost::heartbeat::HeartbeatModule;
use apphost::utils::logging::init_logging;
use apphost::Host;

use super::common::load_options;
use super::ConfigArgs;

/// Start a host with the built-in modules, wait for Ctrl-C, then stop it.
///
/// Fails when any module or runnable recorded an error along the way.
pub(crate) async fn cmd_run(args: ConfigArgs) -> Result<()> {
    let _ = dotenvy::dotenv();
    let options = load_options(&args)?;

    let settings: LoggingSettings = options
        .pointer("/log/subscriber")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .context("Invalid log.subscriber settings")?
        .unwrap_or_default();
    init_logging(&settings)?;

    let heartbeat = options.get("heartbeat").cloned().unwrap_or_else(|| json!({}));
    let mut host = Host::new();
    host.init(options).add_module(HeartbeatModule, heartbeat);
    host.start(Value::Null).await?;
    info!(
        runnables = host.runnables().len(),
        started = host.runnables().started_count(),
        "Host started; press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");
    host.stop().await?;

    let mut failed: Vec<String> = host
        .modules()
        .entries()
        .iter()
        .filter(|m| !m.is_initialized())
        .map(|m| m.name().to_string())
        .collect();
    for entry in host.runnables().failures() {
        if let Some(error) = entry.last_error() {
            warn!(runnable = entry.name(), "{}", error);
        }
        failed.push(entry.name().to_string());
    }
    if !failed.is_empty() {
        anyhow::bail!("{} component(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}
