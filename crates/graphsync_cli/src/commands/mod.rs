//! CLI command implementations.

pub mod dump;
pub mod mutate;
pub mod serve;
pub mod watch;

use graphsync_client::{ClientConfig, SyncPipeline, TcpTransport};
use graphsync_codec::Value;
use graphsync_protocol::ChangeSet;
use std::time::Duration;
use tokio::time::timeout;

/// Connects to the hub and waits for the initial state.
pub async fn connect(
    config: ClientConfig,
    wait: Duration,
) -> Result<SyncPipeline<TcpTransport>, Box<dyn std::error::Error>> {
    let server = config.server_addr;
    let mut pipeline = SyncPipeline::new(TcpTransport::new(config));
    timeout(wait, pipeline.start())
        .await
        .map_err(|_| format!("no initial state from {server} within {wait:?}"))??;
    Ok(pipeline)
}

/// Parses a property value given as JSON.
pub fn parse_value(raw: &str) -> Result<Value, Box<dyn std::error::Error>> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON value {raw:?}: {e}").into())
}

/// Renders a value as compact JSON.
pub fn render_value(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// Renders a change-set one operation per line.
pub fn render_change_set(change_set: &ChangeSet) -> Result<String, serde_json::Error> {
    let mut lines = Vec::with_capacity(change_set.len());
    for key in &change_set.adds {
        lines.push(format!("+ {key}"));
    }
    for change in &change_set.changes {
        lines.push(format!(
            "~ {}.{} = {}",
            change.key,
            change.property,
            render_value(&change.value)?
        ));
    }
    for key in &change_set.removes {
        lines.push(format!("- {key}"));
    }
    Ok(lines.join("\n"))
}
