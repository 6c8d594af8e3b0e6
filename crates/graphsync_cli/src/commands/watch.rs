//! Watch command implementation.

use super::{connect, render_change_set};
use graphsync_client::ClientConfig;
use graphsync_protocol::ChangeSet;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// One line of `watch --format json` output.
#[derive(Debug, Serialize)]
pub struct WatchEvent<'a> {
    /// Entities after the change-set was applied.
    pub entity_count: usize,
    /// The change-set as applied locally.
    pub changes: &'a ChangeSet,
}

/// Runs the watch command.
pub async fn run(
    config: ClientConfig,
    wait: Duration,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut pipeline = connect(config, wait).await?;
    let json = format == "json";

    // The first call carries the whole current state.
    pipeline.register_observer(move |state, change_set| {
        if change_set.is_empty() {
            return;
        }
        let rendered = if json {
            serde_json::to_string(&WatchEvent {
                entity_count: state.len(),
                changes: change_set,
            })
        } else {
            render_change_set(change_set).map(|lines| format!("{lines}\n"))
        };
        match rendered {
            Ok(output) => println!("{output}"),
            Err(e) => warn!(error = %e, "cannot render change-set"),
        }
    });

    tokio::select! {
        result = pipeline.run_until_closed() => result?,
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    Ok(())
}
