//! Dump command implementation.

use super::{connect, render_value};
use graphsync_client::{ClientConfig, Transport};
use graphsync_protocol::Snapshot;
use serde::Serialize;
use std::time::Duration;

/// Hub state as printed by `dump --format json`.
#[derive(Debug, Serialize)]
pub struct DumpResult {
    /// Hub address.
    pub server: String,
    /// Number of entities.
    pub entity_count: usize,
    /// Full state.
    pub state: Snapshot,
}

/// Runs the dump command.
pub async fn run(
    config: ClientConfig,
    wait: Duration,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let server = config.server_addr.to_string();
    let mut pipeline = connect(config, wait).await?;
    let state = pipeline.snapshot();
    pipeline.transport_mut().close()?;

    let result = DumpResult {
        server,
        entity_count: state.len(),
        state,
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result)?;
        }
    }

    Ok(())
}

fn print_text_output(result: &DumpResult) -> Result<(), serde_json::Error> {
    println!("Hub: {}", result.server);
    println!("Entities: {}", result.entity_count);

    for (key, properties) in &result.state {
        println!();
        println!("{key}");
        for (property, value) in properties {
            println!("  {property} = {}", render_value(value)?);
        }
    }

    Ok(())
}
