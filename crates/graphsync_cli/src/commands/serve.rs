//! Serve command implementation.

use graphsync_hub::{HubConfig, HubServer};
use tracing::{info, warn};

/// Runs the serve command.
pub async fn run(config: HubConfig) -> Result<(), Box<dyn std::error::Error>> {
    let server = HubServer::bind(config).await?;
    info!(addr = %server.local_addr()?, "press Ctrl-C to stop");

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "cannot listen for Ctrl-C");
            }
        })
        .await?;

    Ok(())
}
