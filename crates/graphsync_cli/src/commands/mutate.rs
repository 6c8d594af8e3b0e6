//! Add, set and remove command implementation.

use super::connect;
use graphsync_client::{ClientConfig, PipelineEvent, SyncError, Transport};
use graphsync_protocol::{ChangeSet, EntityKey};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::time::timeout;
use tracing::info;

/// Submits `change_set` and waits until the hub has echoed it back.
///
/// Adds and changes are confirmed through the pipeline's ledger. Removes
/// are never recorded there, so they count as confirmed once a broadcast
/// carrying them has been applied.
pub async fn run(
    config: ClientConfig,
    change_set: ChangeSet,
    wait: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut pipeline = connect(config, wait).await?;

    let mut removes: BTreeSet<EntityKey> = change_set.removes.iter().cloned().collect();
    let summary = change_set.to_string();
    pipeline.submit(change_set)?;

    let confirmation = timeout(wait, async {
        while !(pipeline.ledger().is_empty() && removes.is_empty()) {
            match pipeline.process_next().await? {
                Some(PipelineEvent::Applied(applied)) => {
                    for key in &applied.removes {
                        removes.remove(key);
                    }
                }
                Some(_) => {}
                None => return Err(SyncError::ConnectionClosed),
            }
        }
        Ok(())
    })
    .await;

    match confirmation {
        Ok(result) => result?,
        Err(_) => {
            return Err(format!(
                "hub did not confirm the change-set within {wait:?} ({} pending)",
                pipeline.ledger().len()
            )
            .into())
        }
    }

    info!(%summary, "confirmed by hub");
    pipeline.transport_mut().close()?;
    Ok(())
}
