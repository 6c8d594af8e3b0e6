//! TCP front end for the hub.

use crate::config::HubConfig;
use crate::error::{HubError, HubResult};
use crate::hub::Hub;
use crate::replica::{ChannelSink, ReplicaId};
use graphsync_codec::{Decode, FrameDecoder};
use graphsync_protocol::ClientMessage;
use parking_lot::Mutex;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Shared handle to the hub, as seen by connection tasks.
pub type SharedHub = Arc<Mutex<Hub>>;

/// Accepts replica connections and wires them to a [`Hub`].
///
/// Each connection gets a reader task that feeds inbound change-sets to the
/// hub and a writer task that drains the replica's outbound channel, so a
/// slow replica never holds up the hub or its peers.
pub struct HubServer {
    listener: TcpListener,
    hub: SharedHub,
    max_frame_len: usize,
}

impl HubServer {
    /// Binds the listener and creates a fresh hub.
    pub async fn bind(config: HubConfig) -> HubResult<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let max_frame_len = config.max_frame_len;
        let hub = Arc::new(Mutex::new(Hub::new(config)));
        Ok(Self {
            listener,
            hub,
            max_frame_len,
        })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> HubResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Returns the shared hub.
    pub fn hub(&self) -> SharedHub {
        Arc::clone(&self.hub)
    }

    /// Serves connections until `shutdown` resolves, then disconnects every
    /// replica.
    pub async fn run_until<F>(self, shutdown: F) -> HubResult<()>
    where
        F: Future<Output = ()>,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        info!(addr = ?self.listener.local_addr().ok(), "hub listening");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let hub = Arc::clone(&self.hub);
                        let stop = stop_rx.clone();
                        let max_frame_len = self.max_frame_len;
                        tokio::spawn(async move {
                            if let Err(e) = serve_connection(hub, stream, max_frame_len, stop).await {
                                warn!(%peer, error = %e, "connection closed with error");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                },
            }
        }

        info!("hub shutting down");
        let _ = stop_tx.send(true);
        self.hub.lock().disconnect_all();
        Ok(())
    }

    /// Runs the server on the current runtime until the returned handle is
    /// shut down.
    pub fn spawn(self) -> HubResult<HubServerHandle> {
        let local_addr = self.local_addr()?;
        let hub = self.hub();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let join = tokio::spawn(self.run_until(async {
            let _ = shutdown_rx.await;
        }));

        Ok(HubServerHandle {
            local_addr,
            hub,
            shutdown: shutdown_tx,
            join,
        })
    }
}

/// Handle to a spawned [`HubServer`].
pub struct HubServerHandle {
    local_addr: SocketAddr,
    hub: SharedHub,
    shutdown: oneshot::Sender<()>,
    join: JoinHandle<HubResult<()>>,
}

impl HubServerHandle {
    /// Returns the bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the shared hub.
    pub fn hub(&self) -> SharedHub {
        Arc::clone(&self.hub)
    }

    /// Stops accepting, disconnects every replica and waits for the accept
    /// loop to finish.
    pub async fn shutdown(self) -> HubResult<()> {
        let _ = self.shutdown.send(());
        self.join
            .await
            .map_err(|e| HubError::Internal(e.to_string()))?
    }
}

async fn serve_connection(
    hub: SharedHub,
    stream: TcpStream,
    max_frame_len: usize,
    stop: watch::Receiver<bool>,
) -> HubResult<()> {
    stream.set_nodelay(true)?;
    let (mut reader, mut writer) = stream.into_split();
    let (sink, mut outbound) = ChannelSink::new();

    let replica = {
        let mut hub = hub.lock();
        hub.connect(Box::new(sink))?
    };

    let writer_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            writer.write_all(&frame).await?;
        }
        writer.shutdown().await
    });

    let result = read_loop(&hub, replica, &mut reader, max_frame_len, stop).await;

    // Dropping the sink closes `outbound`; the writer flushes what is queued.
    hub.lock().disconnect(replica);
    match writer_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(%replica, error = %e, "writer stopped"),
        Err(e) => warn!(%replica, error = %e, "writer task failed"),
    }

    result
}

async fn read_loop(
    hub: &SharedHub,
    replica: ReplicaId,
    reader: &mut OwnedReadHalf,
    max_frame_len: usize,
    mut stop: watch::Receiver<bool>,
) -> HubResult<()> {
    let mut decoder = FrameDecoder::new(max_frame_len);

    loop {
        while let Some(payload) = decoder.next_frame()? {
            let message = ClientMessage::decode(&payload)?;
            match message {
                ClientMessage::SendChanges(change_set) => {
                    let report = {
                        let mut hub = hub.lock();
                        hub.handle_changes(replica, &change_set)
                    }?;
                    debug!(
                        %replica,
                        delivered = report.delivered,
                        failed = report.failed.len(),
                        "change-set broadcast"
                    );
                }
            }
        }

        if *stop.borrow() {
            return Ok(());
        }

        tokio::select! {
            read = reader.read_buf(decoder.buffer_mut()) => {
                if read? == 0 {
                    if decoder.buffered_len() > 0 {
                        warn!(%replica, bytes = decoder.buffered_len(), "connection closed mid-frame");
                    }
                    return Ok(());
                }
            }
            _ = stop.changed() => return Ok(()),
        }
    }
}
