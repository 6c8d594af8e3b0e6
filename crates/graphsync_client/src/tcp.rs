//! TCP transport.

use crate::config::ClientConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::Transport;
use bytes::Bytes;
use graphsync_codec::{Decode, FrameDecoder};
use graphsync_protocol::{ChangeSet, ClientMessage, ServerMessage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Connects a replica to a hub over TCP.
///
/// Outbound frames go through an unbounded channel to a writer task, so
/// `send` never waits on the socket. Inbound frames are decoded on demand
/// by `recv`, which is cancel safe.
pub struct TcpTransport {
    config: ClientConfig,
    reader: Option<OwnedReadHalf>,
    outbound: Option<mpsc::UnboundedSender<Bytes>>,
    decoder: FrameDecoder,
}

impl TcpTransport {
    /// Creates an unconnected transport.
    pub fn new(config: ClientConfig) -> Self {
        let decoder = FrameDecoder::new(config.max_inbound_frame_len);
        Self {
            config,
            reader: None,
            outbound: None,
            decoder,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Transport for TcpTransport {
    async fn connect(&mut self) -> SyncResult<()> {
        if self.is_connected() {
            return Ok(());
        }

        let addr = self.config.server_addr;
        let stream = timeout(self.config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| SyncError::Timeout)?
            .map_err(|e| SyncError::transport_retryable(format!("connect to {addr}: {e}")))?;
        stream.set_nodelay(true)?;

        let (reader, mut writer) = stream.into_split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Bytes>();

        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Err(e) = writer.write_all(&frame).await {
                    warn!(error = %e, "write to hub failed");
                    return;
                }
            }
            let _ = writer.shutdown().await;
        });

        self.reader = Some(reader);
        self.outbound = Some(tx);
        self.decoder = FrameDecoder::new(self.config.max_inbound_frame_len);
        info!(%addr, "connected to hub");
        Ok(())
    }

    fn send(&mut self, change_set: &ChangeSet) -> SyncResult<()> {
        let outbound = self.outbound.as_ref().ok_or(SyncError::NotConnected)?;
        let frame =
            ClientMessage::SendChanges(change_set.clone()).to_frame(self.config.max_frame_len)?;
        outbound
            .send(frame)
            .map_err(|_| SyncError::ConnectionClosed)?;
        debug!(%change_set, "change-set queued");
        Ok(())
    }

    async fn recv(&mut self) -> SyncResult<Option<ServerMessage>> {
        let reader = self.reader.as_mut().ok_or(SyncError::NotConnected)?;

        loop {
            if let Some(payload) = self.decoder.next_frame()? {
                let message = ServerMessage::decode(&payload)?;
                debug!(message = message.name(), "message received");
                return Ok(Some(message));
            }

            if reader.read_buf(self.decoder.buffer_mut()).await? == 0 {
                if self.decoder.buffered_len() > 0 {
                    warn!(bytes = self.decoder.buffered_len(), "hub closed mid-frame");
                }
                self.reader = None;
                self.outbound = None;
                return Ok(None);
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.reader.is_some()
            && self
                .outbound
                .as_ref()
                .is_some_and(|outbound| !outbound.is_closed())
    }

    fn close(&mut self) -> SyncResult<()> {
        self.reader = None;
        self.outbound = None;
        Ok(())
    }
}
