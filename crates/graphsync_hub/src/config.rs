//! Hub configuration.

use graphsync_codec::{DEFAULT_MAX_FRAME_LEN, DEFAULT_MAX_STATE_FRAME_LEN};
use std::net::SocketAddr;

/// Default port the hub listens on.
pub const DEFAULT_PORT: u16 = 7254;

/// Bytes a `receiveChanges` envelope may add over the `sendChanges` frame
/// it re-broadcasts.
const ENVELOPE_SLACK: usize = 64;

/// Configuration for the hub and its TCP server.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Maximum concurrently connected replicas.
    pub max_replicas: usize,
    /// Maximum payload of a frame read from a replica.
    pub max_frame_len: usize,
    /// Maximum payload of a frame sent to a replica. `initialState` frames
    /// grow with the register, so this is usually well above
    /// `max_frame_len`. Replicas must accept frames of this size.
    pub max_outbound_frame_len: usize,
}

impl HubConfig {
    /// Creates a new hub configuration.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            max_replicas: 1000,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            max_outbound_frame_len: DEFAULT_MAX_STATE_FRAME_LEN,
        }
    }

    /// Sets the maximum number of connected replicas.
    pub fn with_max_replicas(mut self, max: usize) -> Self {
        self.max_replicas = max;
        self
    }

    /// Sets the maximum inbound frame payload length.
    pub fn with_max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len;
        self
    }

    /// Sets the maximum outbound frame payload length.
    pub fn with_max_outbound_frame_len(mut self, len: usize) -> Self {
        self.max_outbound_frame_len = len;
        self
    }

    /// The limit actually applied to outbound frames.
    ///
    /// Never below what re-broadcasting an accepted inbound frame needs, so
    /// a change-set the hub read can always be sent back out.
    pub fn outbound_frame_len(&self) -> usize {
        self.max_outbound_frame_len
            .max(self.max_frame_len.saturating_add(ENVELOPE_SLACK))
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)))
    }
}
