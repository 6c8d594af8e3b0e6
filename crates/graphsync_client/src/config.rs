//! Configuration for replicas.

use graphsync_codec::{DEFAULT_MAX_FRAME_LEN, DEFAULT_MAX_STATE_FRAME_LEN};
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for connecting a replica to a hub.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Hub address.
    pub server_addr: SocketAddr,
    /// How long to wait for the TCP connection.
    pub connect_timeout: Duration,
    /// Maximum payload of a `sendChanges` frame.
    pub max_frame_len: usize,
    /// Maximum payload of a frame read from the hub. Must cover the hub's
    /// outbound limit, since `initialState` carries the whole register.
    pub max_inbound_frame_len: usize,
}

impl ClientConfig {
    /// Creates a new client configuration.
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            connect_timeout: Duration::from_secs(10),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            max_inbound_frame_len: DEFAULT_MAX_STATE_FRAME_LEN,
        }
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the maximum outbound frame payload length.
    pub fn with_max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len;
        self
    }

    /// Sets the maximum inbound frame payload length.
    pub fn with_max_inbound_frame_len(mut self, len: usize) -> Self {
        self.max_inbound_frame_len = len;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 7254)))
    }
}
