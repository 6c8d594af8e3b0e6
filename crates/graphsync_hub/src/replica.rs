//! Connected replica handles.

use crate::error::{HubError, HubResult};
use bytes::Bytes;
use std::fmt;
use tokio::sync::mpsc;

/// Identifier the hub assigns to a connected replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReplicaId(u64);

impl ReplicaId {
    /// Creates an id from its raw number.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw number.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "replica-{}", self.0)
    }
}

/// Outbound side of a replica connection.
///
/// `deliver` must not block: the hub calls it for every replica while it
/// holds the single-writer lock.
pub trait ReplicaSink: Send {
    /// Queues one encoded frame for the replica.
    fn deliver(&self, replica: ReplicaId, frame: Bytes) -> HubResult<()>;
}

/// A sink backed by an unbounded channel drained by a writer task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl ChannelSink {
    /// Creates a sink and the receiver its writer task drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ReplicaSink for ChannelSink {
    fn deliver(&self, replica: ReplicaId, frame: Bytes) -> HubResult<()> {
        self.tx
            .send(frame)
            .map_err(|_| HubError::ReplicaClosed(replica))
    }
}
