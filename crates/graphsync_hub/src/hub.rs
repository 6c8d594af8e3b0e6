//! The broadcast authority.

use crate::config::HubConfig;
use crate::error::{HubError, HubResult};
use crate::replica::{ReplicaId, ReplicaSink};
use bytes::Bytes;
use graphsync_protocol::{ChangeSet, Register, ServerMessage, Snapshot};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Counters describing hub activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Change-sets applied to the register.
    pub change_sets_applied: u64,
    /// Frames handed to replica sinks.
    pub frames_delivered: u64,
    /// Deliveries that failed.
    pub failed_deliveries: u64,
    /// Replicas accepted since start.
    pub replicas_connected: u64,
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Replicas the frame was handed to.
    pub delivered: usize,
    /// Replicas whose delivery failed; they have been disconnected.
    pub failed: Vec<ReplicaId>,
}

/// Owns the authoritative register and the set of connected replicas.
///
/// The hub is the single writer of the server state. Callers serialize
/// access (the TCP server keeps it behind a mutex), so every change-set is
/// applied and fanned out completely before the next one is looked at.
pub struct Hub {
    config: HubConfig,
    register: Register,
    replicas: BTreeMap<ReplicaId, Box<dyn ReplicaSink>>,
    next_replica: u64,
    stats: HubStats,
}

impl Hub {
    /// Creates a hub with an empty register.
    pub fn new(config: HubConfig) -> Self {
        Self::with_state(config, Snapshot::new())
    }

    /// Creates a hub seeded with `snapshot`.
    pub fn with_state(config: HubConfig, snapshot: Snapshot) -> Self {
        Self {
            config,
            register: Register::from_snapshot(snapshot),
            replicas: BTreeMap::new(),
            next_replica: 1,
            stats: HubStats::default(),
        }
    }

    /// Accepts a replica and sends it, and only it, the current state.
    ///
    /// The replica is not registered if the initial state cannot be
    /// delivered. Outbound frames are bounded by
    /// [`HubConfig::outbound_frame_len`], not by the inbound limit.
    pub fn connect(&mut self, sink: Box<dyn ReplicaSink>) -> HubResult<ReplicaId> {
        if self.replicas.len() >= self.config.max_replicas {
            return Err(HubError::TooManyReplicas {
                max: self.config.max_replicas,
            });
        }

        let replica = ReplicaId::new(self.next_replica);
        self.next_replica += 1;

        let frame = ServerMessage::InitialState(self.register.snapshot())
            .to_frame(self.config.outbound_frame_len())?;
        sink.deliver(replica, frame)?;

        self.replicas.insert(replica, sink);
        self.stats.replicas_connected += 1;
        self.stats.frames_delivered += 1;
        info!(
            %replica,
            entities = self.register.len(),
            replicas = self.replicas.len(),
            "replica connected"
        );
        Ok(replica)
    }

    /// Forgets a replica. Returns false if it was not connected.
    pub fn disconnect(&mut self, replica: ReplicaId) -> bool {
        let removed = self.replicas.remove(&replica).is_some();
        if removed {
            info!(%replica, replicas = self.replicas.len(), "replica disconnected");
        }
        removed
    }

    /// Drops every replica, closing their outbound channels.
    pub fn disconnect_all(&mut self) {
        if !self.replicas.is_empty() {
            info!(replicas = self.replicas.len(), "disconnecting all replicas");
        }
        self.replicas.clear();
    }

    /// Applies a change-set from `origin` and broadcasts it to every replica,
    /// the origin included.
    ///
    /// The broadcast frame is encoded before the register is touched, so a
    /// change-set that cannot be sent is rejected without changing state.
    /// Change-sets from replicas the hub has dropped are refused.
    pub fn handle_changes(
        &mut self,
        origin: ReplicaId,
        change_set: &ChangeSet,
    ) -> HubResult<BroadcastReport> {
        if !self.replicas.contains_key(&origin) {
            return Err(HubError::UnknownReplica(origin));
        }
        debug!(%origin, %change_set, "received change-set");

        let frame = ServerMessage::ReceiveChanges(change_set.clone())
            .to_frame(self.config.outbound_frame_len())?;

        self.register.apply(change_set);
        self.stats.change_sets_applied += 1;

        Ok(self.broadcast(frame))
    }

    /// Hands the same frame to every replica. A failing replica does not
    /// affect delivery to the others; it is dropped afterwards.
    fn broadcast(&mut self, frame: Bytes) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for (replica, sink) in &self.replicas {
            match sink.deliver(*replica, frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(%replica, error = %e, "broadcast delivery failed");
                    report.failed.push(*replica);
                }
            }
        }

        for replica in &report.failed {
            self.replicas.remove(replica);
        }

        self.stats.frames_delivered += report.delivered as u64;
        self.stats.failed_deliveries += report.failed.len() as u64;
        report
    }

    /// Returns a copy of the authoritative state.
    pub fn snapshot(&self) -> Snapshot {
        self.register.snapshot()
    }

    /// Borrows the authoritative register.
    pub fn register(&self) -> &Register {
        &self.register
    }

    /// Number of connected replicas.
    pub fn replica_count(&self) -> usize {
        self.replicas.len()
    }

    /// Returns true if `replica` is connected.
    pub fn is_connected(&self, replica: ReplicaId) -> bool {
        self.replicas.contains_key(&replica)
    }

    /// Returns the activity counters.
    pub fn stats(&self) -> &HubStats {
        &self.stats
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HubConfig {
        &self.config
    }
}
