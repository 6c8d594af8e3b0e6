//! The optimistic sync pipeline.

use crate::error::{SyncError, SyncResult};
use crate::ledger::UnconfirmedLedger;
use crate::transport::Transport;
use graphsync_protocol::{ChangeSet, EntityKey, Register, ServerMessage, Snapshot};
use std::fmt;
use tracing::{debug, info, warn};

/// Where the pipeline is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Waiting for the initial state; broadcasts are buffered.
    Bootstrapping,
    /// Initial state applied; broadcasts are reconciled as they arrive.
    Live,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Bootstrapping => write!(f, "bootstrapping"),
            PipelineState::Live => write!(f, "live"),
        }
    }
}

/// What handling one server message did.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A broadcast arrived before the initial state and was queued.
    Buffered,
    /// The initial state and every queued broadcast were applied.
    WentLive {
        /// Number of queued broadcasts replayed after the snapshot.
        replayed: usize,
    },
    /// A broadcast was reconciled and applied.
    Applied(ChangeSet),
}

/// Handle returned by [`SyncPipeline::register_observer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Box<dyn FnMut(&Snapshot, &ChangeSet) + Send>;

/// Keeps a local register in step with the hub while applying local
/// mutations immediately.
///
/// Local change-sets are applied and shown to observers before the hub has
/// seen them. Each one is recorded in an [`UnconfirmedLedger`] so that its
/// echo from the hub is recognised and not applied a second time, and so
/// that an older remote value for a field with a pending local write does
/// not briefly overwrite it.
///
/// ## Lifecycle
///
/// ```text
///   Bootstrapping ──initialState──▶ Live
///         ▲                          │
///         └────────── resync() ──────┘
/// ```
///
/// All methods take `&mut self`: the owner serializes local submissions
/// and inbound messages.
pub struct SyncPipeline<T: Transport> {
    transport: T,
    register: Register,
    ledger: UnconfirmedLedger,
    state: PipelineState,
    buffered: Vec<ChangeSet>,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u64,
}

impl<T: Transport> SyncPipeline<T> {
    /// Creates a pipeline with an empty register.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            register: Register::new(),
            ledger: UnconfirmedLedger::new(),
            state: PipelineState::Bootstrapping,
            buffered: Vec::new(),
            observers: Vec::new(),
            next_observer: 1,
        }
    }

    /// Connects the transport and waits until the initial state has been
    /// applied.
    pub async fn start(&mut self) -> SyncResult<()> {
        if !self.transport.is_connected() {
            self.transport.connect().await?;
        }

        while self.state == PipelineState::Bootstrapping {
            match self.transport.recv().await? {
                Some(message) => {
                    self.handle_message(message)?;
                }
                None => return Err(SyncError::ConnectionClosed),
            }
        }
        Ok(())
    }

    /// Waits for and handles the next server message. Returns `None` once
    /// the connection is closed.
    pub async fn process_next(&mut self) -> SyncResult<Option<PipelineEvent>> {
        match self.transport.recv().await? {
            Some(message) => self.handle_message(message).map(Some),
            None => {
                info!("hub closed the connection");
                Ok(None)
            }
        }
    }

    /// Handles server messages until the connection closes.
    pub async fn run_until_closed(&mut self) -> SyncResult<()> {
        while self.process_next().await?.is_some() {}
        Ok(())
    }

    /// Dispatches one server message.
    pub fn handle_message(&mut self, message: ServerMessage) -> SyncResult<PipelineEvent> {
        match message {
            ServerMessage::InitialState(snapshot) => self.on_initial_state(snapshot),
            ServerMessage::ReceiveChanges(change_set) => Ok(self.on_broadcast(change_set)),
        }
    }

    /// Seeds the register from the hub's snapshot, replays buffered
    /// broadcasts and goes live.
    ///
    /// After [`resync`](Self::resync) the register may still hold state the
    /// hub never had. Every local entity whose properties differ from the
    /// snapshot is removed first, in its own change-set, so the seed then
    /// re-adds it with exactly the hub's properties. Observers see the
    /// removal and the seed as two notifications.
    pub fn on_initial_state(&mut self, snapshot: Snapshot) -> SyncResult<PipelineEvent> {
        if self.state == PipelineState::Live {
            return Err(SyncError::Protocol(
                "initialState received while live".into(),
            ));
        }

        let stale: Vec<EntityKey> = self
            .register
            .state()
            .iter()
            .filter(|(key, properties)| snapshot.get(*key) != Some(*properties))
            .map(|(key, _)| key.clone())
            .collect();
        if !stale.is_empty() {
            // Removes run after adds within one change-set.
            let purge = ChangeSet {
                removes: stale,
                ..ChangeSet::default()
            };
            debug!(%purge, "dropping entities that differ from the hub");
            self.reconcile_and_apply(&purge);
        }

        let seed = ChangeSet::from_snapshot(&snapshot);
        debug!(%seed, "applying initial state");
        self.reconcile_and_apply(&seed);

        let buffered = std::mem::take(&mut self.buffered);
        let replayed = buffered.len();
        for change_set in &buffered {
            self.reconcile_and_apply(change_set);
        }

        self.state = PipelineState::Live;
        info!(entities = self.register.len(), replayed, "pipeline live");
        Ok(PipelineEvent::WentLive { replayed })
    }

    /// Handles a broadcast from the hub.
    ///
    /// While bootstrapping the change-set is queued. Once live it is
    /// filtered through the ledger and the remainder is applied.
    pub fn on_broadcast(&mut self, change_set: ChangeSet) -> PipelineEvent {
        match self.state {
            PipelineState::Bootstrapping => {
                debug!(%change_set, buffered = self.buffered.len() + 1, "buffering broadcast");
                self.buffered.push(change_set);
                PipelineEvent::Buffered
            }
            PipelineState::Live => PipelineEvent::Applied(self.reconcile_and_apply(&change_set)),
        }
    }

    /// Applies a local change-set and sends it to the hub.
    ///
    /// The register, the ledger and the observers are updated before the
    /// transport is touched, so a transport error is returned unchanged
    /// while the local write stays visible. Nothing is retried.
    pub fn submit(&mut self, change_set: ChangeSet) -> SyncResult<()> {
        if self.state != PipelineState::Live {
            return Err(SyncError::NotLive);
        }
        change_set.validate()?;

        self.register.apply(&change_set);
        self.ledger.record(&change_set);
        self.notify(&change_set);

        debug!(%change_set, pending = self.ledger.len(), "submitting change-set");
        self.transport.send(&change_set)
    }

    /// Registers an observer and calls it straight away with the current
    /// state and the change-set that would rebuild it.
    pub fn register_observer<F>(&mut self, handler: F) -> ObserverId
    where
        F: FnMut(&Snapshot, &ChangeSet) + Send + 'static,
    {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;

        let mut observer: Observer = Box::new(handler);
        observer(self.register.state(), &self.register.to_change_set());
        self.observers.push((id, observer));
        id
    }

    /// Removes an observer. Returns false if it was not registered.
    pub fn unregister_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer, _)| *observer != id);
        self.observers.len() != before
    }

    /// Returns to bootstrapping so the owner can reconnect the transport.
    ///
    /// Pending ledger entries and buffered broadcasts are discarded. The
    /// register stays visible until the next initial state replaces it.
    pub fn resync(&mut self) {
        if !self.ledger.is_empty() {
            warn!(pending = self.ledger.len(), "discarding unconfirmed operations");
        }
        self.ledger.clear();
        self.buffered.clear();
        self.state = PipelineState::Bootstrapping;
        info!("pipeline resynchronizing");
    }

    fn reconcile_and_apply(&mut self, incoming: &ChangeSet) -> ChangeSet {
        let effective = self.ledger.reconcile(incoming);
        self.register.apply(&effective);
        self.notify(&effective);
        effective
    }

    fn notify(&mut self, change_set: &ChangeSet) {
        let state = self.register.state();
        for (_, observer) in &mut self.observers {
            observer(state, change_set);
        }
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Returns true once the initial state has been applied.
    pub fn is_live(&self) -> bool {
        self.state == PipelineState::Live
    }

    /// Returns a copy of the local state.
    pub fn snapshot(&self) -> Snapshot {
        self.register.snapshot()
    }

    /// Borrows the local register.
    pub fn register(&self) -> &Register {
        &self.register
    }

    /// Borrows the unconfirmed-operation ledger.
    pub fn ledger(&self) -> &UnconfirmedLedger {
        &self.ledger
    }

    /// Number of broadcasts waiting for the initial state.
    pub fn buffered_len(&self) -> usize {
        self.buffered.len()
    }

    /// Borrows the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrows the transport, e.g. to reconnect after `resync`.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
