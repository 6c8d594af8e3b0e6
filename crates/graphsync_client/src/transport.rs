//! Transport layer abstraction for replicas.

use crate::error::{SyncError, SyncResult};
use graphsync_protocol::{ChangeSet, ServerMessage, Snapshot};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

/// A transport carries change-sets to the hub and server messages back.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (TCP, in-process, mock for testing). Reconnecting after
/// a drop is the owner's job; see [`SyncPipeline::resync`].
///
/// [`SyncPipeline::resync`]: crate::SyncPipeline::resync
pub trait Transport: Send {
    /// Opens the connection.
    fn connect(&mut self) -> impl Future<Output = SyncResult<()>> + Send;

    /// Queues a change-set for the hub. Does not wait for delivery.
    fn send(&mut self, change_set: &ChangeSet) -> SyncResult<()>;

    /// Waits for the next message. `Ok(None)` means the hub closed the
    /// connection.
    fn recv(&mut self) -> impl Future<Output = SyncResult<Option<ServerMessage>>> + Send;

    /// Checks if the transport is connected.
    fn is_connected(&self) -> bool;

    /// Closes the connection.
    fn close(&mut self) -> SyncResult<()>;
}

#[derive(Debug, Default)]
struct MockState {
    connected: bool,
    fail_sends: bool,
    inbox: VecDeque<ServerMessage>,
    sent: Vec<ChangeSet>,
}

/// A mock transport for testing.
///
/// Clones share state, so a test can keep one handle while a pipeline owns
/// another. `recv` drains the inbox and reports a closed connection once it
/// is empty.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Creates a new, unconnected mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a message for `recv`.
    pub fn push_message(&self, message: ServerMessage) {
        self.state.lock().inbox.push_back(message);
    }

    /// Queues an `initialState` message.
    pub fn push_initial_state(&self, snapshot: Snapshot) {
        self.push_message(ServerMessage::InitialState(snapshot));
    }

    /// Queues a `receiveChanges` message.
    pub fn push_changes(&self, change_set: ChangeSet) {
        self.push_message(ServerMessage::ReceiveChanges(change_set));
    }

    /// Returns every change-set sent so far.
    pub fn sent(&self) -> Vec<ChangeSet> {
        self.state.lock().sent.clone()
    }

    /// Number of queued, unread messages.
    pub fn pending(&self) -> usize {
        self.state.lock().inbox.len()
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.state.lock().connected = connected;
    }

    /// Makes every following `send` fail with a retryable transport error.
    pub fn fail_sends(&self, fail: bool) {
        self.state.lock().fail_sends = fail;
    }
}

impl Transport for MockTransport {
    async fn connect(&mut self) -> SyncResult<()> {
        self.set_connected(true);
        Ok(())
    }

    fn send(&mut self, change_set: &ChangeSet) -> SyncResult<()> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(SyncError::NotConnected);
        }
        if state.fail_sends {
            return Err(SyncError::transport_retryable("mock send failure"));
        }
        state.sent.push(change_set.clone());
        Ok(())
    }

    async fn recv(&mut self) -> SyncResult<Option<ServerMessage>> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(SyncError::NotConnected);
        }
        Ok(state.inbox.pop_front())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn close(&mut self) -> SyncResult<()> {
        self.set_connected(false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_transport_connection() {
        let mut transport = MockTransport::new();
        assert!(!transport.is_connected());

        transport.connect().await.unwrap();
        assert!(transport.is_connected());

        transport.close().unwrap();
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn mock_transport_not_connected_error() {
        let mut transport = MockTransport::new();

        let result = transport.send(&ChangeSet::new());
        assert!(matches!(result, Err(SyncError::NotConnected)));
        assert!(matches!(transport.recv().await, Err(SyncError::NotConnected)));
    }

    #[tokio::test]
    async fn mock_transport_inbox_and_sent_log() {
        let mut transport = MockTransport::new();
        let handle = transport.clone();
        transport.connect().await.unwrap();

        handle.push_initial_state(Snapshot::new());
        handle.push_changes(ChangeSet::new().with_add("a"));
        assert_eq!(handle.pending(), 2);

        assert_eq!(
            transport.recv().await.unwrap(),
            Some(ServerMessage::InitialState(Snapshot::new()))
        );
        assert!(matches!(
            transport.recv().await.unwrap(),
            Some(ServerMessage::ReceiveChanges(_))
        ));
        assert_eq!(transport.recv().await.unwrap(), None);

        transport.send(&ChangeSet::new().with_add("b")).unwrap();
        assert_eq!(handle.sent(), vec![ChangeSet::new().with_add("b")]);

        handle.fail_sends(true);
        let err = transport.send(&ChangeSet::new()).unwrap_err();
        assert!(err.is_retryable());
    }
}
