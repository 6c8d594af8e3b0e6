//! Integration tests: pipelines replicating through a real hub.
//!
//! Most tests wire pipelines to a shared in-process [`Hub`] so interleavings
//! can be controlled exactly; the last one replicates over TCP through a
//! spawned [`HubServer`].

use bytes::Bytes;
use graphsync_client::{
    ClientConfig, PipelineEvent, SyncError, SyncPipeline, SyncResult, TcpTransport, Transport,
};
use graphsync_codec::{Decode, FrameDecoder, Value};
use graphsync_hub::{ChannelSink, Hub, HubConfig, HubServer, ReplicaId, SharedHub};
use graphsync_protocol::{ChangeSet, ServerMessage};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

/// A transport that talks to a hub in the same process.
struct InProcessTransport {
    hub: SharedHub,
    replica: Option<ReplicaId>,
    inbound: Option<mpsc::UnboundedReceiver<Bytes>>,
    decoder: FrameDecoder,
}

impl InProcessTransport {
    fn new(hub: &SharedHub) -> Self {
        Self {
            hub: Arc::clone(hub),
            replica: None,
            inbound: None,
            decoder: FrameDecoder::default(),
        }
    }
}

impl Transport for InProcessTransport {
    async fn connect(&mut self) -> SyncResult<()> {
        let (sink, rx) = ChannelSink::new();
        let replica = self
            .hub
            .lock()
            .connect(Box::new(sink))
            .map_err(|e| SyncError::transport_fatal(e.to_string()))?;
        self.replica = Some(replica);
        self.inbound = Some(rx);
        Ok(())
    }

    fn send(&mut self, change_set: &ChangeSet) -> SyncResult<()> {
        let replica = self.replica.ok_or(SyncError::NotConnected)?;
        self.hub
            .lock()
            .handle_changes(replica, change_set)
            .map(|_| ())
            .map_err(|e| SyncError::transport_fatal(e.to_string()))
    }

    async fn recv(&mut self) -> SyncResult<Option<ServerMessage>> {
        let inbound = self.inbound.as_mut().ok_or(SyncError::NotConnected)?;
        loop {
            if let Some(payload) = self.decoder.next_frame()? {
                return Ok(Some(ServerMessage::decode(&payload)?));
            }
            // Non-blocking: an empty queue ends the test's read loop.
            match inbound.try_recv() {
                Ok(frame) => self.decoder.extend(&frame),
                Err(_) => return Ok(None),
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.replica.is_some()
    }

    fn close(&mut self) -> SyncResult<()> {
        if let Some(replica) = self.replica.take() {
            self.hub.lock().disconnect(replica);
        }
        self.inbound = None;
        Ok(())
    }
}

fn shared_hub() -> SharedHub {
    Arc::new(Mutex::new(Hub::new(HubConfig::default())))
}

async fn in_process_replica(hub: &SharedHub) -> SyncPipeline<InProcessTransport> {
    let mut pipeline = SyncPipeline::new(InProcessTransport::new(hub));
    pipeline.start().await.unwrap();
    pipeline
}

/// Handles everything currently queued for the replica.
async fn drain(pipeline: &mut SyncPipeline<InProcessTransport>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Some(event) = pipeline.process_next().await.unwrap() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn two_replicas_converge() {
    let hub = shared_hub();
    let mut alice = in_process_replica(&hub).await;
    let mut bob = in_process_replica(&hub).await;

    alice
        .submit(
            ChangeSet::new()
                .with_add("todos")
                .with_add("t1")
                .with_change("t1", "text", "buy milk")
                .with_change("todos", "t1", "t1"),
        )
        .unwrap();
    bob.submit(ChangeSet::new().with_add("t2").with_change("t2", "text", "walk dog"))
        .unwrap();

    drain(&mut alice).await;
    drain(&mut bob).await;

    assert_eq!(alice.snapshot(), hub.lock().snapshot());
    assert_eq!(bob.snapshot(), hub.lock().snapshot());
    assert!(alice.ledger().is_empty());
    assert!(bob.ledger().is_empty());
}

#[tokio::test]
async fn origin_sees_empty_effective_set_for_its_echo() {
    let hub = shared_hub();
    let mut alice = in_process_replica(&hub).await;
    let mut bob = in_process_replica(&hub).await;

    let local = ChangeSet::new()
        .with_add("t1")
        .with_change("t1", "completed", false);
    alice.submit(local.clone()).unwrap();

    assert_eq!(
        drain(&mut alice).await,
        vec![PipelineEvent::Applied(ChangeSet::new())]
    );
    assert_eq!(drain(&mut bob).await, vec![PipelineEvent::Applied(local)]);
}

#[tokio::test]
async fn concurrent_writes_converge_to_last_broadcast() {
    let hub = shared_hub();
    let mut alice = in_process_replica(&hub).await;
    let mut bob = in_process_replica(&hub).await;

    alice.submit(ChangeSet::new().with_add("t1")).unwrap();
    drain(&mut alice).await;
    drain(&mut bob).await;

    // Both write before seeing the other's change; bob reaches the hub last.
    alice
        .submit(ChangeSet::new().with_change("t1", "completed", true))
        .unwrap();
    bob.submit(ChangeSet::new().with_change("t1", "completed", false))
        .unwrap();

    drain(&mut alice).await;
    drain(&mut bob).await;

    // alice confirms her echo, then applies bob's write; bob drops alice's
    // write as a stale echo of his pending one, then confirms his own.
    let expected = Some(&Value::Bool(false));
    assert_eq!(hub.lock().register().property("t1", "completed"), expected);
    assert_eq!(alice.register().property("t1", "completed"), expected);
    assert_eq!(bob.register().property("t1", "completed"), expected);
    assert!(alice.ledger().is_empty());
    assert!(bob.ledger().is_empty());
}

#[tokio::test]
async fn late_joiner_catches_up() {
    let hub = shared_hub();
    let mut alice = in_process_replica(&hub).await;
    alice
        .submit(ChangeSet::new().with_add("t1").with_change("t1", "n", 1))
        .unwrap();

    // Connect without starting so the next broadcast queues up behind the
    // initial state.
    let mut late = SyncPipeline::new(InProcessTransport::new(&hub));
    late.transport_mut().connect().await.unwrap();
    alice
        .submit(ChangeSet::new().with_change("t1", "n", 2))
        .unwrap();

    late.start().await.unwrap();
    drain(&mut late).await;

    assert_eq!(late.register().property("t1", "n"), Some(&Value::Integer(2)));
    assert_eq!(late.snapshot(), hub.lock().snapshot());
}

#[tokio::test]
async fn reconnect_with_resync_drops_keys_removed_meanwhile() {
    let hub = shared_hub();
    let mut alice = in_process_replica(&hub).await;
    let mut bob = in_process_replica(&hub).await;

    alice
        .submit(ChangeSet::new().with_add("a").with_add("b"))
        .unwrap();
    drain(&mut alice).await;
    drain(&mut bob).await;

    bob.transport_mut().close().unwrap();
    alice.submit(ChangeSet::new().with_remove("a")).unwrap();
    drain(&mut alice).await;
    assert!(bob.register().contains("a"));

    bob.resync();
    bob.start().await.unwrap();

    assert!(!bob.register().contains("a"));
    assert_eq!(bob.snapshot(), hub.lock().snapshot());
}

#[tokio::test]
async fn reconnect_with_resync_drops_properties_of_recreated_keys() {
    let hub = shared_hub();
    let mut alice = in_process_replica(&hub).await;
    let mut bob = in_process_replica(&hub).await;

    alice
        .submit(ChangeSet::new().with_add("k").with_change("k", "p", 1))
        .unwrap();
    drain(&mut alice).await;
    drain(&mut bob).await;
    assert_eq!(bob.register().property("k", "p"), Some(&Value::Integer(1)));

    // While bob is away the key is removed and created again without `p`.
    bob.transport_mut().close().unwrap();
    alice.submit(ChangeSet::new().with_remove("k")).unwrap();
    drain(&mut alice).await;
    alice
        .submit(ChangeSet::new().with_add("k").with_change("k", "q", 2))
        .unwrap();
    drain(&mut alice).await;
    assert_eq!(bob.register().property("k", "p"), Some(&Value::Integer(1)));

    bob.resync();
    bob.start().await.unwrap();

    assert_eq!(bob.register().property("k", "p"), None);
    assert_eq!(bob.register().property("k", "q"), Some(&Value::Integer(2)));
    assert_eq!(bob.snapshot(), hub.lock().snapshot());
    assert_eq!(alice.snapshot(), bob.snapshot());
}

async fn next_applied(pipeline: &mut SyncPipeline<TcpTransport>) -> ChangeSet {
    loop {
        let event = timeout(WAIT, pipeline.process_next())
            .await
            .expect("timed out waiting for the hub")
            .unwrap();
        match event {
            Some(PipelineEvent::Applied(change_set)) => return change_set,
            Some(_) => continue,
            None => panic!("hub closed the connection"),
        }
    }
}

#[tokio::test]
async fn replicate_over_tcp() {
    let server = HubServer::bind(HubConfig::new("127.0.0.1:0".parse().unwrap()))
        .await
        .unwrap()
        .spawn()
        .unwrap();
    let config = ClientConfig::new(server.local_addr());

    let mut alice = SyncPipeline::new(TcpTransport::new(config.clone()));
    let mut bob = SyncPipeline::new(TcpTransport::new(config));
    timeout(WAIT, alice.start()).await.unwrap().unwrap();
    timeout(WAIT, bob.start()).await.unwrap().unwrap();

    let local = ChangeSet::new()
        .with_add("t1")
        .with_change("t1", "text", "buy milk")
        .with_change("t1", "tags", vec!["home", "errand"]);
    alice.submit(local.clone()).unwrap();

    assert_eq!(next_applied(&mut bob).await, local);
    assert_eq!(next_applied(&mut alice).await, ChangeSet::new());
    assert!(alice.ledger().is_empty());
    assert_eq!(alice.snapshot(), bob.snapshot());
    assert_eq!(alice.snapshot(), server.hub().lock().snapshot());

    server.shutdown().await.unwrap();
    let closed = timeout(WAIT, alice.process_next()).await.unwrap().unwrap();
    assert_eq!(closed, None);
}
