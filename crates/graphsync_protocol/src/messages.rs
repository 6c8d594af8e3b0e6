//! Protocol messages exchanged between replicas and the hub.

use crate::change_set::{ChangeSet, Snapshot};
use bytes::Bytes;
use graphsync_codec::{encode_frame, from_cbor, to_cbor, CodecResult, Decode, Encode};
use serde::{Deserialize, Serialize};

/// A message sent by the hub to a replica.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServerMessage {
    /// Full state, sent once to a replica right after it connects.
    InitialState(Snapshot),
    /// A change-set accepted by the hub, re-broadcast to every replica.
    ReceiveChanges(ChangeSet),
}

impl ServerMessage {
    /// Returns the message name used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            ServerMessage::InitialState(_) => "initialState",
            ServerMessage::ReceiveChanges(_) => "receiveChanges",
        }
    }

    /// Encodes the message into a single frame.
    pub fn to_frame(&self, max_frame_len: usize) -> CodecResult<Bytes> {
        encode_frame(&self.encode()?, max_frame_len)
    }
}

impl Encode for ServerMessage {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        to_cbor(self)
    }
}

impl Decode for ServerMessage {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        from_cbor(bytes)
    }
}

/// A message sent by a replica to the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    /// A locally applied change-set for the hub to apply and broadcast.
    SendChanges(ChangeSet),
}

impl ClientMessage {
    /// Returns the message name used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            ClientMessage::SendChanges(_) => "sendChanges",
        }
    }

    /// Encodes the message into a single frame.
    pub fn to_frame(&self, max_frame_len: usize) -> CodecResult<Bytes> {
        encode_frame(&self.encode()?, max_frame_len)
    }
}

impl Encode for ClientMessage {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        to_cbor(self)
    }
}

impl Decode for ClientMessage {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        from_cbor(bytes)
    }
}
