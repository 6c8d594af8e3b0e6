//! # graphsync_hub
//!
//! The hub is the single authority every replica talks to. It keeps the
//! authoritative register, sends each new replica its full state, and
//! re-broadcasts every change-set it receives to all connected replicas,
//! the sender included.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  HubServer                   │
//! │  ┌────────────┐  ┌────────────┐              │
//! │  │ connection │  │ connection │   ...        │
//! │  │ read task  │  │ read task  │              │
//! │  └─────┬──────┘  └─────┬──────┘              │
//! │        └───────┬───────┘                     │
//! │          ┌─────▼─────┐                       │
//! │          │ Mutex<Hub>│ register + replicas   │
//! │          └─────┬─────┘                       │
//! │     ┌──────────┴──────────┐                  │
//! │  ┌──▼───────┐        ┌────▼─────┐            │
//! │  │ writer   │        │ writer   │   ...      │
//! │  │ task     │        │ task     │            │
//! │  └──────────┘        └──────────┘            │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! [`Hub`] itself is transport-agnostic: replicas are reached through the
//! [`ReplicaSink`] trait, which lets tests and in-process replicas connect
//! without a socket.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod hub;
mod replica;
mod server;

pub use config::{HubConfig, DEFAULT_PORT};
pub use error::{HubError, HubResult};
pub use hub::{BroadcastReport, Hub, HubStats};
pub use replica::{ChannelSink, ReplicaId, ReplicaSink};
pub use server::{HubServer, HubServerHandle, SharedHub};
