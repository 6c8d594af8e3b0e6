//! # graphsync protocol
//!
//! Replicated state and wire types for graphsync.
//!
//! This crate provides:
//! - [`Register`], the key → property → value store held by every replica
//! - [`ChangeSet`] / [`Change`], the sole unit of replication
//! - [`ServerMessage`] / [`ClientMessage`], the messages exchanged with a hub
//!
//! This is a pure protocol crate with no I/O operations.
//!
//! ## Application order
//!
//! A change-set is always applied adds → changes → removes. One local action
//! may add a key and set its properties in the same batch; applying the
//! changes first would drop them, since a change on an absent key is a no-op.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change_set;
mod messages;
mod register;

pub use change_set::{Change, ChangeSet, EntityKey, Properties, Snapshot};
pub use messages::{ClientMessage, ServerMessage};
pub use register::Register;

pub use graphsync_codec::Value;
