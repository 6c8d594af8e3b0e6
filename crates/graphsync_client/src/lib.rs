//! # graphsync_client
//!
//! Replica side of graphsync: a local register kept in step with the hub,
//! with local mutations applied optimistically.
//!
//! This crate provides:
//! - [`SyncPipeline`], the bootstrap / optimistic-apply / reconcile state
//!   machine
//! - [`UnconfirmedLedger`], which recognises the hub's echo of local writes
//! - The [`Transport`] abstraction with a TCP implementation and a mock
//!
//! ## Data flow
//!
//! A local change-set is applied to the local register, recorded as
//! unconfirmed and sent to the hub. The hub applies it and broadcasts it to
//! every replica. The origin matches the echo against its ledger and drops
//! what it already applied; everybody else applies it as a remote update.
//!
//! ## Example
//!
//! ```no_run
//! use graphsync_client::{ClientConfig, SyncPipeline, TcpTransport};
//! use graphsync_protocol::ChangeSet;
//!
//! # async fn run() -> graphsync_client::SyncResult<()> {
//! let transport = TcpTransport::new(ClientConfig::default());
//! let mut pipeline = SyncPipeline::new(transport);
//! pipeline.start().await?;
//!
//! pipeline.register_observer(|state, change_set| {
//!     println!("{} entities after {change_set}", state.len());
//! });
//!
//! pipeline.submit(ChangeSet::new().with_add("todos"))?;
//! pipeline.run_until_closed().await
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod ledger;
mod pipeline;
mod tcp;
mod transport;

pub use config::ClientConfig;
pub use error::{SyncError, SyncResult};
pub use ledger::UnconfirmedLedger;
pub use pipeline::{ObserverId, PipelineEvent, PipelineState, SyncPipeline};
pub use tcp::TcpTransport;
pub use transport::{MockTransport, Transport};
