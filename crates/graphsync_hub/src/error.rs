//! Error types for the hub.

use crate::replica::ReplicaId;
use graphsync_codec::CodecError;
use thiserror::Error;

/// Result type for hub operations.
pub type HubResult<T> = Result<T, HubError>;

/// Errors that can occur in the hub.
#[derive(Error, Debug)]
pub enum HubError {
    /// A message could not be encoded, decoded or framed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Connection limit reached.
    #[error("too many replicas: limit is {max}")]
    TooManyReplicas {
        /// Configured limit.
        max: usize,
    },

    /// The replica is not connected to this hub.
    #[error("unknown replica {0}")]
    UnknownReplica(ReplicaId),

    /// The replica's outbound channel is gone.
    #[error("replica {0} is closed")]
    ReplicaClosed(ReplicaId),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl HubError {
    /// Returns true if the peer caused this error.
    pub fn is_client_error(&self) -> bool {
        matches!(self, HubError::Codec(_) | HubError::TooManyReplicas { .. })
    }
}
