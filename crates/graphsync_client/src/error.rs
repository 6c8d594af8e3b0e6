//! Error types for replicas.

use graphsync_codec::CodecError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while replicating.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The transport has not been connected.
    #[error("not connected to hub")]
    NotConnected,

    /// The hub closed the connection.
    #[error("connection closed by hub")]
    ConnectionClosed,

    /// A message could not be encoded, decoded or framed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The hub sent something out of order.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A local change-set was submitted before the initial state arrived.
    #[error("pipeline is not live yet")]
    NotLive,

    /// Timeout.
    #[error("operation timed out")]
    Timeout,

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if reconnecting and trying again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::ConnectionClosed | SyncError::Timeout | SyncError::Io(_) => true,
            _ => false,
        }
    }
}
