//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding, decoding or framing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to encode value to CBOR.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode CBOR bytes.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// NaN and infinite floats cannot be replicated.
    #[error("non-finite float values are not supported")]
    NonFiniteFloat,

    /// Frame header announced an unusable length.
    #[error("frame length invalid: {reason}")]
    FrameLengthInvalid {
        /// Why the length was rejected.
        reason: String,
    },

    /// Frame exceeds the configured maximum.
    #[error("frame too large: max {max_frame_len} got {got}")]
    FrameTooLarge {
        /// Configured maximum payload length.
        max_frame_len: usize,
        /// Announced payload length.
        got: usize,
    },
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Create a frame length error.
    pub fn frame_length_invalid(reason: impl Into<String>) -> Self {
        Self::FrameLengthInvalid {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CodecError::FrameTooLarge {
            max_frame_len: 16,
            got: 32,
        };
        assert_eq!(err.to_string(), "frame too large: max 16 got 32");

        let err = CodecError::decoding_failed("byte strings are not supported values");
        assert!(err.to_string().contains("byte strings"));
    }
}
