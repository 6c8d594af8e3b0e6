//! Length-prefixed framing.
//!
//! Every message travels as one frame: a 4-byte big-endian payload length
//! followed by the payload. The decoder is a pure buffer; callers feed it
//! whatever bytes their socket produced and pull complete frames out.

use crate::error::{CodecError, CodecResult};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size of the length prefix.
pub const FRAME_HEADER_LEN: usize = 4;

/// Default upper bound on a single frame payload (16 MiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Default upper bound on a frame carrying a whole register (64 MiB).
pub const DEFAULT_MAX_STATE_FRAME_LEN: usize = 4 * DEFAULT_MAX_FRAME_LEN;

/// Wraps a payload into a frame.
pub fn encode_frame(payload: &[u8], max_frame_len: usize) -> CodecResult<Bytes> {
    check_length(payload.len(), max_frame_len)?;
    let len = u32::try_from(payload.len())
        .map_err(|_| CodecError::frame_length_invalid("payload does not fit a u32 prefix"))?;

    let mut frame = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.put_u32(len);
    frame.put_slice(payload);
    Ok(frame.freeze())
}

fn check_length(len: usize, max_frame_len: usize) -> CodecResult<()> {
    if len == 0 {
        return Err(CodecError::frame_length_invalid(
            "frame length cannot be zero",
        ));
    }
    if len > max_frame_len {
        return Err(CodecError::FrameTooLarge {
            max_frame_len,
            got: len,
        });
    }
    Ok(())
}

/// Incremental frame decoder.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: BytesMut,
    max_frame_len: usize,
}

impl FrameDecoder {
    /// Creates a decoder that rejects frames above `max_frame_len`.
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_frame_len,
        }
    }

    /// Appends raw bytes read from the wire.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Returns the writable buffer so readers can fill it in place.
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Number of buffered bytes not yet returned as frames.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Pops the next complete frame payload, if one is buffered.
    ///
    /// A length violation is reported as soon as the header is visible;
    /// the stream cannot be resynchronized after that.
    pub fn next_frame(&mut self) -> CodecResult<Option<Bytes>> {
        if self.buffer.len() < FRAME_HEADER_LEN {
            return Ok(None);
        }

        let mut header = [0u8; FRAME_HEADER_LEN];
        header.copy_from_slice(&self.buffer[..FRAME_HEADER_LEN]);
        let len = u32::from_be_bytes(header) as usize;
        check_length(len, self.max_frame_len)?;

        if self.buffer.len() < FRAME_HEADER_LEN + len {
            self.buffer.reserve(FRAME_HEADER_LEN + len - self.buffer.len());
            return Ok(None);
        }

        self.buffer.advance(FRAME_HEADER_LEN);
        Ok(Some(self.buffer.split_to(len).freeze()))
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}
