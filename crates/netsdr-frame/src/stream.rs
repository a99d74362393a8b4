//! Frame reassembly over a byte stream.
//!
//! The TCP control channel delivers an arbitrary byte stream; [`FrameCodec`]
//! cuts it back into whole protocol messages using the header's length field.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_header, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// `tokio_util` codec yielding one raw message per item.
///
/// Items are the complete message bytes, header included, so callers can
/// hand them to [`crate::decode_frame`] or forward them untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

impl FrameCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let (kind, length) = decode_header(u16::from_le_bytes([src[0], src[1]]));
        if length < HEADER_SIZE {
            return Err(FrameError::InvalidLength { kind, length });
        }

        if src.len() < length {
            src.reserve(length - src.len());
            return Ok(None);
        }

        let frame = src.split_to(length).freeze();
        tracing::trace!(kind = %kind, length, "reassembled frame");
        Ok(Some(frame))
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        dst.extend_from_slice(&item);
        Ok(())
    }
}
