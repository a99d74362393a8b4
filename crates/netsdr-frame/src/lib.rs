//! NetSDR message codec.
//!
//! Every message starts with a 16-bit little-endian header:
//! - the top 3 bits select the [`MessageKind`]
//! - the low 13 bits hold the total message length, header included
//!
//! Control-class kinds follow the header with a 2-byte [`ItemCode`]; data-class
//! kinds follow it with a 2-byte sequence number. A data item of exactly 8194
//! bytes is written with a length of zero.
//!
//! Everything here is pure and stateless apart from the optional stream
//! codec (feature `async`), which reassembles messages out of a TCP stream.

pub mod codec;
pub mod error;
pub mod kind;
pub mod samples;
#[cfg(feature = "async")]
pub mod stream;

pub use codec::{
    decode_frame, decode_header, encode, encode_control_item, encode_data_item, encode_message,
    Frame, HEADER_SIZE, ITEM_CODE_SIZE, MAX_DATA_ITEM_MESSAGE_LENGTH, MAX_MESSAGE_LENGTH,
    SEQUENCE_NUMBER_SIZE,
};
pub use error::{FrameError, Result};
pub use kind::{ItemCode, MessageKind};
pub use samples::{decode_samples, Samples, IQ_SAMPLE_BITS};
#[cfg(feature = "async")]
pub use stream::FrameCodec;
