use crate::kind::MessageKind;

/// Errors that can occur during message encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The encoded message would not fit the 13-bit length field.
    #[error("message too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The kind has no 3-bit wire representation.
    #[error("message kind {0} cannot be encoded")]
    UnencodableKind(MessageKind),

    /// Fewer bytes than a header.
    #[error("message too short ({0} bytes, need at least 2)")]
    TooShort(usize),

    /// The header declares more bytes than are present, or the declared
    /// length cannot hold the secondary field.
    #[error("truncated message (need {needed} bytes, have {available})")]
    Truncated { needed: usize, available: usize },

    /// A control-class message carried an item code outside the known set.
    #[error("unknown control item code 0x{0:04X}")]
    UnknownItemCode(u16),

    /// Sample width must be 8, 16, 24 or 32 bits.
    #[error("sample width {0} bits out of range (1-4 bytes)")]
    InvalidSampleWidth(u16),

    /// A header on the stream declares a length shorter than the header itself.
    #[error("invalid header length {length} for {kind}")]
    InvalidLength { kind: MessageKind, length: usize },

    /// An I/O error occurred while reading or writing a framed stream.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
