use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::kind::{ItemCode, MessageKind};

/// Header: type (3 bits) + length (13 bits), little-endian.
pub const HEADER_SIZE: usize = 2;

/// Control item code following the header of control-class messages.
pub const ITEM_CODE_SIZE: usize = 2;

/// Sequence number following the header of data-class messages.
pub const SEQUENCE_NUMBER_SIZE: usize = 2;

/// Largest length the 13-bit field can carry.
pub const MAX_MESSAGE_LENGTH: usize = 8191;

/// Largest data-item message; encoded with a length field of zero.
pub const MAX_DATA_ITEM_MESSAGE_LENGTH: usize = 8194;

const LENGTH_MASK: u16 = 0x1FFF;
const TYPE_SHIFT: u32 = 13;

/// A decoded protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: MessageKind,
    /// `ItemCode::None` for data-class messages.
    pub item_code: ItemCode,
    /// Zero for control-class messages.
    pub sequence_number: u16,
    pub body: Bytes,
}

impl Frame {
    /// The total wire size of this message (header + secondary field + body).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + ITEM_CODE_SIZE + self.body.len()
    }
}

/// Encode a message into the wire format.
///
/// Wire format:
/// ```text
/// ┌───────────────────────┬─────────────────┬──────────────────┐
/// │ Header (2B LE)        │ Item code       │ Payload          │
/// │ type << 13 | length   │ (2B LE, control │                  │
/// │                       │  items only)    │                  │
/// └───────────────────────┴─────────────────┴──────────────────┘
/// ```
///
/// The item code is written only when `item_code` is not [`ItemCode::None`].
/// Data-item payloads are written straight after the header; the caller
/// places the sequence number at the front of `payload`.
pub fn encode_message(
    kind: MessageKind,
    item_code: ItemCode,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    if kind.ordinal() > 7 {
        return Err(FrameError::UnencodableKind(kind));
    }

    let item_len = if item_code != ItemCode::None {
        ITEM_CODE_SIZE
    } else {
        0
    };
    let total = HEADER_SIZE + item_len + payload.len();
    let length = header_length(kind, total)?;

    dst.reserve(total);
    dst.put_u16_le(length | (u16::from(kind.ordinal()) << TYPE_SHIFT));
    if item_len > 0 {
        dst.put_u16_le(item_code.code());
    }
    dst.put_slice(payload);
    Ok(())
}

/// Encode a message into a freshly allocated buffer of exact size.
pub fn encode(kind: MessageKind, item_code: ItemCode, payload: &[u8]) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    encode_message(kind, item_code, payload, &mut buf)?;
    Ok(buf.freeze())
}

/// Build a control item message (`SetControlItem`, `CurrentControlItem`, ...).
pub fn encode_control_item(
    kind: MessageKind,
    item_code: ItemCode,
    payload: &[u8],
) -> Result<Bytes> {
    encode(kind, item_code, payload)
}

/// Build a data item message. No item code is written.
pub fn encode_data_item(kind: MessageKind, payload: &[u8]) -> Result<Bytes> {
    encode(kind, ItemCode::None, payload)
}

fn header_length(kind: MessageKind, total: usize) -> Result<u16> {
    if kind.is_data() && total == MAX_DATA_ITEM_MESSAGE_LENGTH {
        return Ok(0);
    }
    if total > MAX_MESSAGE_LENGTH {
        let max = if kind.is_data() {
            MAX_DATA_ITEM_MESSAGE_LENGTH
        } else {
            MAX_MESSAGE_LENGTH
        };
        return Err(FrameError::PayloadTooLarge { size: total, max });
    }
    Ok(total as u16)
}

/// Split a raw header into its kind and total message length.
///
/// A zero length on a data-class kind is the 8194-byte sentinel.
pub fn decode_header(raw: u16) -> (MessageKind, usize) {
    let kind = MessageKind::from_bits((raw >> TYPE_SHIFT) as u8);
    let mut length = usize::from(raw & LENGTH_MASK);
    if kind.is_data() && length == 0 {
        length = MAX_DATA_ITEM_MESSAGE_LENGTH;
    }
    (kind, length)
}

/// Decode one message from the front of `src`.
///
/// Bytes past the declared length are ignored. Fails without a partial
/// result when `src` is shorter than a header, shorter than the declared
/// length, too short for the secondary field, or carries an unknown item code.
pub fn decode_frame(src: &[u8]) -> Result<Frame> {
    if src.len() < HEADER_SIZE {
        return Err(FrameError::TooShort(src.len()));
    }

    let (kind, length) = decode_header(u16::from_le_bytes([src[0], src[1]]));
    let declared = length.saturating_sub(HEADER_SIZE);
    let rest = &src[HEADER_SIZE..];
    if rest.len() < declared {
        return Err(FrameError::Truncated {
            needed: HEADER_SIZE + declared,
            available: src.len(),
        });
    }

    let payload = &rest[..declared];
    if payload.len() < ITEM_CODE_SIZE {
        return Err(FrameError::Truncated {
            needed: HEADER_SIZE + ITEM_CODE_SIZE,
            available: HEADER_SIZE + payload.len(),
        });
    }

    let secondary = u16::from_le_bytes([payload[0], payload[1]]);
    let (item_code, sequence_number) = if kind.is_control() {
        (ItemCode::try_from(secondary)?, 0)
    } else {
        (ItemCode::None, secondary)
    };

    Ok(Frame {
        kind,
        item_code,
        sequence_number,
        body: Bytes::copy_from_slice(&payload[ITEM_CODE_SIZE..]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTROL_CODES: [ItemCode; 5] = [
        ItemCode::IQOutputDataSampleRate,
        ItemCode::RFFilter,
        ItemCode::ADModes,
        ItemCode::ReceiverState,
        ItemCode::ReceiverFrequency,
    ];

    #[test]
    fn control_item_wire_layout() {
        let params = [0x01, 0x00, 0x2D, 0x31, 0x01, 0x00];
        let msg = encode_control_item(
            MessageKind::SetControlItem,
            ItemCode::ReceiverFrequency,
            &params,
        )
        .unwrap();

        assert_eq!(msg.len(), HEADER_SIZE + ITEM_CODE_SIZE + params.len());
        assert_eq!(&msg[..2], &[0x0A, 0x00]);
        assert_eq!(&msg[2..4], &[0x20, 0x00]);
        assert_eq!(&msg[4..], &params);
    }

    #[test]
    fn data_item_header_packs_kind() {
        let msg = encode_data_item(MessageKind::DataItem2, &[0xAA; 10]).unwrap();
        let raw = u16::from_le_bytes([msg[0], msg[1]]);
        assert_eq!(raw >> 13, 6);
        assert_eq!(usize::from(raw & 0x1FFF), 12);
        assert_eq!(&msg[2..], &[0xAA; 10]);
    }

    #[test]
    fn control_roundtrip_all_kinds_and_codes() {
        let payload = b"\x10\x20\x30\x40\x50";
        for kind in MessageKind::WIRE_KINDS.into_iter().filter(|k| k.is_control()) {
            for code in CONTROL_CODES {
                let msg = encode(kind, code, payload).unwrap();
                let frame = decode_frame(&msg).unwrap();
                assert_eq!(frame.kind, kind);
                assert_eq!(frame.item_code, code);
                assert_eq!(frame.sequence_number, 0);
                assert_eq!(frame.body.as_ref(), payload);
            }
        }
    }

    #[test]
    fn data_roundtrip_with_patched_sequence_number() {
        for kind in MessageKind::WIRE_KINDS.into_iter().filter(|k| k.is_data()) {
            let mut payload = vec![0u8, 0u8];
            payload.extend_from_slice(b"iq-samples");
            let msg = encode_data_item(kind, &payload).unwrap();

            let mut patched = msg.to_vec();
            patched[2..4].copy_from_slice(&0xBEEFu16.to_le_bytes());

            let frame = decode_frame(&patched).unwrap();
            assert_eq!(frame.kind, kind);
            assert_eq!(frame.item_code, ItemCode::None);
            assert_eq!(frame.sequence_number, 0xBEEF);
            assert_eq!(frame.body.as_ref(), b"iq-samples");
        }
    }

    #[test]
    fn max_data_item_uses_zero_length_sentinel() {
        let payload = vec![0x5A; MAX_DATA_ITEM_MESSAGE_LENGTH - HEADER_SIZE];
        let msg = encode_data_item(MessageKind::DataItem1, &payload).unwrap();
        assert_eq!(msg.len(), MAX_DATA_ITEM_MESSAGE_LENGTH);

        let raw = u16::from_le_bytes([msg[0], msg[1]]);
        assert_eq!(raw & 0x1FFF, 0);
        assert_eq!(raw >> 13, 5);

        let frame = decode_frame(&msg).unwrap();
        assert_eq!(frame.kind, MessageKind::DataItem1);
        assert_eq!(frame.body.len(), 8190);
    }

    #[test]
    fn control_item_at_length_limit() {
        let payload = vec![0u8; MAX_MESSAGE_LENGTH - HEADER_SIZE - ITEM_CODE_SIZE];
        let msg = encode(MessageKind::SetControlItem, ItemCode::RFFilter, &payload).unwrap();
        assert_eq!(msg.len(), MAX_MESSAGE_LENGTH);

        let payload = vec![0u8; payload.len() + 1];
        let err = encode(MessageKind::SetControlItem, ItemCode::RFFilter, &payload).unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadTooLarge {
                size: 8192,
                max: MAX_MESSAGE_LENGTH
            }
        ));
    }

    #[test]
    fn control_item_never_uses_sentinel() {
        let payload = vec![0u8; MAX_DATA_ITEM_MESSAGE_LENGTH - HEADER_SIZE - ITEM_CODE_SIZE];
        let err = encode(MessageKind::Ack, ItemCode::RFFilter, &payload).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn data_item_between_limit_and_sentinel_rejected() {
        for total in [8192usize, 8193, 8195] {
            let payload = vec![0u8; total - HEADER_SIZE];
            let err = encode_data_item(MessageKind::DataItem0, &payload).unwrap_err();
            assert!(matches!(err, FrameError::PayloadTooLarge { size, .. } if size == total));
        }
    }

    #[test]
    fn notification_cannot_be_encoded() {
        let err = encode_data_item(MessageKind::Notification, b"x").unwrap_err();
        assert!(matches!(
            err,
            FrameError::UnencodableKind(MessageKind::Notification)
        ));
    }

    #[test]
    fn empty_and_one_byte_inputs_rejected() {
        assert!(matches!(decode_frame(&[]), Err(FrameError::TooShort(0))));
        assert!(matches!(decode_frame(&[0x04]), Err(FrameError::TooShort(1))));
    }

    #[test]
    fn declared_length_beyond_input_rejected() {
        let msg = encode(MessageKind::SetControlItem, ItemCode::ADModes, &[0x00, 0x03]).unwrap();
        let err = decode_frame(&msg[..msg.len() - 1]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Truncated {
                needed: 6,
                available: 5
            }
        ));
    }

    #[test]
    fn header_only_control_item_rejected() {
        // Length 2: nothing left for the item code.
        let err = decode_frame(&[0x02, 0x00]).unwrap_err();
        assert!(matches!(err, FrameError::Truncated { .. }));
    }

    #[test]
    fn header_only_data_item_rejected() {
        let err = decode_frame(&[0x02, 0x80, 0xFF, 0xFF]).unwrap_err();
        assert!(matches!(err, FrameError::Truncated { .. }));
    }

    #[test]
    fn unknown_item_code_rejected() {
        let wire = [0x06, 0x00, 0x34, 0x12, 0x01, 0x02];
        let err = decode_frame(&wire).unwrap_err();
        assert!(matches!(err, FrameError::UnknownItemCode(0x1234)));
    }

    #[test]
    fn trailing_bytes_ignored() {
        let mut wire = encode(MessageKind::SetControlItem, ItemCode::RFFilter, &[0x00, 0x00])
            .unwrap()
            .to_vec();
        wire.extend_from_slice(&[0xFF; 7]);

        let frame = decode_frame(&wire).unwrap();
        assert_eq!(frame.item_code, ItemCode::RFFilter);
        assert_eq!(frame.body.as_ref(), &[0x00, 0x00]);
    }

    #[test]
    fn decodes_device_style_data_item() {
        // 0x8404: DataItem0, total length 1028.
        let mut wire = vec![0x04, 0x84];
        wire.extend_from_slice(&7u16.to_le_bytes());
        wire.extend_from_slice(&[0x11; 1024]);

        let frame = decode_frame(&wire).unwrap();
        assert_eq!(frame.kind, MessageKind::DataItem0);
        assert_eq!(frame.sequence_number, 7);
        assert_eq!(frame.body.len(), 1024);
        assert_eq!(frame.wire_size(), wire.len());
    }

    #[test]
    fn decode_header_applies_sentinel_only_to_data_kinds() {
        assert_eq!(decode_header(0x8000), (MessageKind::DataItem0, 8194));
        assert_eq!(decode_header(0x0000), (MessageKind::SetControlItem, 0));
        assert_eq!(decode_header(0x2005), (MessageKind::CurrentControlItem, 5));
    }
}
