//! Control items the client sets on the receiver.

use bytes::Bytes;
use netsdr_frame::{encode_control_item, ItemCode, MessageKind};

use crate::error::Result;

/// Default IQ output sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u64 = 100_000;

/// RF filter mode 0: automatic selection.
pub const RF_FILTER_AUTO: u16 = 0x0000;

/// Default A/D mode bytes.
pub const DEFAULT_AD_MODE: [u8; 2] = [0x00, 0x03];

/// Default tuning used by the interactive session.
pub const DEFAULT_FREQUENCY_HZ: u64 = 20_000_000;
pub const DEFAULT_CHANNEL: u8 = 1;

const RECEIVER_START: [u8; 4] = [0x80, 0x02, 0x01, 0x01];
const RECEIVER_STOP: [u8; 4] = [0x00, 0x01, 0x00, 0x00];

/// A `SetControlItem` request: item code plus parameter bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlItem {
    pub code: ItemCode,
    pub payload: Vec<u8>,
}

impl ControlItem {
    pub fn new(code: ItemCode, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            code,
            payload: payload.into(),
        }
    }

    /// IQ output sample rate, sent as the low 5 bytes of `hz` little-endian.
    pub fn sample_rate(hz: u64) -> Self {
        Self::new(ItemCode::IQOutputDataSampleRate, le40(hz))
    }

    pub fn rf_filter(mode: u16) -> Self {
        Self::new(ItemCode::RFFilter, mode.to_le_bytes())
    }

    pub fn ad_modes(mode: [u8; 2]) -> Self {
        Self::new(ItemCode::ADModes, mode)
    }

    /// Tune `channel` to `hz` (low 5 bytes, little-endian).
    pub fn receiver_frequency(hz: u64, channel: u8) -> Self {
        let mut payload = Vec::with_capacity(6);
        payload.push(channel);
        payload.extend_from_slice(&le40(hz));
        Self::new(ItemCode::ReceiverFrequency, payload)
    }

    /// Start the receiver: complex IQ, continuous capture.
    pub fn receiver_start() -> Self {
        Self::new(ItemCode::ReceiverState, RECEIVER_START)
    }

    pub fn receiver_stop() -> Self {
        Self::new(ItemCode::ReceiverState, RECEIVER_STOP)
    }

    /// Encode as a `SetControlItem` message.
    pub fn encode(&self) -> Result<Bytes> {
        Ok(encode_control_item(
            MessageKind::SetControlItem,
            self.code,
            &self.payload,
        )?)
    }
}

fn le40(value: u64) -> [u8; 5] {
    let bytes = value.to_le_bytes();
    [bytes[0], bytes[1], bytes[2], bytes[3], bytes[4]]
}
