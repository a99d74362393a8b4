//! Message kinds and control item codes.
//!
//! The top three bits of every header select a [`MessageKind`]. Kinds 0-3 are
//! control-class and carry a 2-byte [`ItemCode`] after the header; kinds 4-7
//! are data-class and carry a 2-byte sequence number instead.

use crate::error::FrameError;

/// The message type carried in the top three bits of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Host sets a control item on the device.
    SetControlItem,
    /// Host requests (or device reports) the current value of a control item.
    CurrentControlItem,
    /// Host requests the valid range of a control item.
    ControlItemRange,
    /// Data item acknowledgement.
    Ack,
    DataItem0,
    DataItem1,
    DataItem2,
    DataItem3,
    /// Unsolicited device notification.
    ///
    /// Data-class. Its ordinal (8) does not fit the 3-bit type field, so it is
    /// never produced by [`MessageKind::from_bits`] and cannot be encoded.
    Notification,
}

impl MessageKind {
    /// Every kind that can appear on the wire, in ordinal order.
    pub const WIRE_KINDS: [MessageKind; 8] = [
        MessageKind::SetControlItem,
        MessageKind::CurrentControlItem,
        MessageKind::ControlItemRange,
        MessageKind::Ack,
        MessageKind::DataItem0,
        MessageKind::DataItem1,
        MessageKind::DataItem2,
        MessageKind::DataItem3,
    ];

    /// Protocol ordinal of this kind.
    pub const fn ordinal(self) -> u8 {
        match self {
            MessageKind::SetControlItem => 0,
            MessageKind::CurrentControlItem => 1,
            MessageKind::ControlItemRange => 2,
            MessageKind::Ack => 3,
            MessageKind::DataItem0 => 4,
            MessageKind::DataItem1 => 5,
            MessageKind::DataItem2 => 6,
            MessageKind::DataItem3 => 7,
            MessageKind::Notification => 8,
        }
    }

    /// Map the three type bits of a header back to a kind.
    pub const fn from_bits(bits: u8) -> MessageKind {
        match bits & 0b111 {
            0 => MessageKind::SetControlItem,
            1 => MessageKind::CurrentControlItem,
            2 => MessageKind::ControlItemRange,
            3 => MessageKind::Ack,
            4 => MessageKind::DataItem0,
            5 => MessageKind::DataItem1,
            6 => MessageKind::DataItem2,
            _ => MessageKind::DataItem3,
        }
    }

    /// Control-class kinds carry an item code; all others carry a sequence number.
    pub const fn is_control(self) -> bool {
        matches!(
            self,
            MessageKind::SetControlItem
                | MessageKind::CurrentControlItem
                | MessageKind::ControlItemRange
                | MessageKind::Ack
        )
    }

    /// Data-class kinds use the 8194-byte length sentinel and a sequence number.
    pub const fn is_data(self) -> bool {
        !self.is_control()
    }

    /// Human-readable name for logs and CLI output.
    pub const fn name(self) -> &'static str {
        match self {
            MessageKind::SetControlItem => "SetControlItem",
            MessageKind::CurrentControlItem => "CurrentControlItem",
            MessageKind::ControlItemRange => "ControlItemRange",
            MessageKind::Ack => "Ack",
            MessageKind::DataItem0 => "DataItem0",
            MessageKind::DataItem1 => "DataItem1",
            MessageKind::DataItem2 => "DataItem2",
            MessageKind::DataItem3 => "DataItem3",
            MessageKind::Notification => "Notification",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Control item codes understood by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ItemCode {
    /// No item code; used when building data-item messages.
    None = 0x0000,
    ReceiverState = 0x0018,
    ReceiverFrequency = 0x0020,
    RFFilter = 0x0044,
    ADModes = 0x008A,
    IQOutputDataSampleRate = 0x00B8,
}

impl ItemCode {
    /// Raw wire value.
    pub const fn code(self) -> u16 {
        self as u16
    }

    pub const fn name(self) -> &'static str {
        match self {
            ItemCode::None => "None",
            ItemCode::ReceiverState => "ReceiverState",
            ItemCode::ReceiverFrequency => "ReceiverFrequency",
            ItemCode::RFFilter => "RFFilter",
            ItemCode::ADModes => "ADModes",
            ItemCode::IQOutputDataSampleRate => "IQOutputDataSampleRate",
        }
    }
}

impl TryFrom<u16> for ItemCode {
    type Error = FrameError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x0000 => Ok(ItemCode::None),
            0x0018 => Ok(ItemCode::ReceiverState),
            0x0020 => Ok(ItemCode::ReceiverFrequency),
            0x0044 => Ok(ItemCode::RFFilter),
            0x008A => Ok(ItemCode::ADModes),
            0x00B8 => Ok(ItemCode::IQOutputDataSampleRate),
            other => Err(FrameError::UnknownItemCode(other)),
        }
    }
}

impl std::fmt::Display for ItemCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (0x{:04X})", self.name(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_class_boundary() {
        for kind in MessageKind::WIRE_KINDS {
            assert_eq!(kind.is_control(), kind.ordinal() < 4, "{kind}");
        }
        assert!(MessageKind::Notification.is_data());
    }

    #[test]
    fn from_bits_inverts_ordinal() {
        for kind in MessageKind::WIRE_KINDS {
            assert_eq!(MessageKind::from_bits(kind.ordinal()), kind);
        }
    }

    #[test]
    fn item_code_roundtrip() {
        for code in [
            ItemCode::None,
            ItemCode::ReceiverState,
            ItemCode::ReceiverFrequency,
            ItemCode::RFFilter,
            ItemCode::ADModes,
            ItemCode::IQOutputDataSampleRate,
        ] {
            assert_eq!(ItemCode::try_from(code.code()).unwrap(), code);
        }
    }

    #[test]
    fn unknown_item_code_rejected() {
        let err = ItemCode::try_from(0x1234).unwrap_err();
        assert!(matches!(err, FrameError::UnknownItemCode(0x1234)));
    }
}
