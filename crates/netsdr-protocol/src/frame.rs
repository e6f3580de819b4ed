//! # NetSDR Frame Format
//!
//! Every frame on the wire — control or data — starts with the same 16-bit
//! little-endian header:
//!
//! ```text
//!  0                   1
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6
//! +-+-+-+-----------------------------+
//! |  T  |        Length (13)          |
//! +-+-+-+-----------------------------+
//! ```
//!
//! `T` (top 3 bits) selects the [`MessageType`]; `Length` (low 13 bits) is the
//! total encoded frame length in bytes, including the header itself. Data
//! frame types (`DataItem0..=DataItem3`) additionally treat `Length == 0` as
//! an escape for the single fixed maximum data-frame size of
//! [`MAX_DATA_FRAME_LEN`] bytes, since that size does not fit in 13 bits.
//!
//! Control frames (`SetControlItem`, `CurrentControlItem`, `ControlItemRange`,
//! `Ack`) and `DataItem0` carry a 16-bit little-endian item code after the
//! header. `DataItem1` carries a 16-bit sequence number instead. `DataItem2`
//! and `DataItem3` carry neither — the body follows the header directly.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// Size of the length/type header word, in bytes.
pub const HEADER_LEN: usize = 2;

/// Largest length value that fits in the 13-bit length field directly.
pub const MAX_NON_ESCAPED_LEN: usize = 0x1FFF; // 8191

/// The one data-frame size that cannot be expressed directly and is instead
/// signalled by a zero length field.
pub const MAX_DATA_FRAME_LEN: usize = 8194;

// ─── Message Type ────────────────────────────────────────────────────────────

/// The 3-bit frame type carried in the top bits of the header word.
///
/// Numeric values are significant: they are exactly the position of each
/// variant in this list, and match the 3-bit field on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    SetControlItem = 0,
    CurrentControlItem = 1,
    ControlItemRange = 2,
    Ack = 3,
    DataItem0 = 4,
    DataItem1 = 5,
    DataItem2 = 6,
    DataItem3 = 7,
}

impl MessageType {
    /// Decode from a 3-bit field. Every value `0..=7` is a valid message
    /// type, so this never fails.
    fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0 => MessageType::SetControlItem,
            1 => MessageType::CurrentControlItem,
            2 => MessageType::ControlItemRange,
            3 => MessageType::Ack,
            4 => MessageType::DataItem0,
            5 => MessageType::DataItem1,
            6 => MessageType::DataItem2,
            7 => MessageType::DataItem3,
            _ => unreachable!("3-bit field is always 0..=7"),
        }
    }

    /// Whether this type belongs to the control family (carries an item code
    /// sub-header, no special max-size escape).
    pub fn is_control_type(self) -> bool {
        matches!(
            self,
            MessageType::SetControlItem
                | MessageType::CurrentControlItem
                | MessageType::ControlItemRange
                | MessageType::Ack
        )
    }

    /// Whether this type belongs to the data family (eligible for the
    /// max-size-as-zero length escape).
    pub fn is_data_type(self) -> bool {
        !self.is_control_type()
    }
}

// ─── Control Item Code ───────────────────────────────────────────────────────

/// Closed set of receiver parameters a control or `DataItem0` frame can name.
///
/// Any other 16-bit value seen on the wire is a decode failure
/// ([`ProtocolError::UnknownItemCode`]) — this is not an extensible enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ControlItemCode {
    None = 0x0000,
    ReceiverState = 0x0018,
    ReceiverFrequency = 0x0020,
    RFFilter = 0x0044,
    ADModes = 0x008A,
    IQOutputDataSampleRate = 0x00B8,
}

impl ControlItemCode {
    /// Look up a code, returning `None` if it is outside the closed set.
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            0x0000 => Some(ControlItemCode::None),
            0x0018 => Some(ControlItemCode::ReceiverState),
            0x0020 => Some(ControlItemCode::ReceiverFrequency),
            0x0044 => Some(ControlItemCode::RFFilter),
            0x008A => Some(ControlItemCode::ADModes),
            0x00B8 => Some(ControlItemCode::IQOutputDataSampleRate),
            _ => None,
        }
    }
}

// ─── Frame ───────────────────────────────────────────────────────────────────

/// A decoded NetSDR frame.
///
/// Unlike the reference protocol, which surfaces `item_code`/`sequence_number`
/// as out-parameters set to sentinel values when not applicable, this is a
/// tagged union: each variant only carries the fields its frame type actually
/// has on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// `SetControlItem` / `CurrentControlItem` / `ControlItemRange` / `Ack`.
    Control {
        msg_type: MessageType,
        item: ControlItemCode,
        body: Bytes,
    },
    /// `DataItem0` — data frame carrying an item code.
    DataWithItem { item: ControlItemCode, body: Bytes },
    /// `DataItem1` — data frame carrying a sequence number.
    DataWithSeq { sequence: u16, body: Bytes },
    /// `DataItem2` / `DataItem3` — data frame with neither sub-header.
    DataBare { msg_type: MessageType, body: Bytes },
}

impl Frame {
    /// The frame's message type.
    pub fn msg_type(&self) -> MessageType {
        match self {
            Frame::Control { msg_type, .. } => *msg_type,
            Frame::DataWithItem { .. } => MessageType::DataItem0,
            Frame::DataWithSeq { .. } => MessageType::DataItem1,
            Frame::DataBare { msg_type, .. } => *msg_type,
        }
    }

    /// The frame's item code, or `ControlItemCode::None` if this frame type
    /// does not carry one.
    pub fn item_code(&self) -> ControlItemCode {
        match self {
            Frame::Control { item, .. } | Frame::DataWithItem { item, .. } => *item,
            Frame::DataWithSeq { .. } | Frame::DataBare { .. } => ControlItemCode::None,
        }
    }

    /// The frame's sequence number, or 0 if this frame type does not carry one.
    pub fn sequence_number(&self) -> u16 {
        match self {
            Frame::DataWithSeq { sequence, .. } => *sequence,
            _ => 0,
        }
    }

    /// The frame's body (everything after the header and any sub-header).
    pub fn body(&self) -> &Bytes {
        match self {
            Frame::Control { body, .. }
            | Frame::DataWithItem { body, .. }
            | Frame::DataWithSeq { body, .. }
            | Frame::DataBare { body, .. } => body,
        }
    }

    /// Re-encode this frame back to wire bytes.
    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        match self {
            Frame::Control {
                msg_type,
                item,
                body,
            } => encode_control(*msg_type, *item, body),
            Frame::DataWithItem { item, body } => {
                let mut params = BytesMut::with_capacity(2 + body.len());
                params.put_u16_le(*item as u16);
                params.extend_from_slice(body);
                encode_data(MessageType::DataItem0, &params)
            }
            Frame::DataWithSeq { sequence, body } => {
                let mut params = BytesMut::with_capacity(2 + body.len());
                params.put_u16_le(*sequence);
                params.extend_from_slice(body);
                encode_data(MessageType::DataItem1, &params)
            }
            Frame::DataBare { msg_type, body } => encode_data(*msg_type, body),
        }
    }
}

// ─── Header Packing ──────────────────────────────────────────────────────────

fn pack_header(total_len: usize, msg_type: MessageType) -> Result<u16, ProtocolError> {
    let length_field: u16 = if msg_type.is_data_type() && total_len == MAX_DATA_FRAME_LEN {
        0
    } else {
        if total_len > MAX_NON_ESCAPED_LEN {
            return Err(ProtocolError::EncodeTooLong);
        }
        total_len as u16
    };
    Ok(length_field | ((msg_type as u16) << 13))
}

/// Given the first two header bytes of a frame, return the total frame
/// length (including the header) that the header declares.
///
/// Used by stream-oriented transports to find frame boundaries in a byte
/// stream before a full buffer is available to [`decode`].
pub fn frame_len_from_header(header_bytes: [u8; 2]) -> usize {
    unpack_header(u16::from_le_bytes(header_bytes)).1
}

fn unpack_header(word: u16) -> (MessageType, usize) {
    let msg_type = MessageType::from_bits((word >> 13) as u8);
    let declared = (word & 0x1FFF) as usize;
    let len = if msg_type.is_data_type() && declared == 0 {
        MAX_DATA_FRAME_LEN
    } else {
        declared
    };
    (msg_type, len)
}

// ─── Encode ───────────────────────────────────────────────────────────────────

/// Encode a control-family frame: header ‖ item code ‖ params.
///
/// # Panics
///
/// Panics if `msg_type` is not one of the control message types — this is a
/// caller contract violation, not a runtime/wire condition.
pub fn encode_control(
    msg_type: MessageType,
    item: ControlItemCode,
    params: &[u8],
) -> Result<Bytes, ProtocolError> {
    assert!(
        msg_type.is_control_type(),
        "encode_control requires a control message type"
    );
    let total_len = HEADER_LEN + 2 + params.len();
    let header = pack_header(total_len, msg_type)?;

    let mut buf = BytesMut::with_capacity(total_len);
    buf.put_u16_le(header);
    buf.put_u16_le(item as u16);
    buf.extend_from_slice(params);
    Ok(buf.freeze())
}

/// Encode a data-family frame: header ‖ params, where `params` already
/// contains whatever sub-header the frame type requires (item code for
/// `DataItem0`, sequence number for `DataItem1`, nothing for `DataItem2/3`).
///
/// # Panics
///
/// Panics if `msg_type` is not one of the data message types.
pub fn encode_data(msg_type: MessageType, params: &[u8]) -> Result<Bytes, ProtocolError> {
    assert!(
        msg_type.is_data_type(),
        "encode_data requires a data message type"
    );
    let total_len = HEADER_LEN + params.len();
    let header = pack_header(total_len, msg_type)?;

    let mut buf = BytesMut::with_capacity(total_len);
    buf.put_u16_le(header);
    buf.extend_from_slice(params);
    Ok(buf.freeze())
}

// ─── Decode ───────────────────────────────────────────────────────────────────

/// Decode one framed buffer (one datagram, or one length-delimited slice of
/// a reassembled control stream) into a typed [`Frame`].
pub fn decode(buf: &[u8]) -> Result<Frame, ProtocolError> {
    if buf.len() < HEADER_LEN {
        return Err(ProtocolError::Empty);
    }
    let header_word = u16::from_le_bytes([buf[0], buf[1]]);
    let (msg_type, declared_len) = unpack_header(header_word);
    if buf.len() != declared_len {
        return Err(ProtocolError::LengthMismatch);
    }

    match msg_type {
        MessageType::SetControlItem
        | MessageType::CurrentControlItem
        | MessageType::ControlItemRange
        | MessageType::Ack => {
            if buf.len() < 4 {
                return Err(ProtocolError::Truncated);
            }
            let item = ControlItemCode::from_u16(u16::from_le_bytes([buf[2], buf[3]]))
                .ok_or(ProtocolError::UnknownItemCode)?;
            Ok(Frame::Control {
                msg_type,
                item,
                body: Bytes::copy_from_slice(&buf[4..]),
            })
        }
        MessageType::DataItem0 => {
            if buf.len() < 4 {
                return Err(ProtocolError::Truncated);
            }
            let item = ControlItemCode::from_u16(u16::from_le_bytes([buf[2], buf[3]]))
                .ok_or(ProtocolError::UnknownItemCode)?;
            Ok(Frame::DataWithItem {
                item,
                body: Bytes::copy_from_slice(&buf[4..]),
            })
        }
        MessageType::DataItem1 => {
            if buf.len() < 4 {
                return Err(ProtocolError::Truncated);
            }
            let sequence = u16::from_le_bytes([buf[2], buf[3]]);
            Ok(Frame::DataWithSeq {
                sequence,
                body: Bytes::copy_from_slice(&buf[4..]),
            })
        }
        MessageType::DataItem2 | MessageType::DataItem3 => Ok(Frame::DataBare {
            msg_type,
            body: Bytes::copy_from_slice(&buf[2..]),
        }),
    }
}
