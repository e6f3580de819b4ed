//! Property-based tests for the NetSDR frame codec and sample unpacker.

use netsdr_protocol::frame::{encode_control, encode_data, ControlItemCode, MessageType};
use netsdr_protocol::{frame, sample, ProtocolError};
use proptest::prelude::*;

const CONTROL_TYPES: [MessageType; 4] = [
    MessageType::SetControlItem,
    MessageType::CurrentControlItem,
    MessageType::ControlItemRange,
    MessageType::Ack,
];

const DATA_BARE_TYPES: [MessageType; 2] = [MessageType::DataItem2, MessageType::DataItem3];

const ITEM_CODES: [ControlItemCode; 6] = [
    ControlItemCode::None,
    ControlItemCode::ReceiverState,
    ControlItemCode::ReceiverFrequency,
    ControlItemCode::RFFilter,
    ControlItemCode::ADModes,
    ControlItemCode::IQOutputDataSampleRate,
];

fn control_type() -> impl Strategy<Value = MessageType> {
    (0..CONTROL_TYPES.len()).prop_map(|i| CONTROL_TYPES[i])
}

fn data_bare_type() -> impl Strategy<Value = MessageType> {
    (0..DATA_BARE_TYPES.len()).prop_map(|i| DATA_BARE_TYPES[i])
}

fn item_code() -> impl Strategy<Value = ControlItemCode> {
    (0..ITEM_CODES.len()).prop_map(|i| ITEM_CODES[i])
}

fn small_body() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

proptest! {
    // Invariant 1 + 2: encode/decode round-trip, header length field consistency.
    #[test]
    fn control_roundtrip(ty in control_type(), item in item_code(), body in small_body()) {
        let encoded = encode_control(ty, item, &body).unwrap();

        let header = u16::from_le_bytes([encoded[0], encoded[1]]);
        prop_assert_eq!((header & 0x1FFF) as usize, encoded.len());

        let frame = frame::decode(&encoded).unwrap();
        prop_assert_eq!(frame.msg_type(), ty);
        prop_assert_eq!(frame.item_code(), item);
        prop_assert_eq!(frame.sequence_number(), 0);
        prop_assert_eq!(frame.body().as_ref(), body.as_slice());
    }

    #[test]
    fn data_bare_roundtrip(ty in data_bare_type(), body in small_body()) {
        let encoded = encode_data(ty, &body).unwrap();

        let header = u16::from_le_bytes([encoded[0], encoded[1]]);
        let declared = header & 0x1FFF;
        if encoded.len() == 8194 {
            prop_assert_eq!(declared, 0);
        } else {
            prop_assert_eq!(declared as usize, encoded.len());
        }

        let frame = frame::decode(&encoded).unwrap();
        prop_assert_eq!(frame.msg_type(), ty);
        prop_assert_eq!(frame.item_code(), ControlItemCode::None);
        prop_assert_eq!(frame.sequence_number(), 0);
        prop_assert_eq!(frame.body().as_ref(), body.as_slice());
    }

    #[test]
    fn data_item1_roundtrip(seq in any::<u16>(), body in small_body()) {
        let mut params = seq.to_le_bytes().to_vec();
        params.extend_from_slice(&body);
        let encoded = encode_data(MessageType::DataItem1, &params).unwrap();

        let frame = frame::decode(&encoded).unwrap();
        prop_assert_eq!(frame.sequence_number(), seq);
        prop_assert_eq!(frame.item_code(), ControlItemCode::None);
        prop_assert_eq!(frame.body().as_ref(), body.as_slice());
    }

    // Invariant 3: truncating or padding an encoding by one byte breaks decode.
    #[test]
    fn decode_rejects_length_mismatch(ty in control_type(), item in item_code(), body in small_body()) {
        let encoded = encode_control(ty, item, &body).unwrap();

        let mut truncated = encoded.to_vec();
        truncated.pop();
        prop_assert_eq!(frame::decode(&truncated).unwrap_err(), ProtocolError::LengthMismatch);

        let mut padded = encoded.to_vec();
        padded.push(0);
        prop_assert_eq!(frame::decode(&padded).unwrap_err(), ProtocolError::LengthMismatch);
    }

    // Invariant 4: any item-code value outside the closed set fails decode.
    #[test]
    fn decode_rejects_unknown_item_code(ty in control_type(), code in any::<u16>(), body in small_body()) {
        prop_assume!(ControlItemCode::from_u16(code).is_none());

        let header = (encode_len(&body) as u16) | ((ty as u16) << 13);
        let mut buf = header.to_le_bytes().to_vec();
        buf.extend_from_slice(&code.to_le_bytes());
        buf.extend_from_slice(&body);

        prop_assert_eq!(frame::decode(&buf).unwrap_err(), ProtocolError::UnknownItemCode);
    }

    // Invariant 7: sample width bounds.
    #[test]
    fn sample_width_bounds_reject_out_of_range(width in any::<u8>(), body in small_body()) {
        let result = sample::samples(width, &body);
        if (1..=32).contains(&width) {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result.unwrap_err(), ProtocolError::InvalidSampleWidth);
        }
    }

    // Invariant 5: sample iterator completeness for standard widths.
    #[test]
    fn sample_completeness(width in prop_oneof![Just(8u8), Just(16), Just(24), Just(32)], body in small_body()) {
        let bytes_per_sample = (width as usize).div_ceil(8);
        let count = sample::samples(width, &body).unwrap().count();
        prop_assert_eq!(count, body.len() / bytes_per_sample);
    }

    // Restartability: iterating twice from the same (width, body) yields the same sequence.
    #[test]
    fn sample_iteration_is_restartable(width in 1u8..=32, body in small_body()) {
        let first: Vec<i32> = sample::samples(width, &body).unwrap().collect();
        let second: Vec<i32> = sample::samples(width, &body).unwrap().collect();
        prop_assert_eq!(first, second);
    }
}

fn encode_len(body: &[u8]) -> usize {
    4 + body.len()
}
