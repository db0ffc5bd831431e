use maglog_core::protocol::{RADIO_PREAMBLE, RECORD_SIZE, checksum, strip_preamble};
use maglog_core::{
    DeviceId, Frame, FrameCode, ProtocolError, SensorRecord, decode_hex, encode_hex,
};

#[test]
fn record_round_trip() {
    let record = SensorRecord::new(1_800_000, 42, 23.5, 118.25);
    let bytes = record.encode();

    assert_eq!(bytes.len(), RECORD_SIZE);
    let decoded = SensorRecord::decode(&bytes).unwrap();
    assert_eq!(decoded, record);
}

#[test]
fn checksum_is_additive_sum_of_leading_bytes() {
    let record = SensorRecord::new(123_456, 7, 19.0, 0.0);
    let bytes = record.encode();

    let expected: u32 = bytes[..18].iter().map(|&b| u32::from(b)).sum();
    let stored = u16::from_le_bytes([bytes[18], bytes[19]]);
    assert_eq!(stored, (expected % 65536) as u16);
    assert_eq!(checksum(&bytes[..18]), stored);
}

#[test]
fn fixed_point_reconstructs_exactly() {
    let record = SensorRecord::new(0, 0, 23.5, 0.0);
    assert_eq!(record.temperature.int, 23);
    assert_eq!(record.temperature.frac, 500_000);

    let bytes = record.encode();
    let decoded = SensorRecord::decode(&bytes).unwrap();
    assert!((decoded.temperature.value() - 23.5).abs() < 1e-6);
}

#[test]
fn negative_temperature_survives_the_wire() {
    let record = SensorRecord::new(500, 3, -4.5, 12.0);
    let decoded = SensorRecord::decode(&record.encode()).unwrap();
    assert!((decoded.temperature.value() - (-4.5)).abs() < 1e-6);
}

#[test]
fn decode_rejects_wrong_size() {
    let err = SensorRecord::decode(&[0u8; 19]).unwrap_err();
    assert_eq!(
        err,
        ProtocolError::WrongSize {
            expected: RECORD_SIZE,
            got: 19
        }
    );
}

#[test]
fn decode_reports_checksum_mismatch_but_fields_stay_readable() {
    let record = SensorRecord::new(777, 9, 21.25, 3.0);
    let mut bytes = record.encode();
    bytes[4] ^= 0xFF;

    match SensorRecord::decode(&bytes) {
        Err(ProtocolError::ChecksumMismatch { computed, stored }) => {
            assert_ne!(computed, stored);
        }
        other => panic!("expected checksum mismatch, got {other:?}"),
    }

    // the lenient path still yields the transmitted fields
    let lenient = SensorRecord::decode_unverified(&bytes).unwrap();
    assert_eq!(lenient.ticks, 777);
}

#[test]
fn frame_parse_splits_code_device_payload() {
    let record = SensorRecord::new(1000, 1, 20.0, 5.5);
    let line = format!("LOGA{}", encode_hex(&record.encode()));

    let frame = Frame::parse(&line).unwrap();
    assert_eq!(frame.code, FrameCode::Log);
    assert_eq!(frame.device, DeviceId('A'));
    assert_eq!(frame.payload.len(), RECORD_SIZE * 2);
}

#[test]
fn frame_parse_tolerates_terminator() {
    let frame = Frame::parse("EOFB\r\n").unwrap();
    assert_eq!(frame.code, FrameCode::Eof);
    assert_eq!(frame.device, DeviceId('B'));
    assert!(frame.payload.is_empty());
}

#[test]
fn short_frame_is_malformed() {
    assert_eq!(Frame::parse("XYZ").unwrap_err(), ProtocolError::Malformed(3));
}

#[test]
fn unknown_code_is_reported() {
    match Frame::parse("QQQA") {
        Err(ProtocolError::UnknownCode(code)) => assert_eq!(code, "QQQ"),
        other => panic!("expected unknown code, got {other:?}"),
    }
}

#[test]
fn frame_round_trips_through_to_line() {
    let frame = Frame::new(FrameCode::Line, DeviceId('C'), "1000 4 21.5 0.0");
    assert_eq!(Frame::parse(&frame.to_line()).unwrap(), frame);
}

#[test]
fn preamble_is_validated_and_stripped() {
    let mut packet = RADIO_PREAMBLE.to_vec();
    packet.extend_from_slice(b"EOFA");
    assert_eq!(strip_preamble(&packet).unwrap(), b"EOFA");

    let mut bad = packet.clone();
    bad[0] = 0x7F;
    assert!(matches!(
        strip_preamble(&bad),
        Err(ProtocolError::InvalidPreamble(_))
    ));

    assert!(strip_preamble(&packet[..2]).is_err());
}

#[test]
fn hex_rejects_odd_length_and_bad_digits() {
    assert!(decode_hex("abc").is_err());
    assert!(decode_hex("zz").is_err());
    assert_eq!(decode_hex("00ff10").unwrap(), vec![0x00, 0xff, 0x10]);
    assert_eq!(encode_hex(&[0x00, 0xff, 0x10]), "00ff10");
}
