mod error;
mod frame;
mod record;

pub use error::{ParseResult, ProtocolError};
pub use frame::{Frame, FrameCode};
pub use record::{Fixed, SensorRecord, checksum};

/// Every frame on the serial side ends with this terminator.
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Fixed size of the binary sensor record.
pub const RECORD_SIZE: usize = 20;

/// Offset of the trailing checksum inside a sensor record.
pub const RECORD_CHECKSUM_OFFSET: usize = 18;

/// Link-layer marker carried in front of every over-the-air radio packet.
pub const RADIO_PREAMBLE: [u8; 3] = [0x01, 0x00, 0x01];

/// Scale of the fractional half of a fixed-point reading.
pub const FIXED_POINT_SCALE: u32 = 1_000_000;

/// Hex-encode a byte slice into lowercase ASCII, two digits per byte.
pub fn encode_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        // infallible for String
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Check and strip the link-layer preamble of an over-the-air packet.
pub fn strip_preamble(packet: &[u8]) -> ParseResult<&[u8]> {
    if packet.len() < RADIO_PREAMBLE.len() {
        return Err(ProtocolError::Malformed(packet.len()));
    }
    let (head, rest) = packet.split_at(RADIO_PREAMBLE.len());
    if head != RADIO_PREAMBLE {
        return Err(ProtocolError::InvalidPreamble([head[0], head[1], head[2]]));
    }
    Ok(rest)
}

/// Decode a strict hex string: even length, hex digits only.
pub fn decode_hex(text: &str) -> ParseResult<Vec<u8>> {
    if !text.is_ascii() || text.len() % 2 != 0 {
        return Err(ProtocolError::InvalidHex(text.len()));
    }
    (0..text.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&text[i..i + 2], 16).map_err(|_| ProtocolError::InvalidHex(i))
        })
        .collect()
}
