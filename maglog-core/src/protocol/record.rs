use serde::{Deserialize, Serialize};

use super::error::{ParseResult, ProtocolError};
use super::{FIXED_POINT_SCALE, RECORD_CHECKSUM_OFFSET, RECORD_SIZE};

// record layout : ticks(4) + count(2) + temp(2+4) + light(2+4) + checksum(2),
// little-endian throughout

/// Additive checksum over a byte slice, truncated to 16 bits.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes.iter().map(|&b| u32::from(b)).sum::<u32>() as u16
}

/// A fixed-point reading split into an integer and a millionths part.
///
/// The two halves travel as separate fields so the sensor node never has to
/// serialize a float; the value is reconstructed as `int + frac / 1_000_000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixed {
    pub int: i16,
    pub frac: u32,
}

impl Fixed {
    pub fn value(self) -> f64 {
        f64::from(self.int) + f64::from(self.frac) / f64::from(FIXED_POINT_SCALE)
    }

    pub fn from_value(value: f64) -> Self {
        let mut int = value.floor() as i16;
        let mut frac = ((value - f64::from(int)) * f64::from(FIXED_POINT_SCALE)).round() as u32;
        if frac >= FIXED_POINT_SCALE {
            int += 1;
            frac = 0;
        }
        Self { int, frac }
    }
}

/// The fixed 20-byte telemetry record carried by LOG and EVN frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorRecord {
    /// Device uptime in milliseconds.
    pub ticks: u32,
    /// Cumulative sensor-trigger count.
    pub count: u16,
    pub temperature: Fixed,
    pub light: Fixed,
}

impl SensorRecord {
    pub fn new(ticks: u32, count: u16, temperature: f64, light: f64) -> Self {
        Self {
            ticks,
            count,
            temperature: Fixed::from_value(temperature),
            light: Fixed::from_value(light),
        }
    }

    /// Strict decode: exact size and a matching checksum.
    pub fn decode(bytes: &[u8]) -> ParseResult<Self> {
        let record = Self::decode_unverified(bytes)?;
        let computed = checksum(&bytes[..RECORD_CHECKSUM_OFFSET]);
        let stored = u16::from_le_bytes([bytes[18], bytes[19]]);
        if computed != stored {
            return Err(ProtocolError::ChecksumMismatch { computed, stored });
        }
        Ok(record)
    }

    /// Decode the fields without rejecting a bad checksum. Receivers that
    /// keep mismatched records use this after logging the mismatch.
    pub fn decode_unverified(bytes: &[u8]) -> ParseResult<Self> {
        if bytes.len() != RECORD_SIZE {
            return Err(ProtocolError::WrongSize {
                expected: RECORD_SIZE,
                got: bytes.len(),
            });
        }

        Ok(Self {
            ticks: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            count: u16::from_le_bytes([bytes[4], bytes[5]]),
            temperature: Fixed {
                int: i16::from_le_bytes([bytes[6], bytes[7]]),
                frac: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            },
            light: Fixed {
                int: i16::from_le_bytes([bytes[12], bytes[13]]),
                frac: u32::from_le_bytes([bytes[14], bytes[15], bytes[16], bytes[17]]),
            },
        })
    }

    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];

        bytes[0..4].copy_from_slice(&self.ticks.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.count.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.temperature.int.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.temperature.frac.to_le_bytes());
        bytes[12..14].copy_from_slice(&self.light.int.to_le_bytes());
        bytes[14..18].copy_from_slice(&self.light.frac.to_le_bytes());

        let cs = checksum(&bytes[..RECORD_CHECKSUM_OFFSET]);
        bytes[18..20].copy_from_slice(&cs.to_le_bytes());

        bytes
    }
}
