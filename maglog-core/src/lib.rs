use std::fmt;

use serde::{Deserialize, Serialize};

pub mod protocol;

pub use protocol::{
    Frame, FrameCode, ParseResult, ProtocolError, SensorRecord, decode_hex, encode_hex,
};

/// Single-character identifier of a field sensor node.
///
/// The wire protocol reserves exactly one byte for it, directly after the
/// frame code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub char);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<char> for DeviceId {
    fn from(value: char) -> Self {
        Self(value)
    }
}
