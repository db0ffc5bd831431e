use std::fmt;

use super::error::{ParseResult, ProtocolError};
use crate::DeviceId;

// frame structure : code(3) + device(1) + payload, CRLF terminated

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameCode {
    /// Handshake opener from the station.
    Start,
    /// Time reference, `TIM <unix seconds>`.
    Time,
    /// Periodic summary record, hex payload.
    Log,
    /// Event notification record, hex payload.
    Event,
    /// Start of a bulk file transfer, payload names the file.
    File,
    /// One text line of an open file transfer.
    Line,
    /// End of a bulk file transfer.
    Eof,
    /// Positive acknowledgement.
    Ok,
}

impl FrameCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            FrameCode::Start => "STA",
            FrameCode::Time => "TIM",
            FrameCode::Log => "LOG",
            FrameCode::Event => "EVN",
            FrameCode::File => "FIL",
            FrameCode::Line => "LIN",
            FrameCode::Eof => "EOF",
            FrameCode::Ok => "OKE",
        }
    }
}

impl TryFrom<&str> for FrameCode {
    type Error = ProtocolError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "STA" => Ok(FrameCode::Start),
            "TIM" => Ok(FrameCode::Time),
            "LOG" => Ok(FrameCode::Log),
            "EVN" => Ok(FrameCode::Event),
            "FIL" => Ok(FrameCode::File),
            "LIN" => Ok(FrameCode::Line),
            "EOF" => Ok(FrameCode::Eof),
            "OKE" => Ok(FrameCode::Ok),
            other => Err(ProtocolError::UnknownCode(other.to_owned())),
        }
    }
}

impl fmt::Display for FrameCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line-oriented protocol message, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub code: FrameCode,
    pub device: DeviceId,
    pub payload: String,
}

impl Frame {
    pub fn new(code: FrameCode, device: DeviceId, payload: impl Into<String>) -> Self {
        Self {
            code,
            device,
            payload: payload.into(),
        }
    }

    /// Parse a received line. Lines shorter than code + device are malformed;
    /// the code must come from the known set.
    pub fn parse(line: &str) -> ParseResult<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if !line.is_ascii() || line.len() < 4 {
            return Err(ProtocolError::Malformed(line.len()));
        }

        let code = FrameCode::try_from(&line[0..3])?;
        let device = line[3..4]
            .chars()
            .next()
            .map(DeviceId)
            .ok_or(ProtocolError::Malformed(line.len()))?;

        Ok(Self {
            code,
            device,
            payload: line[4..].to_owned(),
        })
    }

    /// Render the frame as a wire line, terminator excluded.
    pub fn to_line(&self) -> String {
        format!("{}{}{}", self.code.as_str(), self.device.0, self.payload)
    }
}
