use thiserror::Error;

pub type ParseResult<T> = Result<T, ProtocolError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("malformed frame of {0} bytes")]
    Malformed(usize),
    #[error("unknown frame code {0:?}")]
    UnknownCode(String),
    #[error("invalid hex payload at offset {0}")]
    InvalidHex(usize),
    #[error("record size mismatch: expected {expected}, got {got}")]
    WrongSize { expected: usize, got: usize },
    #[error("checksum mismatch: computed {computed:#06x}, stored {stored:#06x}")]
    ChecksumMismatch { computed: u16, stored: u16 },
    #[error("invalid radio preamble {0:02x?}")]
    InvalidPreamble([u8; 3]),
}
