/// Upper bound on an unterminated reassembly buffer. Anything larger is
/// line noise; dropping it lets the next terminator resynchronize the stream.
pub const MAX_LINE_BYTES: usize = 512;

/// Reassembles CRLF-terminated lines from arbitrary read chunks.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        if self.buf.len() > MAX_LINE_BYTES && !contains_terminator(&self.buf) {
            self.buf.clear();
        }
    }

    /// Pop the next complete line, terminator stripped.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        let pos = self.buf.windows(2).position(|w| w == b"\r\n")?;
        let line: Vec<u8> = self.buf.drain(..pos).collect();
        self.buf.drain(..2);
        Some(line)
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

fn contains_terminator(buf: &[u8]) -> bool {
    buf.windows(2).any(|w| w == b"\r\n")
}

/// Reassembles length-prefixed packets from arbitrary read chunks.
///
/// The wire format is one length byte followed by that many payload bytes.
/// A length of zero or above the configured maximum marks a corrupt stream;
/// one byte is skipped at a time until a plausible prefix lines up again.
#[derive(Debug)]
pub struct PacketFramer {
    buf: Vec<u8>,
    max_len: usize,
}

impl PacketFramer {
    pub fn new(max_len: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_len,
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete packet, length prefix stripped.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            let len = usize::from(*self.buf.first()?);
            if len == 0 || len > self.max_len {
                self.buf.remove(0);
                continue;
            }
            if self.buf.len() < 1 + len {
                return None;
            }
            self.buf.remove(0);
            let packet: Vec<u8> = self.buf.drain(..len).collect();
            return Some(packet);
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
