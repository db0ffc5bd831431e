use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::Instant;
use tokio_serial::{
    ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream,
    StopBits,
};
use tracing::warn;

use crate::error::TransportError;
use crate::framing::LineFramer;
use crate::FrameLink;

const OPEN_RETRIES: u32 = 3;
const OPEN_BACKOFF: Duration = Duration::from_millis(500);
const READ_CHUNK: usize = 256;

/// Wired serial channel carrying CRLF-terminated frames. 8N1, no flow
/// control. The port is opened lazily and reopened whenever an I/O call
/// finds it dead.
pub struct SerialLink {
    path: String,
    baud: u32,
    port: Option<SerialStream>,
    framer: LineFramer,
}

impl SerialLink {
    pub fn new(path: impl Into<String>, baud: u32) -> Self {
        Self {
            path: path.into(),
            baud,
            port: None,
            framer: LineFramer::new(),
        }
    }

    async fn open_port(&mut self) -> Result<(), TransportError> {
        let mut attempt = 0;
        loop {
            let opened = tokio_serial::new(&self.path, self.baud)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .open_native_async();

            match opened {
                Ok(port) => {
                    let _ = port.clear(ClearBuffer::All);
                    self.framer.clear();
                    self.port = Some(port);
                    return Ok(());
                }
                Err(source) => {
                    attempt += 1;
                    if attempt >= OPEN_RETRIES {
                        return Err(TransportError::Open {
                            path: self.path.clone(),
                            source,
                        });
                    }
                    warn!(path = %self.path, error = %source, attempt, "serial open failed, retrying");
                    tokio::time::sleep(OPEN_BACKOFF).await;
                }
            }
        }
    }

    async fn ensure_open(&mut self) -> Result<(), TransportError> {
        if self.port.is_none() {
            self.open_port().await?;
        }
        Ok(())
    }

    async fn write_wire(port: Option<&mut SerialStream>, wire: &[u8]) -> std::io::Result<()> {
        let Some(port) = port else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "serial port not open",
            ));
        };
        port.write_all(wire).await?;
        port.flush().await
    }
}

#[async_trait]
impl FrameLink for SerialLink {
    async fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.ensure_open().await?;

        let mut wire = Vec::with_capacity(frame.len() + 2);
        wire.extend_from_slice(frame);
        wire.extend_from_slice(b"\r\n");

        if let Err(e) = Self::write_wire(self.port.as_mut(), &wire).await {
            warn!(path = %self.path, error = %e, "serial write failed, reopening");
            self.reset().await?;
            Self::write_wire(self.port.as_mut(), &wire)
                .await
                .map_err(TransportError::Io)?;
        }
        Ok(())
    }

    async fn recv(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(line) = self.framer.next_frame() {
                return Ok(Some(line));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            self.ensure_open().await?;

            let mut chunk = [0u8; READ_CHUNK];
            let Some(port) = self.port.as_mut() else {
                continue;
            };
            match tokio::time::timeout(deadline - now, port.read(&mut chunk)).await {
                Err(_) => return Ok(None),
                Ok(Ok(0)) => {
                    warn!(path = %self.path, "serial channel closed, reopening");
                    self.reset().await?;
                }
                Ok(Ok(n)) => self.framer.extend(&chunk[..n]),
                Ok(Err(e)) => {
                    warn!(path = %self.path, error = %e, "serial read failed, reopening");
                    self.reset().await?;
                }
            }
        }
    }

    async fn reset(&mut self) -> Result<(), TransportError> {
        self.port = None;
        self.open_port().await
    }

    async fn close(&mut self) {
        self.port = None;
        self.framer.clear();
    }
}
