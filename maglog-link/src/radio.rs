use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::Instant;
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::framing::PacketFramer;
use crate::FrameLink;

const OPEN_RETRIES: u32 = 3;
const OPEN_BACKOFF: Duration = Duration::from_millis(500);
const READ_CHUNK: usize = 256;

/// Tag byte of the channel-select packet the modem expects after open.
const MODEM_CHANNEL_TAG: u8 = 0xFF;

/// Link configuration for the packet radio modem.
#[derive(Debug, Clone)]
pub struct RadioSettings {
    pub device: String,
    pub baud: u32,
    pub channel: u8,
    /// Largest over-the-air packet the radio accepts.
    pub max_packet: usize,
    /// Packets buffered before the oldest is dropped.
    pub queue_depth: usize,
}

impl RadioSettings {
    pub fn new(device: impl Into<String>, baud: u32, channel: u8) -> Self {
        Self {
            device: device.into(),
            baud,
            channel,
            max_packet: 32,
            queue_depth: 5,
        }
    }
}

/// Short-range packet radio attached through a serial modem.
///
/// Host and modem exchange packets behind a one-byte length prefix; each
/// received packet is one over-the-air radio frame. The receive queue is
/// bounded the way the radio itself is: once full, the oldest packet is
/// dropped.
pub struct RadioLink {
    settings: RadioSettings,
    port: Option<SerialStream>,
    framer: PacketFramer,
    queue: VecDeque<Vec<u8>>,
}

impl RadioLink {
    pub fn new(settings: RadioSettings) -> Self {
        let framer = PacketFramer::new(settings.max_packet);
        Self {
            settings,
            port: None,
            framer,
            queue: VecDeque::new(),
        }
    }

    async fn open_port(&mut self) -> Result<(), TransportError> {
        let mut attempt = 0;
        loop {
            match tokio_serial::new(&self.settings.device, self.settings.baud).open_native_async() {
                Ok(mut port) => {
                    let _ = port.clear(ClearBuffer::All);
                    // the modem selects its channel from one config packet
                    let config = [2u8, MODEM_CHANNEL_TAG, self.settings.channel];
                    port.write_all(&config).await.map_err(TransportError::Io)?;
                    self.framer.clear();
                    self.port = Some(port);
                    return Ok(());
                }
                Err(source) => {
                    attempt += 1;
                    if attempt >= OPEN_RETRIES {
                        return Err(TransportError::Open {
                            path: self.settings.device.clone(),
                            source,
                        });
                    }
                    warn!(
                        device = %self.settings.device,
                        error = %source,
                        attempt,
                        "radio modem open failed, retrying"
                    );
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

    fn drain_framer(&mut self) {
        while let Some(packet) = self.framer.next_frame() {
            self.queue.push_back(packet);
            if self.queue.len() > self.settings.queue_depth {
                self.queue.pop_front();
                debug!("radio receive queue full, oldest packet dropped");
            }
        }
    }
}

#[async_trait]
impl FrameLink for RadioLink {
    async fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        if frame.len() > self.settings.max_packet {
            return Err(TransportError::FrameTooLong {
                len: frame.len(),
                max: self.settings.max_packet,
            });
        }
        self.ensure_open().await?;

        let mut wire = Vec::with_capacity(frame.len() + 1);
        wire.push(frame.len() as u8);
        wire.extend_from_slice(frame);

        let write = async {
            let Some(port) = self.port.as_mut() else {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotConnected,
                    "radio modem not open",
                ));
            };
            port.write_all(&wire).await?;
            port.flush().await
        };

        if let Err(e) = write.await {
            warn!(device = %self.settings.device, error = %e, "radio write failed, reopening");
            self.reset().await?;
            let Some(port) = self.port.as_mut() else {
                return Err(TransportError::Closed);
            };
            port.write_all(&wire).await.map_err(TransportError::Io)?;
            port.flush().await.map_err(TransportError::Io)?;
        }
        Ok(())
    }

    async fn recv(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            self.drain_framer();
            if let Some(packet) = self.queue.pop_front() {
                return Ok(Some(packet));
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
                    warn!(device = %self.settings.device, "radio modem closed, reopening");
                    self.reset().await?;
                }
                Ok(Ok(n)) => self.framer.extend(&chunk[..n]),
                Ok(Err(e)) => {
                    warn!(device = %self.settings.device, error = %e, "radio read failed, reopening");
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
        self.queue.clear();
    }
}
