use std::collections::HashSet;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use maglog_core::protocol::strip_preamble;
use maglog_core::{DeviceId, Frame, FrameCode, encode_hex};
use maglog_link::{FrameLink, TransportError};

const POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Seconds-based wall clock reference received from the station.
#[derive(Debug, Clone, Copy)]
struct TimeRef {
    epoch: u64,
    anchored: Instant,
}

enum Incoming {
    Serial(Option<Vec<u8>>),
    Radio(Option<Vec<u8>>),
    Shutdown,
}

/// Base-node state machine: demultiplexes radio packets from the field
/// nodes onto the serial link, one frame per packet, codes translated 1:1.
///
/// The relay starts blind and only begins forwarding once the station has
/// announced itself with a start frame.
pub struct Relay<R: FrameLink, S: FrameLink, I: crate::Indicator> {
    radio: R,
    serial: S,
    indicator: I,
    time_ref: Option<TimeRef>,
    started: Instant,
    /// Devices currently mid file transfer on the serial side.
    relaying: HashSet<DeviceId>,
}

impl<R: FrameLink, S: FrameLink, I: crate::Indicator> Relay<R, S, I> {
    pub fn new(radio: R, serial: S, indicator: I) -> Self {
        Self {
            radio,
            serial,
            indicator,
            time_ref: None,
            started: Instant::now(),
            relaying: HashSet::new(),
        }
    }

    /// Milliseconds since the relay came up; used to disambiguate file names.
    fn uptime_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), TransportError> {
        info!("waiting for station start");
        if !self.wait_for_start(&cancel).await? {
            return Ok(());
        }
        info!("station connected, relaying");

        loop {
            let incoming = tokio::select! {
                _ = cancel.cancelled() => Incoming::Shutdown,
                frame = self.serial.recv(POLL_TIMEOUT) => Incoming::Serial(frame?),
                packet = self.radio.recv(POLL_TIMEOUT) => Incoming::Radio(packet?),
            };

            match incoming {
                Incoming::Shutdown => {
                    info!("relay shutting down");
                    return Ok(());
                }
                Incoming::Serial(Some(line)) => self.handle_serial_line(&line).await?,
                Incoming::Radio(Some(packet)) => self.handle_radio_packet(&packet).await?,
                Incoming::Serial(None) | Incoming::Radio(None) => {}
            }
        }
    }

    /// Consume serial input until the station's start frame shows up.
    /// Returns false when cancelled first.
    pub async fn wait_for_start(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<bool, TransportError> {
        loop {
            let incoming = tokio::select! {
                _ = cancel.cancelled() => Incoming::Shutdown,
                frame = self.serial.recv(POLL_TIMEOUT) => Incoming::Serial(frame?),
            };

            match incoming {
                Incoming::Shutdown => return Ok(false),
                Incoming::Serial(Some(line)) => {
                    let text = String::from_utf8_lossy(&line);
                    if text.trim() == FrameCode::Start.as_str() {
                        return Ok(true);
                    }
                    debug!(line = %text.trim(), "ignoring serial input before start");
                }
                _ => {}
            }
        }
    }

    pub async fn handle_serial_line(&mut self, line: &[u8]) -> Result<(), TransportError> {
        let text = match std::str::from_utf8(line) {
            Ok(text) => text.trim(),
            Err(_) => {
                self.indicator.failure("undecodable serial line");
                return Ok(());
            }
        };

        let mut parts = text.split_whitespace();
        match parts.next() {
            Some(code) if code == FrameCode::Time.as_str() => {
                let Some(epoch) = parts.next().and_then(|s| s.parse::<u64>().ok()) else {
                    self.indicator.failure("malformed time reference");
                    return Ok(());
                };
                self.time_ref = Some(TimeRef {
                    epoch,
                    anchored: Instant::now(),
                });
                info!(epoch, "time reference stored");
                self.serial
                    .send(FrameCode::Ok.as_str().as_bytes())
                    .await?;
                self.indicator.serial_activity();
            }
            // a repeated start while relaying is harmless
            Some(code) if code == FrameCode::Start.as_str() => {}
            _ => self.indicator.failure("unexpected serial command"),
        }
        Ok(())
    }

    pub async fn handle_radio_packet(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        self.indicator.radio_activity();

        let body = match strip_preamble(packet) {
            Ok(body) => body,
            Err(e) => {
                self.indicator.failure(&e.to_string());
                return Ok(());
            }
        };
        if body.len() < 4 {
            self.indicator.failure("short radio packet");
            return Ok(());
        }
        let code = match std::str::from_utf8(&body[..3])
            .ok()
            .and_then(|s| FrameCode::try_from(s).ok())
        {
            Some(code) => code,
            None => {
                self.indicator.failure("unknown radio code");
                return Ok(());
            }
        };
        if !body[3].is_ascii_graphic() {
            self.indicator.failure("bad device id");
            return Ok(());
        }
        let device = DeviceId(char::from(body[3]));
        let payload = &body[4..];

        match code {
            FrameCode::Log | FrameCode::Event => {
                self.emit(code, device, &encode_hex(payload)).await?;
            }
            FrameCode::File => {
                let Ok(name) = std::str::from_utf8(payload) else {
                    self.indicator.failure("undecodable file name");
                    return Ok(());
                };
                // a second FIL for a device still mid transfer would leak a
                // file handle on the station; close the dangling one first
                if !self.relaying.insert(device) {
                    self.emit(FrameCode::Eof, device, "").await?;
                }
                let filename = format!("{}-{}-{}.txt", device, self.uptime_ms(), name);
                self.emit(FrameCode::File, device, &filename).await?;
            }
            FrameCode::Line => {
                let Ok(text) = std::str::from_utf8(payload) else {
                    self.indicator.failure("undecodable file line");
                    return Ok(());
                };
                self.emit(FrameCode::Line, device, text).await?;
            }
            FrameCode::Eof => {
                self.relaying.remove(&device);
                self.emit(FrameCode::Eof, device, "").await?;
            }
            FrameCode::Start | FrameCode::Time | FrameCode::Ok => {
                self.indicator.failure("unexpected code over radio");
            }
        }
        Ok(())
    }

    async fn emit(
        &mut self,
        code: FrameCode,
        device: DeviceId,
        payload: &str,
    ) -> Result<(), TransportError> {
        let frame = Frame::new(code, device, payload);
        self.serial.send(frame.to_line().as_bytes()).await?;
        self.indicator.serial_activity();
        Ok(())
    }

    /// Wall-clock seconds derived from the stored reference, if any.
    pub fn current_epoch(&self) -> Option<u64> {
        self.time_ref
            .map(|t| t.epoch + t.anchored.elapsed().as_secs())
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }
}
