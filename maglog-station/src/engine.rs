use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use maglog_core::{Frame, FrameCode, ProtocolError, SensorRecord, decode_hex};
use maglog_link::FrameLink;

use crate::error::FatalError;
use crate::logger::{self, EventLogger};

/// How long one read waits before the loop re-checks the day boundary.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Settle time after the handshake frames.
const SETTLE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Start,
    Wait,
}

enum Step {
    Frame(Option<Vec<u8>>),
    Shutdown,
}

/// The station-side protocol state machine: handshake, time exchange and
/// the frame dispatch loop feeding the logger.
pub struct Engine<T: FrameLink> {
    link: T,
    logger: EventLogger,
    state: EngineState,
}

impl<T: FrameLink> Engine<T> {
    pub fn new(link: T, logger: EventLogger) -> Self {
        Self {
            link,
            logger,
            state: EngineState::Start,
        }
    }

    pub fn logger(&self) -> &EventLogger {
        &self.logger
    }

    /// Announce the station and give the bridge a moment to settle.
    pub async fn init(&mut self) -> Result<(), FatalError> {
        if self.state != EngineState::Start {
            warn!("start already sent");
        }
        info!("sending start");
        self.link
            .send(FrameCode::Start.as_str().as_bytes())
            .await?;
        tokio::time::sleep(SETTLE_DELAY).await;
        self.state = EngineState::Wait;
        Ok(())
    }

    /// Push the wall clock to the bridge and wait for its acknowledgement.
    /// `Ok(false)` is a protocol timeout, distinct from a link failure.
    pub async fn send_time(&mut self, timeout: Duration) -> Result<bool, FatalError> {
        let epoch = jiff::Timestamp::now().as_second();
        info!(epoch, "sending time reference");
        let line = format!("{} {}", FrameCode::Time.as_str(), epoch);
        self.link.send(line.as_bytes()).await?;
        tokio::time::sleep(SETTLE_DELAY).await;

        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                warn!("no acknowledgement before the timeout");
                return Ok(false);
            }
            let wait = READ_TIMEOUT.min(deadline - now);
            let Some(line) = self.link.recv(wait).await? else {
                continue;
            };
            let text = String::from_utf8_lossy(&line);
            let text = text.trim();
            if text == FrameCode::Ok.as_str() {
                info!("time acknowledged");
                return Ok(true);
            }
            warn!(line = %text, "unexpected reply while waiting for acknowledgement");
        }
    }

    /// Receive loop. Runs until cancelled (best-effort flush, clean return)
    /// or until the link or local storage fails for good.
    pub async fn listen(&mut self, cancel: CancellationToken) -> Result<(), FatalError> {
        if self.state != EngineState::Wait {
            warn!("listening without a start handshake");
        }
        info!("waiting for data");

        loop {
            self.logger.check_day().await?;

            let step = tokio::select! {
                _ = cancel.cancelled() => Step::Shutdown,
                frame = self.link.recv(READ_TIMEOUT) => Step::Frame(frame?),
            };

            match step {
                Step::Shutdown => {
                    info!("interrupt received, saving state");
                    self.logger.save().await;
                    return Ok(());
                }
                Step::Frame(Some(line)) => {
                    let text = String::from_utf8_lossy(&line).into_owned();
                    self.handle_line(text.trim())?;
                }
                Step::Frame(None) => {}
            }
        }
    }

    /// Dispatch one received line. Protocol faults are logged and survived;
    /// only storage failures propagate.
    pub fn handle_line(&mut self, line: &str) -> Result<(), FatalError> {
        let frame = match Frame::parse(line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(line, error = %e, "dropping frame");
                return Ok(());
            }
        };
        debug!(code = %frame.code, device = %frame.device, payload = %frame.payload, "received frame");

        match frame.code {
            FrameCode::Log | FrameCode::Event => self.handle_record(&frame)?,
            FrameCode::File => self.logger.start_file(frame.device, &frame.payload)?,
            FrameCode::Line => self.logger.append_line(frame.device, &frame.payload)?,
            FrameCode::Eof => self.logger.finish_file(frame.device),
            other => warn!(code = %other, "unexpected frame code"),
        }
        Ok(())
    }

    fn handle_record(&mut self, frame: &Frame) -> Result<(), FatalError> {
        let data = match decode_hex(&frame.payload) {
            Ok(data) => data,
            Err(e) => {
                warn!(device = %frame.device, error = %e, "bad hex payload");
                return Ok(());
            }
        };

        let record = match SensorRecord::decode(&data) {
            Ok(record) => record,
            Err(ProtocolError::ChecksumMismatch { computed, stored }) => {
                // mismatched records are logged but still ingested
                warn!(device = %frame.device, computed, stored, "record checksum mismatch");
                match SensorRecord::decode_unverified(&data) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!(device = %frame.device, error = %e, "undecodable record");
                        return Ok(());
                    }
                }
            }
            Err(e) => {
                warn!(device = %frame.device, error = %e, "undecodable record");
                return Ok(());
            }
        };

        let received = logger::now_seconds();
        debug!(
            device = %frame.device,
            ticks = record.ticks,
            count = record.count,
            temperature = record.temperature.value(),
            light = record.light.value(),
            "record received"
        );

        match frame.code {
            FrameCode::Log => self.logger.summary(frame.device, received, &record)?,
            _ => self.logger.event(frame.device, received, &record)?,
        }
        Ok(())
    }
}
