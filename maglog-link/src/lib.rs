use std::time::Duration;

use async_trait::async_trait;

pub mod error;
pub mod framing;
pub mod mock;
pub mod radio;
pub mod serial;

pub use error::TransportError;
pub use framing::{LineFramer, PacketFramer};
pub use mock::MockLink;
pub use radio::{RadioLink, RadioSettings};
pub use serial::SerialLink;

/// A channel that carries whole protocol frames.
///
/// Serial links frame with a CRLF terminator, radio links with a packet
/// boundary; the payload reaching the caller never includes the framing.
/// Every I/O call verifies the underlying channel is open and lazily reopens
/// it, so a single transient disconnect never surfaces as an error. Only an
/// exhausted reconnect does.
#[async_trait]
pub trait FrameLink: Send {
    /// Send one frame.
    async fn send(&mut self, frame: &[u8]) -> Result<(), TransportError>;

    /// Wait up to `timeout` for a complete frame. `Ok(None)` on timeout.
    async fn recv(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError>;

    /// Reopen the underlying channel and drop anything buffered.
    async fn reset(&mut self) -> Result<(), TransportError>;

    /// Release the underlying channel.
    async fn close(&mut self);
}
