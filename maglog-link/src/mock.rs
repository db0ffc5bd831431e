use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::FrameLink;

/// In-memory link used by tests and harnesses. `pair()` returns the two
/// ends of a loopback: everything sent on one end is received on the other.
pub struct MockLink {
    tx: mpsc::Sender<Vec<u8>>,
    rx: mpsc::Receiver<Vec<u8>>,
}

impl MockLink {
    pub fn pair(capacity: usize) -> (MockLink, MockLink) {
        let (left_tx, left_rx) = mpsc::channel(capacity);
        let (right_tx, right_rx) = mpsc::channel(capacity);
        (
            MockLink {
                tx: left_tx,
                rx: right_rx,
            },
            MockLink {
                tx: right_tx,
                rx: left_rx,
            },
        )
    }
}

#[async_trait]
impl FrameLink for MockLink {
    async fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.tx
            .send(frame.to_vec())
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Err(_) => Ok(None),
            Ok(Some(frame)) => Ok(Some(frame)),
            Ok(None) => Err(TransportError::Closed),
        }
    }

    async fn reset(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn close(&mut self) {
        self.rx.close();
    }
}
