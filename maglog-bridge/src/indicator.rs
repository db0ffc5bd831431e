use tracing::{debug, warn};

/// Status sink for the base node's local panel. All signals are
/// fire-and-forget; nothing here may fail the relay loop.
pub trait Indicator: Send {
    /// A packet moved on the radio side.
    fn radio_activity(&mut self);

    /// A frame moved on the serial side.
    fn serial_activity(&mut self);

    /// A recoverable protocol fault worth surfacing.
    fn failure(&mut self, what: &str);
}

/// Indicator that reports through the log instead of a panel.
#[derive(Debug, Default)]
pub struct LogIndicator;

impl Indicator for LogIndicator {
    fn radio_activity(&mut self) {
        debug!("radio activity");
    }

    fn serial_activity(&mut self) {
        debug!("serial activity");
    }

    fn failure(&mut self, what: &str) {
        warn!(what, "relay fault");
    }
}
