use thiserror::Error;

use maglog_link::TransportError;

/// The only conditions that stop the receive loop. Everything else is
/// logged and survived.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("link failure: {0}")]
    Link(#[from] TransportError),

    #[error("local storage failure: {0}")]
    Storage(#[from] std::io::Error),
}
