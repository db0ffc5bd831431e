use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: tokio_serial::Error,
    },

    #[error("I/O failure on the link: {0}")]
    Io(#[from] std::io::Error),

    #[error("link closed")]
    Closed,

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLong { len: usize, max: usize },
}
