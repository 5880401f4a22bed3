/// Errors that can occur while establishing or using a device link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The address/port pair could not be resolved.
    #[error("failed to resolve {target}: {source}")]
    Resolve {
        target: String,
        source: std::io::Error,
    },

    /// Resolution succeeded but produced no usable address.
    #[error("no address found for {target}")]
    NoAddress { target: String },

    /// Every resolved address refused or failed the connect handshake.
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
