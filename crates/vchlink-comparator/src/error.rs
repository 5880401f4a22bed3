use std::time::Duration;

use vchlink_frame::{FrameError, ProtocolError};
use vchlink_transport::TransportError;

/// Errors that can occur in comparator operations.
#[derive(Debug, thiserror::Error)]
pub enum ComparatorError {
    /// Address resolution, socket creation or the connect handshake failed.
    #[error("connection error: {0}")]
    Connection(#[from] TransportError),

    /// The operation needs an open connection.
    #[error("not connected")]
    NotConnected,

    /// No complete response, or a command not fully written, within the
    /// bounded wait.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The device closed the stream before sending a usable response.
    #[error("connection closed by device")]
    Closed,

    /// The response frame is malformed. The connection stays usable.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The response grew past the configured maximum without terminating.
    #[error("response too large ({size} bytes, max {max})")]
    ResponseTooLarge { size: usize, max: usize },

    /// A caller-supplied value is outside what the device accepts.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Socket-level I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FrameError> for ComparatorError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Io(err) => ComparatorError::Io(err),
            FrameError::Timeout(timeout) => ComparatorError::Timeout(timeout),
            FrameError::ConnectionClosed => ComparatorError::Closed,
            FrameError::Protocol(err) => ComparatorError::Protocol(err),
            FrameError::ResponseTooLarge { size, max } => {
                ComparatorError::ResponseTooLarge { size, max }
            }
            other @ FrameError::InvalidParameter { .. } => {
                ComparatorError::InvalidParameter(other.to_string())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ComparatorError>;
