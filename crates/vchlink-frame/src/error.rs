use std::time::Duration;

/// Structural problems found while decoding a response frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The response does not begin with the start marker.
    #[error("bad start marker (expected 0x01, got {found:#04x})")]
    BadStart { found: u8 },

    /// A channel record is missing one of its space separators.
    #[error("record {record}: bad field separator at byte {offset} (got {found:#04x})")]
    BadFieldSeparator { record: usize, offset: usize, found: u8 },

    /// The response ended before the announced content.
    #[error("truncated frame ({actual} bytes, need {expected})")]
    TruncatedFrame { expected: usize, actual: usize },

    /// The frame-type tag is not one the device is known to send.
    #[error("unknown frame kind tag {0:#04x}")]
    UnknownFrameKind(u8),

    /// A digit or packed nibble byte is out of range.
    #[error("bad digit {found:#04x} at byte {offset}")]
    BadDigit { offset: usize, found: u8 },
}

/// Errors that can occur while exchanging frames with the device.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No terminator was observed within the bounded wait.
    #[error("no response terminator within {0:?}")]
    Timeout(Duration),

    /// The peer closed the stream before a usable response arrived.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,

    /// The response grew past the configured maximum.
    #[error("response too large ({size} bytes, max {max})")]
    ResponseTooLarge { size: usize, max: usize },

    /// A command parameter is outside the range its command accepts.
    #[error("{command} parameter {value} out of range 0..={max}")]
    InvalidParameter {
        command: &'static str,
        value: u8,
        max: u8,
    },

    /// The response frame is malformed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
