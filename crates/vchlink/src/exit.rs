use std::fmt;
use std::io;

use vchlink_comparator::ComparatorError;
use vchlink_transport::TransportError;

// Exit code constants aligned with sysexits/timeout(1) conventions.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::BrokenPipe => TRANSPORT_ERROR,
        io::ErrorKind::InvalidInput => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Resolve { ref source, .. }
            if source.kind() == io::ErrorKind::InvalidInput =>
        {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        TransportError::Connect { source, .. } | TransportError::Io(source) => {
            io_error(context, source)
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn comparator_error(context: &str, err: ComparatorError) -> CliError {
    match err {
        ComparatorError::Connection(err) => transport_error(context, err),
        ComparatorError::Io(err) => io_error(context, err),
        ComparatorError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        ComparatorError::Protocol(_) | ComparatorError::ResponseTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        ComparatorError::InvalidParameter(_) => CliError::new(USAGE, format!("{context}: {err}")),
        ComparatorError::Closed | ComparatorError::NotConnected => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use vchlink_frame::ProtocolError;

    use super::*;

    #[test]
    fn maps_comparator_errors_to_exit_codes() {
        let cases = [
            (ComparatorError::Timeout(Duration::from_secs(10)), TIMEOUT),
            (
                ComparatorError::Protocol(ProtocolError::BadStart { found: 0 }),
                DATA_INVALID,
            ),
            (ComparatorError::InvalidParameter("x".into()), USAGE),
            (ComparatorError::Closed, FAILURE),
            (ComparatorError::NotConnected, FAILURE),
        ];
        for (err, code) in cases {
            assert_eq!(comparator_error("poll failed", err).code, code);
        }
    }

    #[test]
    fn refused_connect_is_transport_error() {
        let err = ComparatorError::Connection(TransportError::Connect {
            target: "127.0.0.1:1".into(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        });
        let cli = comparator_error("connect failed", err);
        assert_eq!(cli.code, TRANSPORT_ERROR);
        assert!(cli.message.starts_with("connect failed: "));
    }

    #[test]
    fn bad_port_is_usage_error() {
        let err = TransportError::Resolve {
            target: "host:x".into(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "invalid port: x"),
        };
        assert_eq!(transport_error("connect failed", err).code, USAGE);
    }
}
