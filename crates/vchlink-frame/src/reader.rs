use std::io::ErrorKind;
use std::time::Instant;

use bytes::BytesMut;
use tracing::{debug, trace};
use vchlink_transport::TimedRead;

use crate::codec::{FrameConfig, END_MARKER};
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 1024;

/// A response shorter than this when the peer closes is reported as closed.
const MIN_RESPONSE_LEN: usize = 2;

/// How the end of a response is recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// The most recent byte is the end marker. Used by the comparator.
    EndMarker,
    /// The last two bytes are carriage return then the end marker.
    CrEndMarker,
}

impl Terminator {
    /// Whether `buf` ends with this terminator.
    pub fn is_complete(self, buf: &[u8]) -> bool {
        match self {
            Terminator::EndMarker => buf.last() == Some(&END_MARKER),
            Terminator::CrEndMarker => buf.ends_with(&[b'\r', END_MARKER]),
        }
    }
}

/// Reads complete responses from a [`TimedRead`] stream.
///
/// Handles partial reads internally under one deadline per call. Nothing is
/// carried over between calls: a timed-out partial response is dropped.
pub struct ResponseReader<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: TimedRead> ResponseReader<T> {
    /// Create a new response reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new response reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Receive one response (blocking for at most the configured timeout).
    ///
    /// Returns `Err(FrameError::Timeout)` if no terminator arrives in time and
    /// `Err(FrameError::ConnectionClosed)` if the peer closes before at least
    /// two bytes were received. A close after that returns what was read.
    pub fn receive(&mut self) -> Result<BytesMut> {
        let timeout = self.config.read_timeout;
        let deadline = Instant::now() + timeout;
        let mut buf = BytesMut::with_capacity(READ_CHUNK_SIZE);
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!(buffered = buf.len(), ?timeout, "response timed out");
                return Err(FrameError::Timeout(timeout));
            }
            self.inner.set_read_timeout(Some(remaining))?;

            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout(&err) => {
                    debug!(buffered = buf.len(), ?timeout, "response timed out");
                    return Err(FrameError::Timeout(timeout));
                }
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                if buf.len() < MIN_RESPONSE_LEN {
                    return Err(FrameError::ConnectionClosed);
                }
                debug!(len = buf.len(), "peer closed mid-response");
                return Ok(buf);
            }

            buf.extend_from_slice(&chunk[..read]);
            trace!(read, buffered = buf.len(), "response chunk");

            if buf.len() > self.config.max_response_size {
                return Err(FrameError::ResponseTooLarge {
                    size: buf.len(),
                    max: self.config.max_response_size,
                });
            }

            if self.config.terminator.is_complete(&buf) {
                return Ok(buf);
            }
        }
    }

    /// Drop input that is already buffered, without waiting for more.
    ///
    /// Returns the number of bytes discarded. A late reply to a request that
    /// timed out is the usual source. A peer close seen here is left for the
    /// next [`ResponseReader::receive`] to report.
    pub fn discard_pending(&mut self) -> Result<usize> {
        self.inner.set_nonblocking(true)?;
        let drained = self.drain();
        self.inner.set_nonblocking(false)?;

        let discarded = drained?;
        if discarded > 0 {
            debug!(discarded, "discarded stale input");
        }
        Ok(discarded)
    }

    fn drain(&mut self) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let mut discarded = 0usize;
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => return Ok(discarded),
                Ok(n) => discarded += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(discarded),
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
