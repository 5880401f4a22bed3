use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use crate::error::Result;

/// A stream whose next read can be bounded by a timeout.
///
/// The frame reader sets the remaining time of its deadline before every
/// read, so a whole receive never blocks past the caller's timeout.
pub trait TimedRead: Read {
    /// Bound the next blocking read. `None` blocks indefinitely.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> std::io::Result<()>;

    /// Switch reads between blocking and returning `WouldBlock` at once.
    fn set_nonblocking(&mut self, nonblocking: bool) -> std::io::Result<()>;
}

/// A connected device stream. Implements Read + Write.
///
/// This is the fundamental I/O type returned by [`crate::TcpTransport`].
pub struct DeviceStream {
    inner: TcpStream,
}

impl Read for DeviceStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for DeviceStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl TimedRead for DeviceStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> std::io::Result<()> {
        // A zero duration is rejected by the OS layer; callers treat an
        // exhausted deadline as a timeout before getting here.
        self.inner.set_read_timeout(timeout.map(at_least_1ms))
    }

    fn set_nonblocking(&mut self, nonblocking: bool) -> std::io::Result<()> {
        self.inner.set_nonblocking(nonblocking)
    }
}

fn at_least_1ms(timeout: Duration) -> Duration {
    timeout.max(Duration::from_millis(1))
}

impl DeviceStream {
    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        Self { inner: stream }
    }

    /// Bound every blocking write. Shared with clones of this stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner
            .set_write_timeout(timeout.map(at_least_1ms))
            .map_err(Into::into)
    }

    /// Current write timeout.
    pub fn write_timeout(&self) -> Result<Option<Duration>> {
        self.inner.write_timeout().map_err(Into::into)
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let cloned = self.inner.try_clone()?;
        Ok(Self::from_tcp(cloned))
    }

    /// Address of the connected device.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        self.inner.peer_addr().map_err(Into::into)
    }

    /// Shut down both directions of the socket.
    ///
    /// Clones created with [`DeviceStream::try_clone`] observe the shutdown too.
    pub fn shutdown(&self) -> Result<()> {
        match self.inner.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // The peer may already have gone away.
            Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl std::fmt::Debug for DeviceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let peer = self.inner.peer_addr().ok();
        f.debug_struct("DeviceStream")
            .field("type", &"tcp")
            .field("peer", &peer)
            .finish()
    }
}
