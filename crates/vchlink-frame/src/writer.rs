use std::io::{ErrorKind, Write};

use tracing::debug;

use crate::codec::{encode_command, COMMAND_FRAME_LEN};
use crate::command::Command;
use crate::error::{FrameError, Result};

/// Writes command frames to any `Write` stream.
pub struct CommandWriter<T> {
    inner: T,
}

impl<T: Write> CommandWriter<T> {
    /// Create a new command writer.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Encode and send one command frame (blocking).
    ///
    /// The trailing NUL of the encoded frame is not sent: five bytes go on the
    /// wire, ending with the end marker.
    pub fn send(&mut self, command: Command, param1: u8, param2: u8) -> Result<()> {
        let frame = encode_command(command, param1, param2)?;
        let wire = &frame[..COMMAND_FRAME_LEN - 1];
        debug!(%command, param1, param2, "sending command");

        let mut offset = 0usize;
        while offset < wire.len() {
            match self.inner.write(&wire[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

}
