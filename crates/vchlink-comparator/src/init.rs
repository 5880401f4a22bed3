//! Start-up command sequencing.

use vchlink_frame::Command;

use crate::error::{ComparatorError, Result};

/// Most active channels a handshake can cover. Channel indices are two
/// decimal digits, so they run 0..=99.
pub const MAX_CHANNELS: u8 = 100;

/// Something that can send a command frame to the device.
pub trait CommandSink {
    fn send_command(&mut self, command: Command, param1: u8, param2: u8) -> Result<()>;
}

/// The handshake run by [`crate::Comparator::initialize`].
pub trait InitSequence: Send {
    fn run(&self, sink: &mut dyn CommandSink, active_channels: u8) -> Result<()>;
}

/// SYNCHRONIZE, RESET, then RESET_CHANNEL_FIFO for every active channel.
///
/// Commands go out back to back. Nothing checks that the device accepted
/// them; install a stricter [`InitSequence`] if that matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct FireAndForget;

impl InitSequence for FireAndForget {
    fn run(&self, sink: &mut dyn CommandSink, active_channels: u8) -> Result<()> {
        if active_channels > MAX_CHANNELS {
            return Err(ComparatorError::InvalidParameter(format!(
                "active channel count {active_channels} exceeds {MAX_CHANNELS}"
            )));
        }

        sink.send_command(Command::Synchronize, 0, 0)?;
        sink.send_command(Command::Reset, 0, 0)?;
        for channel in 0..active_channels {
            sink.send_command(Command::ResetChannelFifo, channel / 10, channel % 10)?;
        }
        Ok(())
    }
}
