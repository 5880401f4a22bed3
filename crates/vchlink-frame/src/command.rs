//! Comparator command set.
//!
//! Each command is a single code byte sent between the frame markers,
//! followed by two parameter digits.

use std::fmt;
use std::str::FromStr;

/// Commands understood by the comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Synchronize the time scales. Sent at start-up.
    Synchronize = 0x33,
    /// Link check.
    Test = 0x36,
    /// Report firmware version.
    GetVersion = 0x37,
    /// Transfer the buffered FIFO data of all channels.
    GetCount = 0x3A,
    /// Repeat the last transmission.
    Resend = 0x3C,
    /// Clear the FIFO of one channel. Parameters are the channel's tens and
    /// units digits.
    ResetChannelFifo = 0x3D,
    /// Reset the device processor. Sent at start-up.
    Reset = 0x3F,
    /// Set byte 0 (least significant) of the device time counter.
    SetTimeByte0 = 0x40,
    SetTimeByte1 = 0x41,
    SetTimeByte2 = 0x42,
    /// Set byte 3 (most significant) of the device time counter.
    SetTimeByte3 = 0x43,
}

impl Command {
    /// Every command, in code order.
    pub const ALL: [Command; 11] = [
        Command::Synchronize,
        Command::Test,
        Command::GetVersion,
        Command::GetCount,
        Command::Resend,
        Command::ResetChannelFifo,
        Command::Reset,
        Command::SetTimeByte0,
        Command::SetTimeByte1,
        Command::SetTimeByte2,
        Command::SetTimeByte3,
    ];

    /// Wire code byte.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Command for a wire code, if known.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.code() == code)
    }

    /// Set-time command for counter byte `index` (0 = least significant).
    pub fn set_time_byte(index: usize) -> Option<Self> {
        match index {
            0 => Some(Command::SetTimeByte0),
            1 => Some(Command::SetTimeByte1),
            2 => Some(Command::SetTimeByte2),
            3 => Some(Command::SetTimeByte3),
            _ => None,
        }
    }

    /// Largest value either parameter may take.
    ///
    /// Set-time commands carry nibbles (`0x30 + 0..=15`); everything else
    /// carries decimal digits.
    pub fn max_param(self) -> u8 {
        match self {
            Command::SetTimeByte0
            | Command::SetTimeByte1
            | Command::SetTimeByte2
            | Command::SetTimeByte3 => 0x0F,
            _ => 9,
        }
    }

    /// Stable, human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Command::Synchronize => "SYNCHRONIZE",
            Command::Test => "TEST",
            Command::GetVersion => "GET_VERSION",
            Command::GetCount => "GET_COUNT",
            Command::Resend => "RESEND",
            Command::ResetChannelFifo => "RESET_CHANNEL_FIFO",
            Command::Reset => "RESET",
            Command::SetTimeByte0 => "SET_TIME_BYTE_0",
            Command::SetTimeByte1 => "SET_TIME_BYTE_1",
            Command::SetTimeByte2 => "SET_TIME_BYTE_2",
            Command::SetTimeByte3 => "SET_TIME_BYTE_3",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = String;

    /// Accepts the canonical name in any case, with `-` or `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.name() == wanted)
            .ok_or_else(|| format!("unknown command: {s}"))
    }
}
