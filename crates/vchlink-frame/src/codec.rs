use std::time::Duration;

use crate::command::Command;
use crate::error::{FrameError, ProtocolError, Result};
use crate::reader::Terminator;

/// Start-of-message marker.
pub const START_MARKER: u8 = 0x01;

/// End-of-message marker.
pub const END_MARKER: u8 = 0x1A;

/// Length of an outgoing command frame, trailing NUL included.
pub const COMMAND_FRAME_LEN: usize = 6;

/// Response header: start (1) + reserved (4) + kind (1) + channel count (2).
pub const HEADER_SIZE: usize = 8;

/// Size of one channel record in a DATA response.
pub const RECORD_SIZE: usize = 21;

/// Default maximum response size: the device's 4 KiB reply buffer.
pub const DEFAULT_MAX_RESPONSE: usize = 4096;

/// Default bounded wait for a response.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

const RESERVED_RANGE: std::ops::Range<usize> = 1..5;
const KIND_OFFSET: usize = 5;
const COUNT_OFFSET: usize = 6;

// Offsets inside a channel record.
const SEPARATOR_OFFSETS: [usize; 3] = [0, 3, 12];
const CHANNEL_OFFSET: usize = 1;
const ELAPSED_OFFSET: usize = 4;
const RAW_OFFSET: usize = 13;
const PACKED_LEN: usize = 8;

/// Frame-type tag of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Measurement data follows.
    Data,
    /// The number of active channels changed.
    ChannelChanged,
    /// A channel FIFO overflowed on the device.
    FifoOverflow,
}

impl FrameKind {
    /// Wire tag byte.
    pub fn tag(self) -> u8 {
        match self {
            FrameKind::Data => b'0',
            FrameKind::ChannelChanged => b'1',
            FrameKind::FifoOverflow => b'2',
        }
    }

    /// Kind for a wire tag byte, if known.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'0' => Some(FrameKind::Data),
            b'1' => Some(FrameKind::ChannelChanged),
            b'2' => Some(FrameKind::FifoOverflow),
            _ => None,
        }
    }
}

/// One decoded channel record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRecord {
    /// Channel number, 0-99.
    pub channel: u8,
    /// Seconds elapsed since the device epoch.
    pub elapsed: u32,
    /// Uncalibrated measurement value.
    pub raw: u32,
}

/// A decoded response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    /// Bytes 1-4 of the frame. Documented by the vendor as a checksum; kept
    /// verbatim and not validated.
    pub reserved: [u8; 4],
    /// Frame-type tag.
    pub kind: FrameKind,
    /// Channel count announced in the header.
    pub channel_count: u8,
    /// Decoded records; empty for non-DATA frames.
    pub records: Vec<ChannelRecord>,
}

/// Encode a command into its wire frame.
///
/// Wire format:
/// ```text
/// ┌───────┬──────┬──────────┬──────────┬───────┬──────┐
/// │ 0x01  │ code │ '0' + p1 │ '0' + p2 │ 0x1A  │ 0x00 │
/// └───────┴──────┴──────────┴──────────┴───────┴──────┘
/// ```
/// The trailing NUL is not protocol-significant and never reaches the wire;
/// see [`crate::CommandWriter::send`].
pub fn encode_command(
    command: Command,
    param1: u8,
    param2: u8,
) -> Result<[u8; COMMAND_FRAME_LEN]> {
    let max = command.max_param();
    for value in [param1, param2] {
        if value > max {
            return Err(FrameError::InvalidParameter {
                command: command.name(),
                value,
                max,
            });
        }
    }

    Ok([
        START_MARKER,
        command.code(),
        b'0' + param1,
        b'0' + param2,
        END_MARKER,
        0x00,
    ])
}

/// Decode a response frame, keeping at most `capacity` records.
///
/// Wire format:
/// ```text
/// ┌──────┬──────────────┬──────┬─────────┬──────────────────────┬──────┐
/// │ 0x01 │ reserved (4) │ kind │ N (2 d) │ N × 21-byte records  │ 0x1A │
/// └──────┴──────────────┴──────┴─────────┴──────────────────────┴──────┘
///
/// record: ' ' CC ' ' EEEEEEEE ' ' RRRRRRRR
/// ```
/// A separator mismatch in any record rejects the whole frame.
pub fn decode_response(
    src: &[u8],
    capacity: usize,
) -> std::result::Result<ResponseFrame, ProtocolError> {
    if src.is_empty() {
        return Err(ProtocolError::TruncatedFrame {
            expected: HEADER_SIZE,
            actual: 0,
        });
    }
    if src[0] != START_MARKER {
        return Err(ProtocolError::BadStart { found: src[0] });
    }
    if src.len() < HEADER_SIZE {
        return Err(ProtocolError::TruncatedFrame {
            expected: HEADER_SIZE,
            actual: src.len(),
        });
    }

    let mut reserved = [0u8; 4];
    reserved.copy_from_slice(&src[RESERVED_RANGE]);

    let kind = FrameKind::from_tag(src[KIND_OFFSET])
        .ok_or(ProtocolError::UnknownFrameKind(src[KIND_OFFSET]))?;
    let channel_count = decimal_pair(src, COUNT_OFFSET)?;

    if kind != FrameKind::Data {
        return Ok(ResponseFrame {
            reserved,
            kind,
            channel_count,
            records: Vec::new(),
        });
    }

    let wanted = usize::from(channel_count).min(capacity);
    let mut records = Vec::with_capacity(wanted);
    for index in 0..wanted {
        let start = HEADER_SIZE + index * RECORD_SIZE;
        let end = start + RECORD_SIZE;
        let record = src.get(start..end).ok_or(ProtocolError::TruncatedFrame {
            expected: end,
            actual: src.len(),
        })?;
        records.push(decode_record(record, index, start)?);
    }

    Ok(ResponseFrame {
        reserved,
        kind,
        channel_count,
        records,
    })
}

fn decode_record(
    record: &[u8],
    index: usize,
    base: usize,
) -> std::result::Result<ChannelRecord, ProtocolError> {
    for offset in SEPARATOR_OFFSETS {
        if record[offset] != b' ' {
            return Err(ProtocolError::BadFieldSeparator {
                record: index,
                offset,
                found: record[offset],
            });
        }
    }

    let channel = decimal_pair(record, CHANNEL_OFFSET).map_err(|err| rebase(err, base))?;
    let elapsed = decode_packed(&record[ELAPSED_OFFSET..ELAPSED_OFFSET + PACKED_LEN])
        .map_err(|err| rebase(err, base + ELAPSED_OFFSET))?;
    let raw = decode_packed(&record[RAW_OFFSET..RAW_OFFSET + PACKED_LEN])
        .map_err(|err| rebase(err, base + RAW_OFFSET))?;

    Ok(ChannelRecord {
        channel,
        elapsed,
        raw,
    })
}

/// Decode an 8-byte packed field into a `u32`.
///
/// Byte `i` carries nibble `byte - b'0'` (so `'0'..='?'` → 0..=15) and lands
/// at bits `4*i..4*i+4`: the first byte is the least significant nibble.
/// `b"01234567"` decodes to `0x7654_3210`. Offsets in errors are relative
/// to `src`.
pub fn decode_packed(src: &[u8]) -> std::result::Result<u32, ProtocolError> {
    if src.len() < PACKED_LEN {
        return Err(ProtocolError::TruncatedFrame {
            expected: PACKED_LEN,
            actual: src.len(),
        });
    }

    let mut nibbles = [0u8; PACKED_LEN];
    for (offset, (&byte, nibble)) in src.iter().zip(nibbles.iter_mut()).enumerate() {
        if !(b'0'..=b'0' + 0x0F).contains(&byte) {
            return Err(ProtocolError::BadDigit { offset, found: byte });
        }
        *nibble = byte - b'0';
    }

    Ok(nibbles
        .iter()
        .enumerate()
        .fold(0u32, |acc, (i, &nibble)| acc | (u32::from(nibble) << (4 * i))))
}

fn decimal_pair(src: &[u8], offset: usize) -> std::result::Result<u8, ProtocolError> {
    let mut value = 0u8;
    for (i, &byte) in src[offset..offset + 2].iter().enumerate() {
        if !byte.is_ascii_digit() {
            return Err(ProtocolError::BadDigit {
                offset: offset + i,
                found: byte,
            });
        }
        value = value * 10 + (byte - b'0');
    }
    Ok(value)
}

fn rebase(err: ProtocolError, base: usize) -> ProtocolError {
    match err {
        ProtocolError::BadDigit { offset, found } => ProtocolError::BadDigit {
            offset: base + offset,
            found,
        },
        other => other,
    }
}

/// Configuration for the frame reader.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum accumulated response size in bytes. Default: 4096.
    pub max_response_size: usize,
    /// Bounded wait for a complete response. Default: 10 s.
    pub read_timeout: Duration,
    /// How the end of a response is recognized.
    pub terminator: Terminator,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_response_size: DEFAULT_MAX_RESPONSE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            terminator: Terminator::EndMarker,
        }
    }
}
