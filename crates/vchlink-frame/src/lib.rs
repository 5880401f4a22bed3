//! Command/response framing for networked phase comparators.
//!
//! This is the core protocol layer of vchlink. Every exchange is:
//! - A fixed 6-byte command frame: `0x01`, command code, two ASCII-digit
//!   parameters, `0x1A`, trailing NUL
//! - A variable-length response frame delimited by `0x01` … `0x1A`,
//!   carrying one 21-byte record per channel with packed-nibble fields
//!
//! Partial reads, deadlines and record decoding are handled here.

pub mod codec;
pub mod command;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_packed, decode_response, encode_command, ChannelRecord, FrameConfig, FrameKind,
    ResponseFrame, COMMAND_FRAME_LEN, DEFAULT_MAX_RESPONSE, DEFAULT_READ_TIMEOUT, END_MARKER,
    HEADER_SIZE, RECORD_SIZE, START_MARKER,
};
pub use command::Command;
pub use error::{FrameError, ProtocolError, Result};
pub use reader::{ResponseReader, Terminator};
pub use writer::CommandWriter;
