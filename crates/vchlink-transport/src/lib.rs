//! TCP transport for networked time/frequency comparators.
//!
//! This is the lowest layer of vchlink. It resolves the device address,
//! opens the stream socket and hands out a [`DeviceStream`], which the frame
//! layer reads and writes with a per-read deadline.

pub mod error;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use tcp::TcpTransport;
pub use traits::{DeviceStream, TimedRead};
