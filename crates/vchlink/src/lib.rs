//! Client for networked multi-channel phase comparators.
//!
//! vchlink talks to VCH-315 class comparators over TCP: fixed 6-byte command
//! frames out, variable-length packed-record responses in, calibrated and
//! timestamped measurements out of the top.
//!
//! # Crate Structure
//!
//! - [`transport`] — TCP connection establishment and the device stream
//! - [`frame`] — Command encoding, bounded response reads, record decoding
//! - [`comparator`] — Connection lifecycle, start-up handshake and polling
//!   (behind `comparator` feature)

/// Re-export transport types.
pub mod transport {
    pub use vchlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use vchlink_frame::*;
}

/// Re-export comparator types (requires `comparator` feature).
#[cfg(feature = "comparator")]
pub mod comparator {
    pub use vchlink_comparator::*;
}
