//! Client for networked multi-channel phase comparators.
//!
//! This is the "just works" layer. Connect to a comparator, run its start-up
//! handshake, and poll calibrated, absolutely-timestamped measurements.

pub mod comparator;
pub mod config;
pub mod error;
pub mod init;
pub mod instrument;
pub mod measurement;

pub use comparator::Comparator;
pub use config::{ComparatorConfig, DEFAULT_SETTLE_DELAY, DEFAULT_WRITE_TIMEOUT};
pub use error::{ComparatorError, Result};
pub use init::{CommandSink, FireAndForget, InitSequence};
pub use instrument::{ReferenceFrequency, TimeIntervalCounter};
pub use measurement::{
    calibrate, elapsed_since_baseline, epoch_baseline, timestamp_for, Measurement,
    EPOCH_BASELINE_UNIX, VALUE_SCALE,
};
