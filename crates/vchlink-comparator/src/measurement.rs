//! Calibrated measurements and the device time base.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use vchlink_frame::ChannelRecord;

/// Unix time of the device epoch, 1982-02-18T00:00:00Z.
pub const EPOCH_BASELINE_UNIX: i64 = 382_838_400;

/// Raw counts per calibrated unit.
pub const VALUE_SCALE: f64 = 99_900_000.0;

/// One channel reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    /// Channel number, 0-99.
    pub channel: u8,
    /// Absolute time of the phase sample.
    pub timestamp: DateTime<Utc>,
    /// Calibrated value.
    pub value: f64,
}

impl Measurement {
    /// Convert a decoded record.
    pub fn from_record(record: &ChannelRecord) -> Self {
        Self {
            channel: record.channel,
            timestamp: timestamp_for(record.elapsed),
            value: calibrate(record.raw),
        }
    }

    /// Seconds since midnight UTC of the sample.
    pub fn time_of_day(&self) -> u32 {
        use chrono::Timelike;
        self.timestamp.num_seconds_from_midnight()
    }
}

/// The device epoch as an instant.
pub fn epoch_baseline() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(EPOCH_BASELINE_UNIX)
}

/// Absolute time of a device elapsed-seconds count.
pub fn timestamp_for(elapsed: u32) -> DateTime<Utc> {
    epoch_baseline() + Duration::seconds(i64::from(elapsed))
}

/// Device elapsed-seconds count for `instant`.
///
/// `None` before the epoch or past what the 32-bit counter can hold.
pub fn elapsed_since_baseline(instant: DateTime<Utc>) -> Option<u32> {
    let seconds = (instant - epoch_baseline()).num_seconds();
    u32::try_from(seconds).ok()
}

/// Calibrated value of a raw count.
pub fn calibrate(raw: u32) -> f64 {
    f64::from(raw) / VALUE_SCALE
}
