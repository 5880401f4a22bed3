//! Capability set shared by time-interval counters.
//!
//! The serial counters that sit next to the comparator on a bench
//! (SR620, 53230A) all expose the same small surface; drivers for them live
//! outside this crate and implement [`TimeIntervalCounter`].

/// External reference clock fed to a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceFrequency {
    TenMhz,
    #[default]
    FiveMhz,
}

impl ReferenceFrequency {
    /// Frequency in hertz.
    pub fn hz(self) -> u32 {
        match self {
            ReferenceFrequency::TenMhz => 10_000_000,
            ReferenceFrequency::FiveMhz => 5_000_000,
        }
    }
}

/// A time-interval counter driver.
pub trait TimeIntervalCounter {
    type Error: std::error::Error;

    /// Open the instrument by port or resource name and apply its setup.
    fn connect(&mut self, resource: &str) -> Result<(), Self::Error>;

    /// Select the external reference clock.
    fn set_reference_frequency(&mut self, freq: ReferenceFrequency) -> Result<(), Self::Error>;

    /// Set the trigger level in volts for input `channel` (1-based).
    fn set_trigger_level(&mut self, channel: u8, level: f64) -> Result<(), Self::Error>;

    /// Take one time-interval reading in seconds.
    fn measure(&mut self) -> Result<f64, Self::Error>;

    /// Release the instrument. Safe to call more than once.
    fn close(&mut self);
}
