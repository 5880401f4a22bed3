use std::time::Duration;

use vchlink_frame::{FrameConfig, Terminator, DEFAULT_MAX_RESPONSE, DEFAULT_READ_TIMEOUT};

/// Default wait between sending GET_COUNT and reading the reply.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Default bound on writing one command frame.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for a [`crate::Comparator`].
#[derive(Debug, Clone)]
pub struct ComparatorConfig {
    /// Bound on the TCP connect handshake. `None` uses the OS default.
    pub connect_timeout: Option<Duration>,
    /// Bounded wait for a complete response. Default: 10 s.
    pub response_timeout: Duration,
    /// Bound on a blocked command write. Default: 10 s.
    pub write_timeout: Duration,
    /// Wait between a poll command and its reply, letting the device prepare
    /// its FIFO dump. Default: 200 ms. Whether the device is always ready
    /// after this delay under load is not documented.
    pub settle_delay: Duration,
    /// Maximum response size in bytes. Default: 4096.
    pub max_response_size: usize,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            response_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            max_response_size: DEFAULT_MAX_RESPONSE,
        }
    }
}

impl ComparatorConfig {
    pub(crate) fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_response_size: self.max_response_size,
            read_timeout: self.response_timeout,
            terminator: Terminator::EndMarker,
        }
    }
}
