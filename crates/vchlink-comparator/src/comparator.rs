use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use vchlink_frame::{decode_response, Command, CommandWriter, FrameError, FrameKind, ResponseReader};
use vchlink_transport::{DeviceStream, TcpTransport};

use crate::config::ComparatorConfig;
use crate::error::{ComparatorError, Result};
use crate::init::{CommandSink, FireAndForget, InitSequence};
use crate::measurement::{elapsed_since_baseline, Measurement};

/// An open connection: one socket, split into a reading and a writing half.
struct Link {
    reader: ResponseReader<DeviceStream>,
    writer: CommandWriter<DeviceStream>,
    peer: Option<SocketAddr>,
    write_timeout: Duration,
}

impl Link {
    /// Send a command whose reply is read next. Leftovers from an earlier
    /// request that timed out are dropped first so they are not taken for
    /// this reply.
    fn request(&mut self, command: Command) -> Result<()> {
        self.reader.discard_pending()?;
        self.send_command(command, 0, 0)
    }
}

impl CommandSink for Link {
    fn send_command(&mut self, command: Command, param1: u8, param2: u8) -> Result<()> {
        self.writer
            .send(command, param1, param2)
            .map_err(|err| write_error(err, self.write_timeout))
    }
}

/// A write blocked past the socket's write timeout is a timeout, not an I/O
/// failure.
fn write_error(err: FrameError, write_timeout: Duration) -> ComparatorError {
    match err {
        FrameError::Io(io)
            if matches!(io.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
        {
            ComparatorError::Timeout(write_timeout)
        }
        other => other.into(),
    }
}

/// Client for one networked phase comparator.
///
/// Owns at most one socket. Every operation other than [`Comparator::connect`]
/// and [`Comparator::disconnect`] fails with [`ComparatorError::NotConnected`]
/// while no connection is open. The socket is released on drop.
///
/// Calls are blocking and not synchronized; share a `Comparator` between
/// threads only behind a mutex.
pub struct Comparator {
    config: ComparatorConfig,
    init: Box<dyn InitSequence>,
    link: Option<Link>,
}

impl Comparator {
    /// Create a disconnected comparator with default configuration.
    pub fn new() -> Self {
        Self::with_config(ComparatorConfig::default())
    }

    /// Create a disconnected comparator with explicit configuration.
    pub fn with_config(config: ComparatorConfig) -> Self {
        Self {
            config,
            init: Box::new(FireAndForget),
            link: None,
        }
    }

    /// Replace the start-up handshake run by [`Comparator::initialize`].
    pub fn with_init_sequence(mut self, init: impl InitSequence + 'static) -> Self {
        self.init = Box::new(init);
        self
    }

    /// Open a TCP connection to the device at `address:port`.
    ///
    /// An existing connection is closed first. There is no retry.
    pub fn connect(&mut self, address: &str, port: &str) -> Result<()> {
        self.disconnect();

        let stream = TcpTransport::connect_timeout(address, port, self.config.connect_timeout)?;
        stream.set_write_timeout(Some(self.config.write_timeout))?;
        let peer = stream.peer_addr().ok();
        let reader_stream = stream.try_clone()?;

        self.link = Some(Link {
            reader: ResponseReader::with_config(reader_stream, self.config.frame_config()),
            writer: CommandWriter::new(stream),
            peer,
            write_timeout: self.config.write_timeout,
        });
        info!(address, port, "comparator connected");
        Ok(())
    }

    /// Close the connection if open. Safe to call at any time, any number of
    /// times.
    pub fn disconnect(&mut self) {
        if let Some(link) = self.link.take() {
            if let Err(err) = link.writer.get_ref().shutdown() {
                debug!(error = %err, "socket shutdown failed");
            }
            info!(peer = ?link.peer, "comparator disconnected");
        }
    }

    /// Whether a connection is open.
    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Address of the connected device.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.link.as_ref().and_then(|link| link.peer)
    }

    /// Current configuration.
    pub fn config(&self) -> &ComparatorConfig {
        &self.config
    }

    /// Send one raw command frame. Nothing is read back.
    pub fn command(&mut self, command: Command, param1: u8, param2: u8) -> Result<()> {
        self.link()?.send_command(command, param1, param2)
    }

    /// Run the start-up handshake for `active_channels` channels.
    ///
    /// The default sequence is SYNCHRONIZE, RESET, then one
    /// RESET_CHANNEL_FIFO per channel `0..active_channels`, with no delay and
    /// no acknowledgment check between them.
    pub fn initialize(&mut self, active_channels: u8) -> Result<()> {
        let link = self.link.as_mut().ok_or(ComparatorError::NotConnected)?;
        debug!(active_channels, "initializing comparator");
        self.init.run(link, active_channels)
    }

    /// Fetch buffered measurements, at most `capacity` of them.
    ///
    /// Drops any unread input, sends GET_COUNT, waits the settle delay, then
    /// reads and decodes one response. Channel-change and FIFO-overflow
    /// responses carry no records and yield an empty list. A malformed or
    /// timed-out response fails this call only; the connection stays usable.
    pub fn poll(&mut self, capacity: usize) -> Result<Vec<Measurement>> {
        let settle_delay = self.config.settle_delay;
        let link = self.link()?;

        link.request(Command::GetCount)?;
        if !settle_delay.is_zero() {
            std::thread::sleep(settle_delay);
        }

        let response = link.reader.receive()?;
        let frame = decode_response(&response, capacity)?;

        match frame.kind {
            FrameKind::Data => {}
            FrameKind::ChannelChanged => {
                info!(channels = frame.channel_count, "device channel count changed");
            }
            FrameKind::FifoOverflow => {
                warn!(channels = frame.channel_count, "device FIFO overflow");
            }
        }

        debug!(
            announced = frame.channel_count,
            decoded = frame.records.len(),
            "poll decoded"
        );
        Ok(frame.records.iter().map(Measurement::from_record).collect())
    }

    /// Load the device time counter with `elapsed` seconds since the epoch
    /// baseline.
    ///
    /// Byte `n` of the counter is sent with SET_TIME_BYTE_n as (high nibble,
    /// low nibble), least significant byte first.
    pub fn set_time(&mut self, elapsed: u32) -> Result<()> {
        let link = self.link()?;
        for (index, byte) in elapsed.to_le_bytes().into_iter().enumerate() {
            let command = Command::set_time_byte(index).ok_or_else(|| {
                ComparatorError::InvalidParameter(format!("time counter byte {index}"))
            })?;
            link.send_command(command, byte >> 4, byte & 0x0F)?;
        }
        debug!(elapsed, "device time counter set");
        Ok(())
    }

    /// Set the device clock to `now`.
    pub fn sync_clock(&mut self, now: DateTime<Utc>) -> Result<()> {
        let elapsed = elapsed_since_baseline(now).ok_or_else(|| {
            ComparatorError::InvalidParameter(format!("{now} is outside the device time range"))
        })?;
        self.set_time(elapsed)
    }

    /// Request the firmware version and return the raw reply frame.
    pub fn version(&mut self) -> Result<Bytes> {
        let link = self.link()?;
        link.request(Command::GetVersion)?;
        Ok(link.reader.receive()?.freeze())
    }

    fn link(&mut self) -> Result<&mut Link> {
        self.link.as_mut().ok_or(ComparatorError::NotConnected)
    }
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Comparator {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Comparator")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .field("peer", &self.peer_addr())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::{Arc, Mutex};
    use std::thread::JoinHandle;
    use std::time::Duration;

    use super::*;
    use crate::measurement::epoch_baseline;

    fn pack(value: u32) -> [u8; 8] {
        let mut out = [0u8; 8];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = b'0' + ((value >> (4 * i)) & 0x0F) as u8;
        }
        out
    }

    fn frame(kind: u8, records: &[(u8, u32, u32)]) -> Vec<u8> {
        let mut out = vec![0x01, b'0', b'0', b'0', b'0', kind];
        out.extend_from_slice(format!("{:02}", records.len()).as_bytes());
        for &(channel, elapsed, raw) in records {
            out.extend_from_slice(format!(" {channel:02} ").as_bytes());
            out.extend_from_slice(&pack(elapsed));
            out.push(b' ');
            out.extend_from_slice(&pack(raw));
        }
        out.push(0x1A);
        out
    }

    fn read_command(stream: &mut TcpStream) -> [u8; 5] {
        let mut buf = [0u8; 5];
        stream.read_exact(&mut buf).unwrap();
        buf
    }

    fn fake_device(handler: impl FnOnce(TcpStream) + Send + 'static) -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port().to_string();
        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            handler(stream);
        });
        (port, handle)
    }

    fn fast_config() -> ComparatorConfig {
        ComparatorConfig {
            settle_delay: Duration::ZERO,
            response_timeout: Duration::from_secs(2),
            ..ComparatorConfig::default()
        }
    }

    #[test]
    fn operations_require_connection() {
        let mut cmp = Comparator::new();
        assert!(!cmp.is_connected());
        assert!(matches!(cmp.poll(10), Err(ComparatorError::NotConnected)));
        assert!(matches!(cmp.initialize(2), Err(ComparatorError::NotConnected)));
        assert!(matches!(
            cmp.command(Command::Test, 0, 0),
            Err(ComparatorError::NotConnected)
        ));
        assert!(matches!(cmp.set_time(1), Err(ComparatorError::NotConnected)));
        assert!(matches!(cmp.version(), Err(ComparatorError::NotConnected)));
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut cmp = Comparator::new();
        cmp.disconnect();
        cmp.disconnect();

        let (port, device) = fake_device(|_stream| {});
        cmp.connect("127.0.0.1", &port).unwrap();
        assert!(cmp.is_connected());
        assert!(cmp.peer_addr().is_some());
        cmp.disconnect();
        cmp.disconnect();
        assert!(!cmp.is_connected());
        assert!(matches!(cmp.poll(1), Err(ComparatorError::NotConnected)));
        device.join().unwrap();
    }

    #[test]
    fn connect_failure_is_connection_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port().to_string()
        };
        let mut cmp = Comparator::new();
        let err = cmp.connect("127.0.0.1", &port).unwrap_err();
        assert!(matches!(err, ComparatorError::Connection(_)));
        assert!(!cmp.is_connected());
    }

    #[test]
    fn poll_assembles_measurements() {
        let (port, device) = fake_device(|mut stream| {
            assert_eq!(read_command(&mut stream), [0x01, 0x3A, b'0', b'0', 0x1A]);
            let reply = frame(b'0', &[(0, 0, 99_900_000), (12, 86_400, 49_950_000)]);
            for piece in reply.chunks(5) {
                stream.write_all(piece).unwrap();
                stream.flush().unwrap();
                std::thread::sleep(Duration::from_millis(2));
            }
        });

        let mut cmp = Comparator::with_config(fast_config());
        cmp.connect("127.0.0.1", &port).unwrap();
        let measurements = cmp.poll(10).unwrap();

        assert_eq!(measurements.len(), 2);
        assert_eq!(measurements[0].channel, 0);
        assert_eq!(measurements[0].timestamp, epoch_baseline());
        assert!((measurements[0].value - 1.0).abs() < f64::EPSILON);
        assert_eq!(measurements[1].channel, 12);
        assert_eq!(
            measurements[1].timestamp,
            epoch_baseline() + chrono::Duration::days(1)
        );
        assert!((measurements[1].value - 0.5).abs() < f64::EPSILON);
        device.join().unwrap();
    }

    #[test]
    fn poll_honours_capacity() {
        let (port, device) = fake_device(|mut stream| {
            read_command(&mut stream);
            stream
                .write_all(&frame(b'0', &[(1, 1, 1), (2, 2, 2), (3, 3, 3)]))
                .unwrap();
        });

        let mut cmp = Comparator::with_config(fast_config());
        cmp.connect("127.0.0.1", &port).unwrap();
        assert_eq!(cmp.poll(1).unwrap().len(), 1);
        device.join().unwrap();
    }

    #[test]
    fn protocol_error_leaves_connection_usable() {
        let (port, device) = fake_device(|mut stream| {
            read_command(&mut stream);
            let mut bad = frame(b'0', &[(1, 1, 1)]);
            bad[0] = b'X';
            stream.write_all(&bad).unwrap();

            read_command(&mut stream);
            stream.write_all(&frame(b'0', &[(4, 4, 4)])).unwrap();
        });

        let mut cmp = Comparator::with_config(fast_config());
        cmp.connect("127.0.0.1", &port).unwrap();
        assert!(matches!(
            cmp.poll(10),
            Err(ComparatorError::Protocol(vchlink_frame::ProtocolError::BadStart { .. }))
        ));
        let second = cmp.poll(10).unwrap();
        assert_eq!(second[0].channel, 4);
        device.join().unwrap();
    }

    #[test]
    fn signal_frames_yield_no_measurements() {
        let (port, device) = fake_device(|mut stream| {
            read_command(&mut stream);
            stream.write_all(&frame(b'2', &[])).unwrap();
        });

        let mut cmp = Comparator::with_config(fast_config());
        cmp.connect("127.0.0.1", &port).unwrap();
        assert!(cmp.poll(10).unwrap().is_empty());
        device.join().unwrap();
    }

    #[test]
    fn poll_times_out_when_device_is_silent() {
        let (port, device) = fake_device(|mut stream| {
            read_command(&mut stream);
            std::thread::sleep(Duration::from_millis(300));
        });

        let mut cmp = Comparator::with_config(ComparatorConfig {
            response_timeout: Duration::from_millis(100),
            ..fast_config()
        });
        cmp.connect("127.0.0.1", &port).unwrap();
        assert!(matches!(cmp.poll(10), Err(ComparatorError::Timeout(_))));
        assert!(cmp.is_connected());
        device.join().unwrap();
    }

    #[test]
    fn late_reply_to_timed_out_poll_is_not_taken_for_the_next() {
        let (port, device) = fake_device(|mut stream| {
            read_command(&mut stream);
            std::thread::sleep(Duration::from_millis(250));
            stream.write_all(&frame(b'0', &[(11, 1, 1)])).unwrap();

            read_command(&mut stream);
            stream.write_all(&frame(b'0', &[(22, 2, 2)])).unwrap();
        });

        let mut cmp = Comparator::with_config(ComparatorConfig {
            response_timeout: Duration::from_millis(150),
            ..fast_config()
        });
        cmp.connect("127.0.0.1", &port).unwrap();

        assert!(matches!(cmp.poll(10), Err(ComparatorError::Timeout(_))));
        // Let the late reply land in the socket buffer.
        std::thread::sleep(Duration::from_millis(250));

        let channels: Vec<u8> = cmp.poll(10).unwrap().iter().map(|m| m.channel).collect();
        assert_eq!(channels, vec![22]);
        device.join().unwrap();
    }

    #[test]
    fn connect_bounds_command_writes() {
        let (port, device) = fake_device(|_stream| {});
        let mut cmp = Comparator::with_config(ComparatorConfig {
            write_timeout: Duration::from_millis(750),
            ..fast_config()
        });
        cmp.connect("127.0.0.1", &port).unwrap();

        let link = cmp.link.as_ref().unwrap();
        assert_eq!(
            link.writer.get_ref().write_timeout().unwrap(),
            Some(Duration::from_millis(750))
        );
        device.join().unwrap();
    }

    #[test]
    fn blocked_write_is_reported_as_timeout() {
        let limit = Duration::from_secs(3);
        for kind in [ErrorKind::WouldBlock, ErrorKind::TimedOut] {
            let err = write_error(FrameError::Io(std::io::Error::from(kind)), limit);
            assert!(matches!(err, ComparatorError::Timeout(t) if t == limit));
        }

        let reset = FrameError::Io(std::io::Error::from(ErrorKind::ConnectionReset));
        assert!(matches!(write_error(reset, limit), ComparatorError::Io(_)));
        assert!(matches!(
            write_error(FrameError::ConnectionClosed, limit),
            ComparatorError::Closed
        ));
    }

    #[test]
    fn poll_reports_closed_device() {
        let (port, device) = fake_device(|mut stream| {
            read_command(&mut stream);
        });

        let mut cmp = Comparator::with_config(fast_config());
        cmp.connect("127.0.0.1", &port).unwrap();
        assert!(matches!(cmp.poll(10), Err(ComparatorError::Closed)));
        device.join().unwrap();
    }

    #[test]
    fn initialize_writes_handshake_in_order() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let (port, device) = fake_device(move |mut stream| {
            for _ in 0..4 {
                let cmd = read_command(&mut stream);
                sink.lock().unwrap().push((cmd[1], cmd[2], cmd[3]));
            }
        });

        let mut cmp = Comparator::with_config(fast_config());
        cmp.connect("127.0.0.1", &port).unwrap();
        cmp.initialize(2).unwrap();
        device.join().unwrap();

        assert_eq!(
            *received.lock().unwrap(),
            vec![
                (0x33, b'0', b'0'),
                (0x3F, b'0', b'0'),
                (0x3D, b'0', b'0'),
                (0x3D, b'0', b'1'),
            ]
        );
    }

    #[test]
    fn set_time_sends_nibbles_least_significant_byte_first() {
        let (port, device) = fake_device(|mut stream| {
            let expected = [
                [0x01, 0x40, 0x37, 0x38, 0x1A],
                [0x01, 0x41, 0x35, 0x36, 0x1A],
                [0x01, 0x42, 0x33, 0x34, 0x1A],
                [0x01, 0x43, 0x31, 0x32, 0x1A],
            ];
            for want in expected {
                assert_eq!(read_command(&mut stream), want);
            }
        });

        let mut cmp = Comparator::with_config(fast_config());
        cmp.connect("127.0.0.1", &port).unwrap();
        cmp.set_time(0x1234_5678).unwrap();
        device.join().unwrap();
    }

    #[test]
    fn sync_clock_rejects_time_before_epoch() {
        let (port, device) = fake_device(|_stream| {});
        let mut cmp = Comparator::with_config(fast_config());
        cmp.connect("127.0.0.1", &port).unwrap();
        let before = epoch_baseline() - chrono::Duration::seconds(1);
        assert!(matches!(
            cmp.sync_clock(before),
            Err(ComparatorError::InvalidParameter(_))
        ));
        device.join().unwrap();
    }

    #[test]
    fn version_returns_raw_reply() {
        let (port, device) = fake_device(|mut stream| {
            assert_eq!(read_command(&mut stream)[1], 0x37);
            stream.write_all(b"\x01VCH-315 v2.1\x1a").unwrap();
        });

        let mut cmp = Comparator::with_config(fast_config());
        cmp.connect("127.0.0.1", &port).unwrap();
        assert_eq!(cmp.version().unwrap().as_ref(), b"\x01VCH-315 v2.1\x1a");
        device.join().unwrap();
    }

    struct CountingInit(Arc<Mutex<Vec<u8>>>);

    impl InitSequence for CountingInit {
        fn run(&self, sink: &mut dyn CommandSink, active_channels: u8) -> Result<()> {
            self.0.lock().unwrap().push(active_channels);
            sink.send_command(Command::Test, 0, 0)
        }
    }

    #[test]
    fn init_sequence_is_replaceable() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (port, device) = fake_device(|mut stream| {
            assert_eq!(read_command(&mut stream)[1], 0x36);
        });

        let mut cmp = Comparator::with_config(fast_config())
            .with_init_sequence(CountingInit(Arc::clone(&calls)));
        cmp.connect("127.0.0.1", &port).unwrap();
        cmp.initialize(5).unwrap();
        device.join().unwrap();
        assert_eq!(*calls.lock().unwrap(), vec![5]);
    }

    #[test]
    fn drop_releases_socket() {
        let (port, device) = fake_device(|mut stream| {
            let mut buf = [0u8; 1];
            // Returns once the client side is gone.
            assert_eq!(stream.read(&mut buf).unwrap(), 0);
        });

        {
            let mut cmp = Comparator::new();
            cmp.connect("127.0.0.1", &port).unwrap();
        }
        device.join().unwrap();
    }
}
