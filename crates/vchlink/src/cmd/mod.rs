use std::time::Duration;

use clap::{Args, Subcommand};
use vchlink_comparator::{Comparator, ComparatorConfig};

use crate::exit::{comparator_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod clock;
pub mod device_version;
pub mod envinfo;
pub mod init;
pub mod poll;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Poll measurements in a loop and print them.
    Poll(PollArgs),
    /// Run the start-up handshake (sync, reset, clear channel FIFOs).
    Init(InitArgs),
    /// Send a single raw command frame.
    Send(SendArgs),
    /// Set the device clock from the host's UTC time.
    Clock(ClockArgs),
    /// Query the device firmware version.
    DeviceVersion(DeviceVersionArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Print build and environment diagnostics.
    Envinfo(EnvinfoArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Poll(args) => poll::run(args, format),
        Command::Init(args) => init::run(args),
        Command::Send(args) => send::run(args),
        Command::Clock(args) => clock::run(args),
        Command::DeviceVersion(args) => device_version::run(args, format),
        Command::Version(args) => version::run(args),
        Command::Envinfo(args) => envinfo::run(args, format),
    }
}

/// Where and how to reach the comparator.
#[derive(Args, Debug)]
pub struct DeviceArgs {
    /// Device address (host name or dotted quad).
    #[arg(env = "VCHLINK_ADDRESS")]
    pub address: String,
    /// Device TCP port.
    #[arg(env = "VCHLINK_PORT")]
    pub port: String,
    /// Maximum wait for a device response (e.g. 10s, 500ms).
    #[arg(long, default_value = "10s")]
    pub timeout: String,
    /// Maximum wait for the TCP connect. Default: OS default.
    #[arg(long)]
    pub connect_timeout: Option<String>,
}

impl DeviceArgs {
    /// Build the comparator config and connect.
    pub fn connect(&self, settle_delay: Option<Duration>) -> CliResult<Comparator> {
        let defaults = ComparatorConfig::default();
        let config = ComparatorConfig {
            connect_timeout: self
                .connect_timeout
                .as_deref()
                .map(parse_timeout)
                .transpose()?,
            response_timeout: parse_timeout(&self.timeout)?,
            settle_delay: settle_delay.unwrap_or(defaults.settle_delay),
            ..defaults
        };

        let mut comparator = Comparator::with_config(config);
        comparator
            .connect(&self.address, &self.port)
            .map_err(|err| comparator_error("connect failed", err))?;
        Ok(comparator)
    }
}

#[derive(Args, Debug)]
pub struct PollArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Maximum measurements decoded per poll.
    #[arg(long, default_value = "10")]
    pub capacity: usize,
    /// Pause between polls (e.g. 100ms, 1s).
    #[arg(long, default_value = "100ms")]
    pub interval: String,
    /// Wait between the poll command and reading the reply.
    #[arg(long, default_value = "200ms")]
    pub settle: String,
    /// Exit after printing N measurements.
    #[arg(long)]
    pub count: Option<usize>,
    /// Only print measurements whose UTC time of day is a multiple of SECONDS.
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u32).range(1..))]
    pub align: Option<u32>,
    /// Run the start-up handshake for this many channels before polling.
    #[arg(long, value_name = "CHANNELS")]
    pub init: Option<u8>,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Number of active channels.
    #[arg(long)]
    pub channels: u8,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Command name (e.g. get-count, reset, reset-channel-fifo).
    #[arg(long, short = 'c')]
    pub command: vchlink_frame::Command,
    /// First parameter digit.
    #[arg(long, default_value = "0")]
    pub p1: u8,
    /// Second parameter digit.
    #[arg(long, default_value = "0")]
    pub p2: u8,
}

#[derive(Args, Debug)]
pub struct ClockArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Args, Debug)]
pub struct DeviceVersionArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct EnvinfoArgs {}

/// Parse `5s`, `150ms` or a bare number of seconds. Zero is allowed.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input}")))?;

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}

/// Like [`parse_duration`], but zero is rejected.
pub fn parse_timeout(input: &str) -> CliResult<Duration> {
    let timeout = parse_duration(input)?;
    if timeout.is_zero() {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }
    Ok(timeout)
}
