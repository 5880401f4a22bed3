mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "vchlink", version, about = "Phase comparator client CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "VCHLINK_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_poll_subcommand() {
        let cli = Cli::try_parse_from([
            "vchlink",
            "poll",
            "192.168.0.162",
            "1",
            "--capacity",
            "10",
            "--align",
            "10",
        ])
        .expect("poll args should parse");

        match cli.command {
            Command::Poll(args) => {
                assert_eq!(args.device.address, "192.168.0.162");
                assert_eq!(args.device.port, "1");
                assert_eq!(args.capacity, 10);
                assert_eq!(args.align, Some(10));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_send_with_named_command() {
        let cli = Cli::try_parse_from([
            "vchlink",
            "send",
            "10.0.0.5",
            "1",
            "--command",
            "reset-channel-fifo",
            "--p2",
            "3",
        ])
        .expect("send args should parse");

        assert!(matches!(cli.command, Command::Send(_)));
    }

    #[test]
    fn rejects_unknown_device_command() {
        let err = Cli::try_parse_from([
            "vchlink",
            "send",
            "10.0.0.5",
            "1",
            "--command",
            "launch",
        ])
        .expect_err("unknown command should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn init_requires_channel_count() {
        let err = Cli::try_parse_from(["vchlink", "init", "10.0.0.5", "1"])
            .expect_err("missing --channels should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
