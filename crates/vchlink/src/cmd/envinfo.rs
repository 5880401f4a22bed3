use std::net::ToSocketAddrs;

use serde::Serialize;
use vchlink_comparator::{epoch_baseline, ComparatorConfig, EPOCH_BASELINE_UNIX, VALUE_SCALE};

use crate::cmd::EnvinfoArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

/// Comparator settings a connection starts from unless overridden.
#[derive(Serialize)]
struct DeviceDefaults {
    settle_delay: String,
    response_timeout: String,
    write_timeout: String,
    connect_timeout: String,
    max_response_size: usize,
    epoch_baseline: String,
    epoch_baseline_unix: i64,
    value_scale: f64,
}

impl DeviceDefaults {
    fn current() -> Self {
        let config = ComparatorConfig::default();
        Self {
            settle_delay: format!("{:?}", config.settle_delay),
            response_timeout: format!("{:?}", config.response_timeout),
            write_timeout: format!("{:?}", config.write_timeout),
            connect_timeout: config
                .connect_timeout
                .map_or_else(|| "os default".to_string(), |t| format!("{t:?}")),
            max_response_size: config.max_response_size,
            epoch_baseline: epoch_baseline().to_rfc3339(),
            epoch_baseline_unix: EPOCH_BASELINE_UNIX,
            value_scale: VALUE_SCALE,
        }
    }
}

/// The device the positional arguments fall back to.
#[derive(Serialize)]
struct DeviceTarget {
    address: Option<String>,
    port: Option<String>,
    resolved: Vec<String>,
    resolve_error: Option<String>,
}

impl DeviceTarget {
    fn from_env() -> Self {
        let address = std::env::var("VCHLINK_ADDRESS").ok();
        let port = std::env::var("VCHLINK_PORT").ok();
        let (resolved, resolve_error) = match (&address, &port) {
            (Some(address), Some(port)) => match resolve(address, port) {
                Ok(addrs) => (addrs, None),
                Err(err) => (Vec::new(), Some(err)),
            },
            _ => (Vec::new(), None),
        };
        Self {
            address,
            port,
            resolved,
            resolve_error,
        }
    }
}

fn resolve(address: &str, port: &str) -> Result<Vec<String>, String> {
    let port: u16 = port
        .trim()
        .parse()
        .map_err(|_| format!("invalid port: {port}"))?;
    (address, port)
        .to_socket_addrs()
        .map(|addrs| addrs.map(|addr| addr.to_string()).collect())
        .map_err(|err| err.to_string())
}

#[derive(Serialize)]
struct EnvInfoOutput {
    version: &'static str,
    target: String,
    os: &'static str,
    arch: &'static str,
    features: Vec<&'static str>,
    log_level: Option<String>,
    device: DeviceTarget,
    defaults: DeviceDefaults,
}

pub fn run(_args: EnvinfoArgs, format: OutputFormat) -> CliResult<i32> {
    let output = EnvInfoOutput {
        version: env!("CARGO_PKG_VERSION"),
        target: target_triple(),
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        features: active_features(),
        log_level: std::env::var("VCHLINK_LOG_LEVEL").ok(),
        device: DeviceTarget::from_env(),
        defaults: DeviceDefaults::current(),
    };

    print_envinfo(&output, format);
    Ok(SUCCESS)
}

fn target_triple() -> String {
    option_env!("VCHLINK_BUILD_TARGET")
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS))
}

fn active_features() -> Vec<&'static str> {
    [
        ("comparator", cfg!(feature = "comparator")),
        ("cli", cfg!(feature = "cli")),
    ]
    .into_iter()
    .filter_map(|(name, on)| on.then_some(name))
    .collect()
}

fn or_unset(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("(not set)")
}

fn print_envinfo(output: &EnvInfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table | OutputFormat::Pretty => {
            let device = &output.device;
            let defaults = &output.defaults;

            println!("vchlink {} ({})", output.version, output.target);
            println!("  features:          {}", output.features.join(", "));
            println!("  log level:         {}", or_unset(&output.log_level));
            println!();
            println!("device (VCHLINK_ADDRESS / VCHLINK_PORT)");
            println!("  address:           {}", or_unset(&device.address));
            println!("  port:              {}", or_unset(&device.port));
            if let Some(err) = &device.resolve_error {
                println!("  resolves to:       error: {err}");
            } else if !device.resolved.is_empty() {
                println!("  resolves to:       {}", device.resolved.join(", "));
            }
            println!();
            println!("defaults");
            println!("  settle delay:      {}", defaults.settle_delay);
            println!("  response timeout:  {}", defaults.response_timeout);
            println!("  write timeout:     {}", defaults.write_timeout);
            println!("  connect timeout:   {}", defaults.connect_timeout);
            println!("  max response size: {} bytes", defaults.max_response_size);
            println!(
                "  epoch baseline:    {} (unix {})",
                defaults.epoch_baseline, defaults.epoch_baseline_unix
            );
            println!("  value scale:       {}", defaults.value_scale);
        }
        OutputFormat::Raw => println!("{}", output.version),
    }
}
