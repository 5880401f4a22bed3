use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use vchlink_comparator::Measurement;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MeasurementOutput<'a> {
    #[serde(flatten)]
    measurement: &'a Measurement,
    time_of_day: u32,
}

pub fn print_measurements(measurements: &[Measurement], format: OutputFormat) {
    if measurements.is_empty() {
        return;
    }

    match format {
        OutputFormat::Json => {
            for measurement in measurements {
                let out = MeasurementOutput {
                    measurement,
                    time_of_day: measurement.time_of_day(),
                };
                println!(
                    "{}",
                    serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHANNEL", "TIMESTAMP", "TOD", "VALUE"]);
            for m in measurements {
                table.add_row(vec![
                    format!("{:02}", m.channel),
                    m.timestamp.to_rfc3339(),
                    m.time_of_day().to_string(),
                    scientific(m.value),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for m in measurements {
                println!(
                    "channel={:02} time={} value={}",
                    m.channel,
                    m.timestamp.to_rfc3339(),
                    scientific(m.value)
                );
            }
        }
        OutputFormat::Raw => {
            let mut out = std::io::stdout().lock();
            for m in measurements {
                let _ = writeln!(out, "{}", raw_line(m));
            }
            let _ = out.flush();
        }
    }
}

/// `time-of-day channel value`, one measurement per line.
pub fn raw_line(m: &Measurement) -> String {
    format!("{} {:02} {}", m.time_of_day(), m.channel, scientific(m.value))
}

/// Twelve-digit scientific notation with a signed, two-digit exponent
/// (`1.000000000000e+00`), the layout of C's `%.12e`.
fn scientific(value: f64) -> String {
    let formatted = format!("{value:.12e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exp) => {
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
            }
            Err(_) => formatted,
        },
        None => formatted,
    }
}

pub fn print_bytes(data: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Raw => {
            let mut out = std::io::stdout();
            let _ = out.write_all(data);
            let _ = out.flush();
        }
        OutputFormat::Json => {
            let hex: Vec<String> = data.iter().map(|b| format!("{b:02x}")).collect();
            println!(
                "{}",
                serde_json::json!({
                    "length": data.len(),
                    "hex": hex.concat(),
                    "text": printable(data),
                })
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("{} bytes: {}", data.len(), printable(data));
        }
    }
}

fn printable(data: &[u8]) -> String {
    data.iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                char::from(b).to_string()
            } else {
                format!("\\x{b:02x}")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use vchlink_comparator::epoch_baseline;

    use super::*;

    #[test]
    fn raw_line_is_tod_channel_value() {
        let m = Measurement {
            channel: 3,
            timestamp: epoch_baseline() + chrono::Duration::seconds(70),
            value: 1.0,
        };
        assert_eq!(raw_line(&m), "70 03 1.000000000000e+00");
    }

    #[test]
    fn scientific_uses_signed_two_digit_exponent() {
        assert_eq!(scientific(0.0), "0.000000000000e+00");
        assert_eq!(scientific(-2.5e-7), "-2.500000000000e-07");
        assert_eq!(scientific(1.5e123), "1.500000000000e+123");
        assert_eq!(scientific(f64::NAN), "NaN");
    }

    #[test]
    fn json_output_flattens_measurement() {
        let m = Measurement {
            channel: 1,
            timestamp: epoch_baseline(),
            value: 0.25,
        };
        let out = MeasurementOutput {
            measurement: &m,
            time_of_day: m.time_of_day(),
        };
        let json = serde_json::to_string(&out).unwrap();
        assert!(json.contains("\"channel\":1"));
        assert!(json.contains("\"time_of_day\":0"));
    }

    #[test]
    fn printable_escapes_markers() {
        assert_eq!(printable(b"\x01v1.0\x1a"), "\\x01v1.0\\x1a");
    }
}
