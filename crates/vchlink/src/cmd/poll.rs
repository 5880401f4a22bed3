use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};
use vchlink_comparator::{ComparatorError, Measurement};

use crate::cmd::{parse_duration, PollArgs};
use crate::exit::{comparator_error, CliError, CliResult, SUCCESS};
use crate::output::{print_measurements, OutputFormat};

pub fn run(args: PollArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let settle = parse_duration(&args.settle)?;

    let mut comparator = args.device.connect(Some(settle))?;
    if let Some(channels) = args.init {
        comparator
            .initialize(channels)
            .map_err(|err| comparator_error("init failed", err))?;
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let measurements = match comparator.poll(args.capacity) {
            Ok(measurements) => measurements,
            // A bad frame costs one poll; the link is still good.
            Err(err @ ComparatorError::Protocol(_)) => {
                warn!(error = %err, "discarding malformed response");
                Vec::new()
            }
            Err(err) => return Err(comparator_error("poll failed", err)),
        };
        debug!(count = measurements.len(), "polled");

        let mut selected = select(measurements, args.align);
        if let Some(count) = args.count {
            selected.truncate(count.saturating_sub(printed));
        }
        print_measurements(&selected, format);
        printed = printed.saturating_add(selected.len());

        if let Some(count) = args.count {
            if printed >= count {
                return Ok(SUCCESS);
            }
        }

        if !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }

    Ok(SUCCESS)
}

/// Keep measurements whose time of day falls on an `align`-second boundary.
fn select(measurements: Vec<Measurement>, align: Option<u32>) -> Vec<Measurement> {
    match align {
        Some(align) => measurements
            .into_iter()
            .filter(|m| m.time_of_day() % align == 0)
            .collect(),
        None => measurements,
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use vchlink_comparator::timestamp_for;

    use super::*;

    fn at(elapsed: u32) -> Measurement {
        Measurement {
            channel: 0,
            timestamp: timestamp_for(elapsed),
            value: 0.0,
        }
    }

    #[test]
    fn align_keeps_boundary_samples() {
        let kept = select(vec![at(9), at(10), at(11), at(20)], Some(10));
        let tods: Vec<u32> = kept.iter().map(Measurement::time_of_day).collect();
        assert_eq!(tods, vec![10, 20]);
    }

    #[test]
    fn no_align_keeps_everything() {
        assert_eq!(select(vec![at(1), at(2)], None).len(), 2);
    }
}
