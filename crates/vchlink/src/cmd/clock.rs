use chrono::Utc;
use tracing::info;

use crate::cmd::ClockArgs;
use crate::exit::{comparator_error, CliResult, SUCCESS};

pub fn run(args: ClockArgs) -> CliResult<i32> {
    let mut comparator = args.device.connect(None)?;
    let now = Utc::now();
    comparator
        .sync_clock(now)
        .map_err(|err| comparator_error("clock sync failed", err))?;
    info!(%now, "device clock set");
    Ok(SUCCESS)
}
