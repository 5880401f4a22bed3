use tracing::info;

use crate::cmd::InitArgs;
use crate::exit::{comparator_error, CliResult, SUCCESS};

pub fn run(args: InitArgs) -> CliResult<i32> {
    let mut comparator = args.device.connect(None)?;
    comparator
        .initialize(args.channels)
        .map_err(|err| comparator_error("init failed", err))?;
    info!(channels = args.channels, "handshake sent");
    Ok(SUCCESS)
}
