use crate::cmd::SendArgs;
use crate::exit::{comparator_error, CliResult, SUCCESS};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let mut comparator = args.device.connect(None)?;
    comparator
        .command(args.command, args.p1, args.p2)
        .map_err(|err| comparator_error("send failed", err))?;
    Ok(SUCCESS)
}
