use crate::cmd::DeviceVersionArgs;
use crate::exit::{comparator_error, CliResult, SUCCESS};
use crate::output::{print_bytes, OutputFormat};

pub fn run(args: DeviceVersionArgs, format: OutputFormat) -> CliResult<i32> {
    let mut comparator = args.device.connect(None)?;
    let reply = comparator
        .version()
        .map_err(|err| comparator_error("version query failed", err))?;
    print_bytes(&reply, format);
    Ok(SUCCESS)
}
