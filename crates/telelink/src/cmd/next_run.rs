use serde::Serialize;
use telelink_session::next_run_number;

use crate::cmd::NextRunArgs;
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_stats, OutputFormat};

#[derive(Serialize)]
struct NextRunOutput {
    next_run: u32,
}

pub fn run(args: NextRunArgs, format: OutputFormat) -> CliResult<i32> {
    let next_run = next_run_number(&args.log_dir)
        .map_err(|err| session_error("run scan failed", err))?;

    match format {
        OutputFormat::Raw => println!("{next_run}"),
        other => print_stats(&NextRunOutput { next_run }, other),
    }
    Ok(SUCCESS)
}
