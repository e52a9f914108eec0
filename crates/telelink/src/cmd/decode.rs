use std::fs;

use telelink_frame::{Codec, FrameConfig};
use tracing::warn;

use crate::cmd::DecodeArgs;
use crate::exit::{decode_error, io_error, CliResult, SUCCESS};
use crate::output::{print_sample, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let raw = fs::read(&args.input)
        .map_err(|err| io_error(&format!("failed reading {}", args.input.display()), err))?;

    let config = FrameConfig {
        min_frame_len: args.min_frame_len,
        ..FrameConfig::default()
    };
    let codec = Codec::new(args.key.cipher(), config);

    match codec.decode(&raw) {
        Ok(decoded) => {
            print_sample(&decoded, format);
            Ok(SUCCESS)
        }
        Err(err) => {
            warn!(kind = err.kind(), len = raw.len(), "frame rejected");
            Err(decode_error("frame rejected", err))
        }
    }
}
