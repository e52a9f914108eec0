use std::fs;

use telelink_frame::{Codec, FrameConfig, Reading, FIELD_COUNT};
use telelink_session::SampleGenerator;
use tracing::info;

use crate::cmd::EncodeArgs;
use crate::exit::{io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let reading = resolve_reading(&args)?;
    let codec = Codec::new(args.key.cipher(), FrameConfig::default());
    let frame = codec.encode(&reading);

    fs::write(&args.output, frame.to_wire()).map_err(|err| {
        io_error(&format!("failed writing {}", args.output.display()), err)
    })?;
    info!(
        packet_id = reading.packet_id,
        path = %args.output.display(),
        wire_size = frame.wire_size(),
        "frame written"
    );

    print_frame(&reading, &frame, format);
    Ok(SUCCESS)
}

fn resolve_reading(args: &EncodeArgs) -> CliResult<Reading> {
    let mut generator = SampleGenerator::from_entropy();
    let generated = match args.id {
        Some(id) => generator.reading_with_id(id),
        None => generator.next_reading(),
    };

    let Some(values) = &args.fields else {
        return Ok(generated);
    };
    let fields: [i64; FIELD_COUNT] = values.as_slice().try_into().map_err(|_| {
        CliError::new(
            USAGE,
            format!("--fields needs {FIELD_COUNT} values, got {}", values.len()),
        )
    })?;
    Ok(Reading::new(generated.packet_id, fields))
}
