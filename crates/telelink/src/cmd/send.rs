use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use telelink_frame::{Codec, FrameConfig};
use telelink_session::{
    allocate_run, Role, SampleGenerator, Session, SessionConfig, SessionError,
    DEFAULT_CONTROLLED_INTERVAL, DEFAULT_CONTROLLED_PACKETS,
};
use telelink_transport::SerialLink;

use crate::cmd::{install_ctrlc_handler, parse_duration, SendArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_stats, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let config = session_config(&args)?;

    let run = allocate_run(&args.run.layout(), Role::Sender, args.run.distance.as_deref())
        .map_err(|err| session_error("run setup failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let frame_config = FrameConfig::default();
    let serial = args.link.serial_config(frame_config.read_timeout);
    let codec = Codec::new(args.link.key.cipher(), frame_config);
    let session = Session::new(run, config, running);

    let stats = session
        .transmit(
            || SerialLink::open(&serial).map_err(SessionError::from),
            &codec,
            &mut SampleGenerator::from_entropy(),
        )
        .map_err(|err| session_error("transmit failed", err))?;

    print_stats(&stats, format);
    Ok(SUCCESS)
}

fn session_config(args: &SendArgs) -> CliResult<SessionConfig> {
    let mut config = args.run.session_config(SessionConfig::sender())?;
    let controlled = args.run.distance.is_some();

    config.interval = match &args.interval {
        Some(interval) => parse_duration(interval)?,
        None if controlled => DEFAULT_CONTROLLED_INTERVAL,
        None => config.interval,
    };
    config.max_packets = match args.count {
        Some(count) => Some(count),
        None if controlled => Some(DEFAULT_CONTROLLED_PACKETS),
        None => None,
    };
    Ok(config)
}
