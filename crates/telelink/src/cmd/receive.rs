use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use telelink_frame::{Codec, FixedFramer, FrameConfig};
use telelink_session::{allocate_run, Role, Session, SessionConfig};
use telelink_transport::SerialLink;
use tracing::info;

use crate::cmd::{install_ctrlc_handler, parse_duration, ReceiveArgs};
use crate::exit::{session_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_stats, OutputFormat};

pub fn run(args: ReceiveArgs, format: OutputFormat) -> CliResult<i32> {
    let frame_config = frame_config(&args)?;
    let mut config = args.run.session_config(SessionConfig::receiver())?;
    config.signal_columns = args.signal_columns;

    let run = allocate_run(&args.run.layout(), Role::Receiver, args.run.distance.as_deref())
        .map_err(|err| session_error("run setup failed", err))?;
    info!(run = run.run_number, log = %run.log_path.display(), "run allocated");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let serial = args.link.serial_config(frame_config.read_timeout);
    let codec = Codec::new(args.link.key.cipher(), frame_config.clone());
    let session = Session::new(run, config, running);

    let stats = session
        .receive(
            || {
                let link = SerialLink::open(&serial)?;
                Ok(FixedFramer::with_config_serial(link, frame_config)?)
            },
            &codec,
        )
        .map_err(|err| session_error("receive failed", err))?;

    print_stats(&stats, format);
    Ok(SUCCESS)
}

fn frame_config(args: &ReceiveArgs) -> CliResult<FrameConfig> {
    if args.frame_len == 0 || args.min_frame_len > args.frame_len {
        return Err(CliError::new(
            USAGE,
            format!(
                "--min-frame-len ({}) must not exceed a non-zero --frame-len ({})",
                args.min_frame_len, args.frame_len
            ),
        ));
    }
    Ok(FrameConfig {
        frame_len: args.frame_len,
        min_frame_len: args.min_frame_len,
        read_timeout: parse_duration(&args.read_timeout)?,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: ReceiveArgs,
    }

    fn parse(extra: &[&str]) -> ReceiveArgs {
        let mut argv = vec!["receive"];
        argv.extend_from_slice(extra);
        Harness::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn default_window() {
        let cfg = frame_config(&parse(&[])).unwrap();
        assert_eq!(cfg, FrameConfig::default());
    }

    #[test]
    fn custom_window() {
        let cfg = frame_config(&parse(&[
            "--frame-len",
            "49",
            "--read-timeout",
            "250ms",
        ]))
        .unwrap();
        assert_eq!(cfg.frame_len, 49);
        assert_eq!(cfg.min_frame_len, 17);
        assert_eq!(cfg.read_timeout, Duration::from_millis(250));
    }

    #[test]
    fn minimum_above_window_is_usage_error() {
        let err = frame_config(&parse(&["--frame-len", "16"])).unwrap_err();
        assert_eq!(err.code, USAGE);
    }
}
