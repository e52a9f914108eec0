use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use telelink_frame::{Cipher, CipherKey, DEFAULT_FRAME_LEN, DEFAULT_MIN_FRAME_LEN, DEFAULT_PASSPHRASE};
use telelink_session::{PowerOff, RunLayout, SessionConfig};
use telelink_transport::{SerialConfig, DEFAULT_BAUD_RATE, DEFAULT_PORT};

use crate::exit::{CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod next_run;
pub mod receive;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Transmit generated readings over a serial link.
    Send(SendArgs),
    /// Receive, validate and record frames from a serial link.
    Receive(ReceiveArgs),
    /// Encode one reading and write the frame to a file.
    Encode(EncodeArgs),
    /// Decode a frame file and print the recovered reading.
    Decode(DecodeArgs),
    /// Print the next run number for a log directory.
    NextRun(NextRunArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Receive(args) => receive::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::NextRun(args) => next_run::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Shared passphrase; the AES key is its bytes space-padded to 16.
    #[arg(long, env = "TELELINK_KEY", default_value = DEFAULT_PASSPHRASE, hide_env_values = true)]
    pub key: String,
}

impl KeyArgs {
    pub fn cipher(&self) -> Cipher {
        Cipher::new(CipherKey::from_passphrase(&self.key))
    }
}

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Serial device.
    #[arg(long, env = "TELELINK_PORT", default_value = DEFAULT_PORT)]
    pub port: String,
    /// Baud rate.
    #[arg(long, env = "TELELINK_BAUD", default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    #[command(flatten)]
    pub key: KeyArgs,
}

impl LinkArgs {
    pub fn serial_config(&self, read_timeout: Duration) -> SerialConfig {
        SerialConfig {
            port: self.port.clone(),
            baud_rate: self.baud,
            read_timeout,
        }
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Directory of run event logs.
    #[arg(long, value_name = "DIR", default_value = "logs")]
    pub log_dir: PathBuf,
    /// Root directory of run data tables.
    #[arg(long, value_name = "DIR", default_value = "data")]
    pub data_dir: PathBuf,
    /// Loop budget (e.g. 90s, 500ms). Default depends on the command.
    #[arg(long)]
    pub duration: Option<String>,
    /// Wait before opening the port (e.g. 5s).
    #[arg(long)]
    pub start_delay: Option<String>,
    /// Distance label of a controlled-range run, in meters.
    #[arg(long, value_name = "METERS")]
    pub distance: Option<String>,
    /// Sync every append and never stop on write errors.
    #[arg(long)]
    pub unattended: bool,
    /// Power the host off when the session ends.
    #[arg(long)]
    pub power_off: bool,
}

impl RunArgs {
    pub fn layout(&self) -> RunLayout {
        RunLayout {
            log_dir: self.log_dir.clone(),
            data_dir: self.data_dir.clone(),
        }
    }

    /// Apply the shared run flags on top of a command's defaults.
    pub fn session_config(&self, mut config: SessionConfig) -> CliResult<SessionConfig> {
        if let Some(duration) = &self.duration {
            config.duration = parse_duration(duration)?;
        }
        if let Some(delay) = &self.start_delay {
            config.start_delay = parse_duration(delay)?;
        }
        if self.unattended {
            config = config.unattended();
        }
        if self.power_off {
            config = config.with_power_off(PowerOff::default());
        }
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    #[command(flatten)]
    pub run: RunArgs,
    /// Pause between packets (e.g. 30s). Default: 30s, or 3s with --distance.
    #[arg(long)]
    pub interval: Option<String>,
    /// Stop after N packets. Default: unbounded, or 250 with --distance.
    #[arg(long)]
    pub count: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ReceiveArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    #[command(flatten)]
    pub run: RunArgs,
    /// Bytes per read window.
    #[arg(long, default_value_t = DEFAULT_FRAME_LEN)]
    pub frame_len: usize,
    /// Shortest window accepted as a frame.
    #[arg(long, default_value_t = DEFAULT_MIN_FRAME_LEN)]
    pub min_frame_len: usize,
    /// Length of one read window (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s")]
    pub read_timeout: String,
    /// Add rssi/snr columns to the data table.
    #[arg(long)]
    pub signal_columns: bool,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Frame file to write.
    #[arg(long, short = 'o', default_value = "encrypted_packet.bin")]
    pub output: PathBuf,
    /// Packet id. Default: current Unix time.
    #[arg(long)]
    pub id: Option<u64>,
    /// Five comma-separated field values. Default: random readings.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub fields: Option<Vec<i64>>,
    #[command(flatten)]
    pub key: KeyArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame file to read.
    #[arg(default_value = "encrypted_packet.bin")]
    pub input: PathBuf,
    /// Shortest input accepted as a frame.
    #[arg(long, default_value_t = DEFAULT_MIN_FRAME_LEN)]
    pub min_frame_len: usize,
    #[command(flatten)]
    pub key: KeyArgs,
}

#[derive(Args, Debug)]
pub struct NextRunArgs {
    /// Directory of run event logs.
    #[arg(long, value_name = "DIR", default_value = "logs")]
    pub log_dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert_eq!(parse_duration("bad").unwrap_err().code, USAGE);
        assert_eq!(parse_duration("").unwrap_err().code, USAGE);
        assert_eq!(parse_duration("-1s").unwrap_err().code, USAGE);
    }

    #[test]
    fn unattended_flags_shape_the_config() {
        let args = RunArgs {
            log_dir: PathBuf::from("logs"),
            data_dir: PathBuf::from("data"),
            duration: Some("10s".to_string()),
            start_delay: Some("5s".to_string()),
            distance: None,
            unattended: true,
            power_off: true,
        };
        let cfg = args.session_config(SessionConfig::sender()).unwrap();
        assert_eq!(cfg.duration, Duration::from_secs(10));
        assert_eq!(cfg.start_delay, Duration::from_secs(5));
        assert_eq!(cfg.durability, telelink_session::Durability::Synced);
        assert_eq!(cfg.power_off, Some(PowerOff::default()));
    }
}
