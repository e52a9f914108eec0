//! Run identity and artifact paths.
//!
//! Run numbers come from scanning the log directory, so two processes
//! sharing a directory can race and reuse a number. One writer per
//! directory is assumed.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, SessionError};

/// File-name prefix of run event logs.
pub const LOG_PREFIX: &str = "log_run_";

const LOG_EXTENSION: &str = "txt";
const DATA_EXTENSION: &str = "csv";

/// Which endpoint a run belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Sender,
    Receiver,
}

impl Role {
    fn data_subdir(self) -> &'static str {
        match self {
            Role::Sender => "sender",
            Role::Receiver => "received",
        }
    }

    fn data_prefix(self) -> &'static str {
        match self {
            Role::Sender => "sent_run_",
            Role::Receiver => "received_run_",
        }
    }
}

/// Where run artifacts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    pub log_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl Default for RunLayout {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            data_dir: PathBuf::from("data"),
        }
    }
}

/// One bounded session of sending or receiving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub run_number: u32,
    pub role: Role,
    pub log_path: PathBuf,
    pub data_path: PathBuf,
    pub distance_label: Option<String>,
}

/// Extract the run number from a log file name such as `log_run_7.txt` or
/// `log_run_7_150m.txt`.
pub fn parse_run_number(file_name: &str) -> Option<u32> {
    let rest = file_name.strip_prefix(LOG_PREFIX)?;
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    match rest[digits_end..].chars().next() {
        None | Some('.') | Some('_') => rest[..digits_end].parse().ok(),
        Some(_) => None,
    }
}

/// Return one more than the highest run number found in `dir`, or `1`.
///
/// The directory is created if it does not exist. A directory whose
/// highest run is `u32::MAX` has no next number and is an error.
pub fn next_run_number(dir: &Path) -> Result<u32> {
    fs::create_dir_all(dir).map_err(|e| SessionError::io(dir, e))?;

    let mut highest: Option<u32> = None;
    for entry in fs::read_dir(dir).map_err(|e| SessionError::io(dir, e))? {
        let entry = entry.map_err(|e| SessionError::io(dir, e))?;
        let name = entry.file_name();
        let Some(number) = name.to_str().and_then(parse_run_number) else {
            continue;
        };
        highest = Some(highest.map_or(number, |h| h.max(number)));
    }

    let next = match highest {
        None => 1,
        Some(h) => h
            .checked_add(1)
            .ok_or_else(|| SessionError::RunNumbersExhausted {
                dir: dir.to_path_buf(),
            })?,
    };
    debug!(dir = %dir.display(), next, "allocated run number");
    Ok(next)
}

/// Build the artifact paths of run `run_number` and create their parent
/// directories.
pub fn open_run(
    layout: &RunLayout,
    role: Role,
    run_number: u32,
    distance_label: Option<&str>,
) -> Result<Run> {
    if let Some(label) = distance_label {
        validate_label(label)?;
    }

    let suffix = match distance_label {
        Some(label) => format!("{run_number}_{label}m"),
        None => run_number.to_string(),
    };

    let log_path = layout
        .log_dir
        .join(format!("{LOG_PREFIX}{suffix}.{LOG_EXTENSION}"));
    let data_dir = layout.data_dir.join(role.data_subdir());
    let data_path = data_dir.join(format!("{}{suffix}.{DATA_EXTENSION}", role.data_prefix()));

    fs::create_dir_all(&layout.log_dir).map_err(|e| SessionError::io(&layout.log_dir, e))?;
    fs::create_dir_all(&data_dir).map_err(|e| SessionError::io(&data_dir, e))?;

    Ok(Run {
        run_number,
        role,
        log_path,
        data_path,
        distance_label: distance_label.map(str::to_string),
    })
}

/// Allocate the next run number under `layout` and open that run.
pub fn allocate_run(layout: &RunLayout, role: Role, distance_label: Option<&str>) -> Result<Run> {
    let run_number = next_run_number(&layout.log_dir)?;
    open_run(layout, role, run_number, distance_label)
}

fn validate_label(label: &str) -> Result<()> {
    let ok = !label.is_empty()
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        && label != "."
        && label != "..";
    if ok {
        Ok(())
    } else {
        Err(SessionError::InvalidLabel(label.to_string()))
    }
}
