//! Data tables and event logs of a run.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use telelink_frame::{SignalQuality, TelemetrySample, FIELD_NAMES, TIMESTAMP_FORMAT};
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};
use crate::run::{Role, Run};

/// Tracing target that mirrors every run event line.
pub const EVENT_TARGET: &str = "telelink::event";

/// How hard appends push data to stable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Durability {
    /// Leave flushing to the OS. Suitable for attended runs.
    #[default]
    Buffered,
    /// `fsync` after every appended line or row.
    Synced,
}

/// What to do when an append fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Warn and record the failure in the event log.
    #[default]
    Log,
    /// Record the failure in the event log if possible, otherwise ignore it.
    Drop,
}

/// Column set of a data table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableLayout {
    /// Transmit side.
    Sent,
    /// Transmit side of a controlled-range run.
    SentLabeled { run_number: u32, distance: String },
    /// Receive side; `signal_columns` adds `rssi,snr`.
    Received { signal_columns: bool },
}

impl TableLayout {
    /// Layout matching the role and label of `run`.
    pub fn for_run(run: &Run, signal_columns: bool) -> Self {
        match (run.role, &run.distance_label) {
            (Role::Sender, Some(label)) => TableLayout::SentLabeled {
                run_number: run.run_number,
                distance: label.clone(),
            },
            (Role::Sender, None) => TableLayout::Sent,
            (Role::Receiver, _) => TableLayout::Received { signal_columns },
        }
    }

    /// Header row.
    pub fn header(&self) -> Vec<&'static str> {
        let mut cols = vec!["packet_id", "timestamp"];
        cols.extend_from_slice(&FIELD_NAMES);
        match self {
            TableLayout::Sent => {}
            TableLayout::SentLabeled { .. } => cols.extend(["run_number", "distance_m"]),
            TableLayout::Received { signal_columns } => {
                cols.push("crc_ok");
                if *signal_columns {
                    cols.extend(["rssi", "snr"]);
                }
            }
        }
        cols
    }

    fn record(&self, row: &SampleRow<'_>) -> Vec<String> {
        let reading = &row.sample.reading;
        let mut out = Vec::with_capacity(12);
        out.push(reading.packet_id.to_string());
        out.push(row.sample.timestamp_text());
        out.extend(reading.fields.iter().map(i64::to_string));
        match self {
            TableLayout::Sent => {}
            TableLayout::SentLabeled {
                run_number,
                distance,
            } => {
                out.push(run_number.to_string());
                out.push(distance.clone());
            }
            TableLayout::Received { signal_columns } => {
                out.push(flag_text(row.integrity_ok.unwrap_or(false)).to_string());
                if *signal_columns {
                    match row.signal {
                        Some(q) => {
                            out.push(q.rssi.to_string());
                            out.push(q.snr.to_string());
                        }
                        None => {
                            out.push(String::new());
                            out.push(String::new());
                        }
                    }
                }
            }
        }
        out
    }
}

/// One data-table row.
#[derive(Debug, Clone, Copy)]
pub struct SampleRow<'a> {
    pub sample: &'a TelemetrySample,
    /// Receive side only.
    pub integrity_ok: Option<bool>,
    /// Receive side only, when the link reports it.
    pub signal: Option<SignalQuality>,
}

impl<'a> SampleRow<'a> {
    pub fn sent(sample: &'a TelemetrySample) -> Self {
        Self {
            sample,
            integrity_ok: None,
            signal: None,
        }
    }

    pub fn received(
        sample: &'a TelemetrySample,
        integrity_ok: bool,
        signal: Option<SignalQuality>,
    ) -> Self {
        Self {
            sample,
            integrity_ok: Some(integrity_ok),
            signal,
        }
    }
}

// Existing tables carry the flag as written by the first deployments.
fn flag_text(flag: bool) -> &'static str {
    if flag {
        "True"
    } else {
        "False"
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| SessionError::io(path, e))
}

fn settle(file: &File, path: &Path, durability: Durability) -> Result<()> {
    if durability == Durability::Synced {
        file.sync_data().map_err(|e| SessionError::io(path, e))?;
    }
    Ok(())
}

/// Append one row to the table at `path`, writing the header first if the
/// file does not exist yet.
pub fn append_sample(
    path: &Path,
    layout: &TableLayout,
    row: &SampleRow<'_>,
    durability: Durability,
) -> Result<()> {
    let fresh = !path.exists();
    let file = open_append(path)?;
    let csv_err = |source| SessionError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if fresh {
        writer.write_record(layout.header()).map_err(csv_err)?;
    }
    writer.write_record(layout.record(row)).map_err(csv_err)?;
    writer.flush().map_err(|e| SessionError::io(path, e))?;

    settle(writer.get_ref(), path, durability)
}

/// Append `[YYYY-MM-DD HH:MM:SS] <message>` to the event log at `path`.
pub fn append_event(path: &Path, message: &str, durability: Durability) -> Result<()> {
    let line = format!("[{}] {message}\n", Local::now().format(TIMESTAMP_FORMAT));
    let mut file = open_append(path)?;
    file.write_all(line.as_bytes())
        .map_err(|e| SessionError::io(path, e))?;
    settle(&file, path, durability)
}

/// Sole writer of one run's data table and event log.
///
/// Append failures never propagate: they are handled by the configured
/// [`WritePolicy`] so data collection continues.
#[derive(Debug, Clone)]
pub struct Recorder {
    log_path: PathBuf,
    data_path: PathBuf,
    layout: TableLayout,
    durability: Durability,
    policy: WritePolicy,
}

impl Recorder {
    pub fn new(
        log_path: impl Into<PathBuf>,
        data_path: impl Into<PathBuf>,
        layout: TableLayout,
        durability: Durability,
        policy: WritePolicy,
    ) -> Self {
        Self {
            log_path: log_path.into(),
            data_path: data_path.into(),
            layout,
            durability,
            policy,
        }
    }

    /// Recorder for `run` with its default table layout.
    pub fn for_run(
        run: &Run,
        signal_columns: bool,
        durability: Durability,
        policy: WritePolicy,
    ) -> Self {
        Self::new(
            &run.log_path,
            &run.data_path,
            TableLayout::for_run(run, signal_columns),
            durability,
            policy,
        )
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    /// Write one event line. Returns whether it reached the log.
    pub fn event(&self, message: &str) -> bool {
        info!(target: EVENT_TARGET, "{message}");
        match append_event(&self.log_path, message, self.durability) {
            Ok(()) => true,
            Err(err) => {
                match self.policy {
                    WritePolicy::Log => warn!(error = %err, "event log write failed"),
                    WritePolicy::Drop => debug!(error = %err, "event log write failed"),
                }
                false
            }
        }
    }

    /// Append one data-table row. Returns whether it was written.
    pub fn sample(&self, row: &SampleRow<'_>) -> bool {
        match append_sample(&self.data_path, &self.layout, row, self.durability) {
            Ok(()) => true,
            Err(err) => {
                if self.policy == WritePolicy::Log {
                    warn!(error = %err, "data table write failed");
                }
                let message = format!(
                    "Error writing to file {}: {err}",
                    self.data_path.display()
                );
                if let Err(log_err) = append_event(&self.log_path, &message, self.durability) {
                    debug!(error = %log_err, "could not record data table failure");
                }
                false
            }
        }
    }
}
