use std::time::Instant;

use serde::Serialize;
use telelink_frame::{Codec, DecodeError, FrameSource};
use tracing::{debug, warn};

use crate::error::{Result, SessionError};
use crate::recorder::SampleRow;
use crate::session::{Session, StopReason};

/// Outcome counters of one receive session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReceiveStats {
    pub run_number: u32,
    /// Read windows closed, including empty ones.
    pub windows: u64,
    /// Windows that closed without a single byte.
    pub idle: u64,
    /// Frames accepted and appended to the data table.
    pub saved: u64,
    pub short_frame: u64,
    pub crc_mismatch: u64,
    pub decrypt_failure: u64,
    pub format_error: u64,
    pub value_error: u64,
    /// Accepted frames whose row could not be written.
    pub write_failures: u64,
    pub stop_reason: StopReason,
}

impl ReceiveStats {
    /// Frames discarded by the validation pipeline.
    pub fn rejected(&self) -> u64 {
        self.short_frame
            + self.crc_mismatch
            + self.decrypt_failure
            + self.format_error
            + self.value_error
    }

    fn count(&mut self, err: &DecodeError) {
        let slot = match err {
            DecodeError::ShortFrame { .. } => &mut self.short_frame,
            DecodeError::CrcMismatch { .. } => &mut self.crc_mismatch,
            DecodeError::DecryptFailure(_) => &mut self.decrypt_failure,
            DecodeError::FormatError { .. } => &mut self.format_error,
            DecodeError::ValueError { .. } => &mut self.value_error,
        };
        *slot += 1;
    }
}

impl Session {
    /// Run the receive loop until the duration budget runs out or the
    /// session is cancelled.
    ///
    /// `open` acquires the transport. Its failure is logged and returned
    /// before the loop starts. Every classified frame failure is logged and
    /// counted; the loop only ends early on cancellation or a transport
    /// read error.
    pub fn receive<S, F>(&self, open: F, codec: &Codec) -> Result<ReceiveStats>
    where
        S: FrameSource,
        F: FnOnce() -> Result<S>,
    {
        let mut stats = ReceiveStats {
            run_number: self.run().run_number,
            ..ReceiveStats::default()
        };

        if !self.start_delay() {
            stats.stop_reason = StopReason::Interrupted;
            self.recorder().event("Reception stopped by user");
            return Ok(stats);
        }

        let mut source = match open() {
            Ok(source) => source,
            Err(err) => {
                self.open_failed(&err);
                return Err(err);
            }
        };
        self.recorder().event("UART reception started");

        let deadline = Instant::now() + self.config().duration;
        let failure = loop {
            if !self.is_running() {
                stats.stop_reason = StopReason::Interrupted;
                break None;
            }
            if Instant::now() >= deadline {
                stats.stop_reason = StopReason::Elapsed;
                break None;
            }

            let raw = match source.read_frame() {
                Ok(raw) => raw,
                Err(err) => {
                    stats.stop_reason = StopReason::TransportFailure;
                    break Some(SessionError::from(err));
                }
            };
            stats.windows += 1;

            if raw.is_empty() {
                stats.idle += 1;
                debug!("read window closed empty");
                continue;
            }

            match codec.decode(&raw) {
                Ok(decoded) => {
                    let row = SampleRow::received(
                        &decoded.sample,
                        decoded.integrity_ok,
                        source.signal_quality(),
                    );
                    if self.recorder().sample(&row) {
                        stats.saved += 1;
                        self.recorder()
                            .event(&format!("Packet ID {} saved", decoded.sample.packet_id()));
                    } else {
                        stats.write_failures += 1;
                    }
                }
                Err(err) => {
                    stats.count(&err);
                    warn!(kind = err.kind(), len = raw.len(), "frame rejected");
                    self.recorder()
                        .event(&format!("Frame rejected ({}): {err}", err.kind()));
                }
            }
        };

        drop(source);

        if let Some(err) = &failure {
            self.recorder().event(&format!("Transport failure: {err}"));
        }
        if stats.idle > 0 {
            self.recorder().event(&format!(
                "Idle read windows: {} of {}",
                stats.idle, stats.windows
            ));
        }
        self.shutdown("Reception", stats.stop_reason);

        match failure {
            Some(err) => Err(err),
            None => Ok(stats),
        }
    }
}
