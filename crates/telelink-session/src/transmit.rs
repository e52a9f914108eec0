use std::io::Write;
use std::time::Instant;

use rand::Rng;
use serde::Serialize;
use telelink_frame::{Codec, FrameWriter, TelemetrySample};
use tracing::warn;

use crate::error::Result;
use crate::generator::SampleGenerator;
use crate::recorder::SampleRow;
use crate::session::{Session, StopReason};

/// Outcome counters of one transmit session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransmitStats {
    pub run_number: u32,
    /// Packets generated and handed to the transport.
    pub attempted: u64,
    pub sent: u64,
    pub failed: u64,
    /// Sent packets whose row could not be written.
    pub write_failures: u64,
    pub stop_reason: StopReason,
}

fn field_list(fields: &[i64]) -> String {
    let items: Vec<String> = fields.iter().map(i64::to_string).collect();
    format!("[{}]", items.join(", "))
}

impl Session {
    /// Run the transmit loop until the duration budget runs out, the packet
    /// count is reached, or the session is cancelled.
    ///
    /// A failed write is logged and the loop moves on to the next packet.
    pub fn transmit<W, F, R>(
        &self,
        open: F,
        codec: &Codec,
        generator: &mut SampleGenerator<R>,
    ) -> Result<TransmitStats>
    where
        W: Write,
        F: FnOnce() -> Result<W>,
        R: Rng,
    {
        let mut stats = TransmitStats {
            run_number: self.run().run_number,
            ..TransmitStats::default()
        };

        if let Some(label) = &self.run().distance_label {
            self.recorder().event(&format!(
                "Run #{} at distance {label} m",
                self.run().run_number
            ));
        }

        if !self.start_delay() {
            stats.stop_reason = StopReason::Interrupted;
            self.recorder().event("Transmission stopped by user");
            return Ok(stats);
        }

        let mut writer = match open() {
            Ok(inner) => FrameWriter::new(inner),
            Err(err) => {
                self.open_failed(&err);
                return Err(err);
            }
        };
        self.recorder().event("Starting packet transmission over UART");

        let deadline = Instant::now() + self.config().duration;
        stats.stop_reason = loop {
            if !self.is_running() {
                break StopReason::Interrupted;
            }
            if Instant::now() >= deadline {
                break StopReason::Elapsed;
            }
            if self
                .config()
                .max_packets
                .is_some_and(|max| stats.attempted >= max)
            {
                break StopReason::Completed;
            }

            let sample = TelemetrySample::now(generator.next_reading());
            let id = sample.packet_id();
            stats.attempted += 1;
            self.recorder().event(&format!(
                "Packet ID {id} generated: {}",
                field_list(&sample.reading.fields)
            ));

            let frame = codec.encode(&sample.reading);
            match writer.write_frame(&frame) {
                Ok(()) => {
                    stats.sent += 1;
                    self.recorder().event(&format!("Packet ID {id} sent"));
                    if !self.recorder().sample(&SampleRow::sent(&sample)) {
                        stats.write_failures += 1;
                    }
                }
                Err(err) => {
                    stats.failed += 1;
                    warn!(packet_id = id, error = %err, "frame write failed");
                    self.recorder()
                        .event(&format!("Failed to send packet ID {id}: {err}"));
                }
            }

            let next = (Instant::now() + self.config().interval).min(deadline);
            if !self.wait_until(next) {
                break StopReason::Interrupted;
            }
        };

        drop(writer);
        self.shutdown("Transmission", stats.stop_reason);
        Ok(stats)
    }
}
