use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::DecodeError;

/// Number of sensor fields accompanying the packet id.
pub const FIELD_COUNT: usize = 5;

/// Sensor field names, in wire order.
pub const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "temperature",
    "pressure",
    "humidity",
    "density",
    "concentration",
];

/// Token separator of the plaintext payload.
pub const DELIMITER: char = ',';

/// Wall-clock format used in data tables and event lines.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The transmitted content of one telemetry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Reading {
    pub packet_id: u64,
    /// Temperature, pressure, humidity, density, concentration.
    pub fields: [i64; FIELD_COUNT],
}

impl Reading {
    pub fn new(packet_id: u64, fields: [i64; FIELD_COUNT]) -> Self {
        Self { packet_id, fields }
    }

    /// Plaintext payload: `"<id>,<f1>,<f2>,<f3>,<f4>,<f5>"`.
    pub fn to_payload(&self) -> String {
        let mut out = self.packet_id.to_string();
        for field in &self.fields {
            out.push(DELIMITER);
            out.push_str(&field.to_string());
        }
        out
    }

    /// Parse a plaintext payload back into a reading.
    pub fn from_payload(text: &str) -> Result<Self, DecodeError> {
        let tokens: Vec<&str> = text.split(DELIMITER).collect();
        if tokens.len() != FIELD_COUNT + 1 {
            return Err(DecodeError::FormatError {
                tokens: tokens.len(),
                expected: FIELD_COUNT + 1,
            });
        }

        let value_error = |index: usize| DecodeError::ValueError {
            index,
            token: tokens[index].to_string(),
        };

        let packet_id = tokens[0].parse::<u64>().map_err(|_| value_error(0))?;
        let mut fields = [0i64; FIELD_COUNT];
        for (i, slot) in fields.iter_mut().enumerate() {
            *slot = tokens[i + 1]
                .parse::<i64>()
                .map_err(|_| value_error(i + 1))?;
        }

        Ok(Self { packet_id, fields })
    }
}

/// A reading stamped with the local instant it was produced or accepted.
///
/// The timestamp is never transmitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySample {
    pub reading: Reading,
    pub timestamp: DateTime<Local>,
}

impl TelemetrySample {
    /// Stamp `reading` with the current local time.
    pub fn now(reading: Reading) -> Self {
        Self {
            reading,
            timestamp: Local::now(),
        }
    }

    pub fn packet_id(&self) -> u64 {
        self.reading.packet_id
    }

    /// Timestamp rendered as `YYYY-MM-DD HH:MM:SS`.
    pub fn timestamp_text(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}
