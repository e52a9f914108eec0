use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;
use telelink_frame::{Decoded, Frame, Reading, FIELD_NAMES};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct SampleOutput {
    packet_id: u64,
    timestamp: String,
    fields: serde_json::Map<String, Value>,
    integrity_ok: bool,
}

#[derive(Serialize)]
struct FrameOutput {
    packet_id: u64,
    payload: String,
    wire_size: usize,
    checksum: String,
    ciphertext: String,
}

fn field_map(reading: &Reading) -> serde_json::Map<String, Value> {
    FIELD_NAMES
        .iter()
        .zip(reading.fields.iter())
        .map(|(name, value)| (name.to_string(), Value::from(*value)))
        .collect()
}

/// Print a counter struct such as the loop statistics.
pub fn print_stats<T: Serialize>(stats: &T, format: OutputFormat) {
    let value = serde_json::to_value(stats).unwrap_or(Value::Null);
    match format {
        OutputFormat::Json | OutputFormat::Raw => println!("{value}"),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COUNTER", "VALUE"]);
            if let Value::Object(map) = &value {
                for (key, v) in map {
                    table.add_row(vec![key.clone(), plain(v)]);
                }
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if let Value::Object(map) = &value {
                let parts: Vec<String> =
                    map.iter().map(|(k, v)| format!("{k}={}", plain(v))).collect();
                println!("{}", parts.join(" "));
            }
        }
    }
}

/// Print a sample recovered by the decoder.
pub fn print_sample(decoded: &Decoded, format: OutputFormat) {
    let reading = &decoded.sample.reading;
    match format {
        OutputFormat::Json => {
            let out = SampleOutput {
                packet_id: reading.packet_id,
                timestamp: decoded.sample.timestamp_text(),
                fields: field_map(reading),
                integrity_ok: decoded.integrity_ok,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut header = vec!["PACKET_ID".to_string()];
            header.extend(FIELD_NAMES.iter().map(|n| n.to_uppercase()));
            header.push("CRC_OK".to_string());

            let mut row = vec![reading.packet_id.to_string()];
            row.extend(reading.fields.iter().map(i64::to_string));
            row.push(decoded.integrity_ok.to_string());

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(header)
                .add_row(row);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let fields: Vec<String> = FIELD_NAMES
                .iter()
                .zip(reading.fields.iter())
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            println!(
                "packet_id={} {} crc_ok={}",
                reading.packet_id,
                fields.join(" "),
                decoded.integrity_ok
            );
        }
        OutputFormat::Raw => println!("{}", reading.to_payload()),
    }
}

/// Print an encoded frame. `Raw` writes the wire bytes themselves.
pub fn print_frame(reading: &Reading, frame: &Frame, format: OutputFormat) {
    let wire = frame.to_wire();
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                packet_id: reading.packet_id,
                payload: reading.to_payload(),
                wire_size: frame.wire_size(),
                checksum: format!("{:02x}", frame.checksum),
                ciphertext: hex(&frame.ciphertext),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PACKET_ID", "PAYLOAD", "SIZE", "CRC"])
                .add_row(vec![
                    reading.packet_id.to_string(),
                    reading.to_payload(),
                    frame.wire_size().to_string(),
                    format!("{:02x}", frame.checksum),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "packet_id={} size={} crc={:02x} payload={}",
                reading.packet_id,
                frame.wire_size(),
                frame.checksum,
                reading.to_payload()
            );
        }
        OutputFormat::Raw => print_raw(&wire),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
