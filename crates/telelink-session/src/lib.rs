//! Sessions of the telelink endpoints.
//!
//! A session is one bounded run of transmitting or receiving. This crate
//! allocates the run identity and its artifact paths, records samples and
//! event lines, and drives the single-threaded transmit and receive loops
//! with their orderly shutdown path.

pub mod config;
pub mod error;
pub mod generator;
pub mod power;
pub mod receive;
pub mod recorder;
pub mod run;
pub mod session;
pub mod transmit;

pub use config::{
    SessionConfig, DEFAULT_CONTROLLED_INTERVAL, DEFAULT_CONTROLLED_PACKETS, DEFAULT_INTERVAL,
    DEFAULT_RECEIVE_DURATION, DEFAULT_SEND_DURATION,
};
pub use error::{Result, SessionError};
pub use generator::{SampleGenerator, FIELD_RANGES};
pub use power::PowerOff;
pub use receive::ReceiveStats;
pub use recorder::{
    append_event, append_sample, Durability, Recorder, SampleRow, TableLayout, WritePolicy,
    EVENT_TARGET,
};
pub use run::{
    allocate_run, next_run_number, open_run, parse_run_number, Role, Run, RunLayout, LOG_PREFIX,
};
pub use session::{Session, StopReason};
pub use transmit::TransmitStats;
