//! Serial link transport.
//!
//! The lowest layer of telelink: opens the serial device that connects the
//! two endpoints and exposes it as a plain `Read + Write` stream with a
//! bounded read window. Everything else builds on top of [`SerialLink`].

pub mod error;
pub mod serial;

pub use error::{Result, TransportError};
pub use serial::{SerialConfig, SerialLink, DEFAULT_BAUD_RATE, DEFAULT_PORT};

/// The serial backend, re-exported for matching on [`TransportError`] sources.
pub use serialport;
