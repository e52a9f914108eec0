use std::io::{Read, Write};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Default serial device of the radio modem.
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Default line rate of the radio modem.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Serial port settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path or name (`/dev/ttyUSB0`, `COM3`).
    pub port: String,
    /// Line rate in bits per second.
    pub baud_rate: u32,
    /// Upper bound on a single blocking read.
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_secs(1),
        }
    }
}

/// An open serial device, exclusively owned by one endpoint process.
///
/// Reads block for at most the configured read timeout and then fail with
/// [`std::io::ErrorKind::TimedOut`]. The device is closed when the link is
/// dropped, so every exit path releases it.
pub struct SerialLink {
    port: Box<dyn serialport::SerialPort>,
    name: String,
}

impl SerialLink {
    /// Open the serial device described by `config`.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.read_timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: config.port.clone(),
                source,
            })?;

        info!(
            port = %config.port,
            baud_rate = config.baud_rate,
            "serial port opened"
        );

        Ok(Self {
            port,
            name: config.port.clone(),
        })
    }

    /// Change the read window of subsequent blocking reads.
    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port
            .set_timeout(timeout)
            .map_err(|source| TransportError::Configure {
                port: self.name.clone(),
                source,
            })
    }

    /// Current read window.
    pub fn read_timeout(&self) -> Duration {
        self.port.timeout()
    }

    /// The device this link was opened on.
    pub fn port_name(&self) -> &str {
        &self.name
    }
}

impl Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialLink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        debug!(port = %self.name, "closing serial port");
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("port", &self.name)
            .finish()
    }
}
