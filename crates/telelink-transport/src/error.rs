/// Errors that can occur in serial transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The serial device could not be opened. Fatal for a session.
    #[error("failed to open port {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// The port opened but could not be configured.
    #[error("failed to configure port {port}: {source}")]
    Configure {
        port: String,
        source: serialport::Error,
    },

    /// An I/O error occurred on the serial stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
