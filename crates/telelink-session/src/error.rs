use std::path::PathBuf;

/// Errors that can occur while setting up or running a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The transport could not be opened. The session never started.
    #[error("port open failed: {0}")]
    PortOpen(#[from] telelink_transport::TransportError),

    /// The transport failed while the loop was running.
    #[error("transport failure: {0}")]
    Frame(#[from] telelink_frame::FrameError),

    /// A run artifact could not be created, listed or appended to.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A data-table row could not be written.
    #[error("CSV error on {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    /// The log directory already holds the highest representable run.
    #[error("run numbers exhausted in {}", dir.display())]
    RunNumbersExhausted { dir: PathBuf },

    /// The distance label cannot be embedded in a file name.
    #[error("invalid distance label {0:?}")]
    InvalidLabel(String),
}

impl SessionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SessionError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
